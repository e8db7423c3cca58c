//! Alami Gestion API Library
//!
//! Retail management backend: catalog, stock ledger, sales with a
//! paid/credit split, quotes, invoicing, supplier accounts and dashboards.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::auth::AuthService;
use crate::cache::{CacheBackend, InMemoryCache};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    credit::CreditService, customers::CustomerService, invoices::InvoiceService,
    products::ProductService, quotes::QuoteService, reports::ReportService, sales::SaleService,
    settings::SettingsService, stock::StockService, suppliers::SupplierService,
    users::UserService,
};

/// Domain services wired once at startup and shared by all handlers.
pub struct AppServices {
    pub products: ProductService,
    pub customers: CustomerService,
    pub sales: Arc<SaleService>,
    pub quotes: QuoteService,
    pub stock: StockService,
    pub credit: CreditService,
    pub suppliers: SupplierService,
    pub invoices: InvoiceService,
    pub reports: ReportService,
    pub settings: SettingsService,
    pub users: UserService,
}

impl AppServices {
    pub fn build(
        db: DbPool,
        event_sender: Arc<EventSender>,
        auth: Arc<AuthService>,
        config: &AppConfig,
    ) -> Self {
        let cache: Arc<dyn CacheBackend> = Arc::new(InMemoryCache::new());
        let cache_ttl = Duration::from_secs(config.product_cache_ttl_secs);

        let sales = Arc::new(SaleService::new(
            db.clone(),
            event_sender.clone(),
            cache.clone(),
        ));

        Self {
            products: ProductService::new(db.clone(), cache.clone(), cache_ttl),
            customers: CustomerService::new(db.clone()),
            quotes: QuoteService::new(db.clone(), event_sender.clone(), sales.clone()),
            sales,
            stock: StockService::new(db.clone(), event_sender.clone(), cache.clone()),
            credit: CreditService::new(db.clone(), event_sender.clone()),
            suppliers: SupplierService::new(db.clone(), event_sender.clone()),
            invoices: InvoiceService::new(db.clone(), event_sender),
            reports: ReportService::new(db.clone()),
            settings: SettingsService::new(db.clone()),
            users: UserService::new(db, auth),
        }
    }
}

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
    pub services: Arc<AppServices>,
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// All `/api/v1` routes.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", handlers::auth::auth_routes())
        .nest("/products", handlers::products::product_routes())
        .nest("/customers", handlers::customers::customer_routes())
        .nest("/sales", handlers::sales::sale_routes())
        .nest("/quotes", handlers::quotes::quote_routes())
        .nest("/stock", handlers::stock::stock_routes())
        .nest("/credit", handlers::credit::credit_routes())
        .nest("/suppliers", handlers::suppliers::supplier_routes())
        .nest("/invoices", handlers::invoices::invoice_routes())
        .nest("/reports", handlers::reports::report_routes())
        .nest("/settings", handlers::settings::settings_routes())
        .nest("/users", handlers::users::user_routes())
}

/// Liveness plus a database ping. Returns 503 when the database is
/// unreachable so load balancers can rotate the instance out.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match db::check_connection(&state.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "database": "up",
                "timestamp": Utc::now().to_rfc3339(),
            })),
        ),
        Err(e) => {
            tracing::error!("health check database ping failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "database": "down",
                    "timestamp": Utc::now().to_rfc3339(),
                })),
            )
        }
    }
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
