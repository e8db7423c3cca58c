use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};
use sea_orm_migration::MigratorTrait;
use tokio::sync::mpsc;
use uuid::Uuid;

use alami_gestion_api::{
    auth::AuthService,
    db::DbPool,
    entities::{customer, product, user},
    events::{Event, EventSender},
    migrator::Migrator,
    AppServices,
};

const TEST_JWT_SECRET: &str =
    "test_only_secret_key_that_is_at_least_64_characters_long_for_signing";

/// Test harness: in-memory SQLite with the full schema, the domain services
/// wired the same way `main` wires them, and the event channel kept open so
/// post-commit sends do not log as failures.
pub struct TestApp {
    pub db: DbPool,
    pub services: AppServices,
    pub seller_id: Uuid,
    #[allow(dead_code)]
    event_rx: mpsc::Receiver<Event>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut opts = ConnectOptions::new("sqlite::memory:".to_string());
        opts.max_connections(1)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(5))
            .sqlx_logging(false);
        let db = Database::connect(opts)
            .await
            .expect("failed to open in-memory database");
        Migrator::up(&db, None)
            .await
            .expect("failed to run migrations");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let auth = Arc::new(AuthService::new(db.clone(), TEST_JWT_SECRET, 3600));

        let cfg = alami_gestion_api::config::load_config().expect("test config");
        let services = AppServices::build(db.clone(), event_sender, auth, &cfg);

        let seller_id = seed_seller(&db).await;

        Self {
            db,
            services,
            seller_id,
            event_rx,
        }
    }

    pub async fn seed_product(&self, sku: &str, price: Decimal, stock: i32) -> product::Model {
        self.seed_product_full(sku, price, Decimal::ZERO, stock, 0)
            .await
    }

    pub async fn seed_product_full(
        &self,
        sku: &str,
        price: Decimal,
        purchase_price: Decimal,
        stock: i32,
        min_stock: i32,
    ) -> product::Model {
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(sku.to_string()),
            name: Set(format!("Product {}", sku)),
            description: Set(None),
            purchase_price: Set(purchase_price),
            price: Set(price),
            stock: Set(stock),
            min_stock: Set(min_stock),
            is_active: Set(true),
            category_id: Set(None),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .expect("failed to seed product")
    }

    pub async fn seed_customer(&self, name: &str, credit_limit: Decimal) -> customer::Model {
        customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            phone: Set(None),
            email: Set(None),
            address: Set(None),
            credit_limit: Set(credit_limit),
            credit_used: Set(Decimal::ZERO),
            is_blocked: Set(false),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&self.db)
        .await
        .expect("failed to seed customer")
    }
}

async fn seed_seller(db: &DbPool) -> Uuid {
    let id = Uuid::new_v4();
    user::ActiveModel {
        id: Set(id),
        name: Set("Test Seller".to_string()),
        email: Set(format!("seller-{}@example.com", id)),
        password_hash: Set("not-a-real-hash".to_string()),
        role: Set(user::UserRole::Seller),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    }
    .insert(db)
    .await
    .expect("failed to seed seller");
    id
}
