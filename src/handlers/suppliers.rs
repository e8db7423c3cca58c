use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::auth::{AuthenticatedUser, OwnerUser};
use crate::errors::ServiceError;
use crate::handlers::common::PaginationParams;
use crate::services::suppliers::{
    CreateSupplierRequest, RecordSupplierTransactionRequest, UpdateSupplierRequest,
};
use crate::AppState;

async fn create_supplier(
    State(state): State<AppState>,
    OwnerUser(_user): OwnerUser,
    Json(request): Json<CreateSupplierRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let supplier = state.services.suppliers.create_supplier(request).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

async fn list_suppliers(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    let suppliers = state.services.suppliers.list_suppliers().await?;
    Ok(Json(suppliers))
}

async fn get_supplier(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let supplier = state.services.suppliers.get_supplier(id).await?;
    Ok(Json(supplier))
}

async fn update_supplier(
    State(state): State<AppState>,
    OwnerUser(_user): OwnerUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateSupplierRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let supplier = state
        .services
        .suppliers
        .update_supplier(id, request)
        .await?;
    Ok(Json(supplier))
}

/// Ledger entry: purchases raise the owed balance, payments lower it.
async fn record_transaction(
    State(state): State<AppState>,
    OwnerUser(_user): OwnerUser,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordSupplierTransactionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state
        .services
        .suppliers
        .record_transaction(id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

async fn list_transactions(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let transactions = state
        .services
        .suppliers
        .list_transactions(id, params.page(), params.per_page())
        .await?;
    Ok(Json(transactions))
}

pub fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_supplier))
        .route("/", get(list_suppliers))
        .route("/:id", get(get_supplier))
        .route("/:id", put(update_supplier))
        .route("/:id/transactions", post(record_transaction))
        .route("/:id/transactions", get(list_transactions))
}
