use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::errors::ServiceError;
use crate::services::customers::{
    CreateCustomerRequest, CustomerListParams, UpdateCustomerRequest,
};
use crate::AppState;

async fn create_customer(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(request): Json<CreateCustomerRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state.services.customers.create_customer(request).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

async fn list_customers(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(params): Query<CustomerListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = state.services.customers.list_customers(params).await?;
    Ok(Json(page))
}

async fn get_customer(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state.services.customers.get_customer(id).await?;
    Ok(Json(customer))
}

async fn update_customer(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCustomerRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state
        .services
        .customers
        .update_customer(id, request)
        .await?;
    Ok(Json(customer))
}

async fn block_customer(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state.services.customers.set_blocked(id, true).await?;
    Ok(Json(customer))
}

async fn unblock_customer(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state.services.customers.set_blocked(id, false).await?;
    Ok(Json(customer))
}

/// Outstanding credit against the advisory limit.
async fn credit_summary(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let summary = state.services.customers.credit_summary(id).await?;
    Ok(Json(summary))
}

async fn list_credit_payments(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let payments = state.services.credit.list_payments(id).await?;
    Ok(Json(payments))
}

pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_customer))
        .route("/", get(list_customers))
        .route("/:id", get(get_customer))
        .route("/:id", put(update_customer))
        .route("/:id/block", post(block_customer))
        .route("/:id/unblock", post(unblock_customer))
        .route("/:id/credit", get(credit_summary))
        .route("/:id/payments", get(list_credit_payments))
}
