use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::errors::ServiceError;
use crate::services::sales::{CreateSaleRequest, SaleListParams, SaleWithItems};
use crate::AppState;

/// Record a sale. Stock, totals, credit and status are settled atomically.
#[utoipa::path(
    post,
    path = "/api/v1/sales",
    request_body = CreateSaleRequest,
    responses(
        (status = 201, description = "Sale created", body = SaleWithItems),
        (status = 400, description = "Insufficient stock or invalid payment split")
    ),
    security(("bearer_auth" = [])),
    tag = "sales"
)]
pub async fn create_sale(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateSaleRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let sale = state.services.sales.create_sale(user.id, request).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

async fn list_sales(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(params): Query<SaleListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = state.services.sales.list_sales(params).await?;
    Ok(Json(page))
}

async fn get_sale(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let sale = state.services.sales.get_sale(id).await?;
    Ok(Json(sale))
}

/// Cancel a sale, restoring stock and releasing outstanding credit.
async fn cancel_sale(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let sale = state.services.sales.cancel_sale(id).await?;
    Ok(Json(sale))
}

pub fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_sale))
        .route("/", get(list_sales))
        .route("/:id", get(get_sale))
        .route("/:id/cancel", post(cancel_sale))
}
