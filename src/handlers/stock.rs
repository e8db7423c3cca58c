use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{AuthenticatedUser, OwnerUser};
use crate::errors::ServiceError;
use crate::services::stock::RecordMovementRequest;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct MovementListParams {
    product_id: Option<Uuid>,
    page: Option<u64>,
    per_page: Option<u64>,
}

/// Manual stock adjustment. Owner only; sellers adjust stock exclusively
/// through sales.
#[utoipa::path(
    post,
    path = "/api/v1/stock/movements",
    request_body = RecordMovementRequest,
    responses(
        (status = 201, description = "Movement recorded"),
        (status = 400, description = "Insufficient stock for an OUT movement"),
        (status = 403, description = "Caller is not an owner")
    ),
    security(("bearer_auth" = [])),
    tag = "stock"
)]
pub async fn record_movement(
    State(state): State<AppState>,
    OwnerUser(_user): OwnerUser,
    Json(request): Json<RecordMovementRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let movement = state.services.stock.record_movement(request).await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

async fn list_movements(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(params): Query<MovementListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = state
        .services
        .stock
        .list_movements(
            params.product_id,
            params.page.unwrap_or(1).max(1),
            params.per_page.unwrap_or(50).clamp(1, 200),
        )
        .await?;
    Ok(Json(page))
}

/// Low-stock products bucketed by severity.
async fn stock_alerts(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    let alerts = state.services.stock.stock_alerts().await?;
    Ok(Json(alerts))
}

pub fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/movements", post(record_movement))
        .route("/movements", get(list_movements))
        .route("/alerts", get(stock_alerts))
}
