use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::entities::bank_check::CheckStatus;
use crate::errors::ServiceError;
use crate::services::credit::RecordCreditPaymentRequest;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct CheckListParams {
    status: Option<CheckStatus>,
}

/// Apply a payment against a customer's outstanding credit.
#[utoipa::path(
    post,
    path = "/api/v1/credit/payments",
    request_body = RecordCreditPaymentRequest,
    responses(
        (status = 201, description = "Payment recorded"),
        (status = 400, description = "Overpayment or invalid sale reference")
    ),
    security(("bearer_auth" = [])),
    tag = "credit"
)]
pub async fn record_payment(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(request): Json<RecordCreditPaymentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state.services.credit.record_payment(request).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

async fn list_checks(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(params): Query<CheckListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let checks = state.services.credit.list_checks(params.status).await?;
    Ok(Json(checks))
}

/// Mark an issued check as cashed.
async fn cash_check(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let check = state.services.credit.cash_check(id).await?;
    Ok(Json(check))
}

pub fn credit_routes() -> Router<AppState> {
    Router::new()
        .route("/payments", post(record_payment))
        .route("/checks", get(list_checks))
        .route("/checks/:id/cash", post(cash_check))
}
