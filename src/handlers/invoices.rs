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
use crate::entities::invoice::InvoiceType;
use crate::errors::ServiceError;
use crate::services::invoices::{CreateInvoiceRequest, InvoiceListParams, NextNumberPreview};
use crate::AppState;

async fn create_invoice(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoice = state.services.invoices.create_invoice(request).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

async fn list_invoices(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(params): Query<InvoiceListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = state.services.invoices.list_invoices(params).await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
struct NextNumberParams {
    #[serde(rename = "type")]
    invoice_type: InvoiceType,
}

/// Preview the next number in an invoice family without allocating it.
#[utoipa::path(
    get,
    path = "/api/v1/invoices/next-number",
    params(("type" = InvoiceType, Query, description = "INVOICE or CREDIT_NOTE")),
    responses((status = 200, description = "Next number preview", body = NextNumberPreview)),
    security(("bearer_auth" = [])),
    tag = "invoices"
)]
pub async fn next_number(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(params): Query<NextNumberParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let preview = state
        .services
        .invoices
        .next_number(params.invoice_type)
        .await?;
    Ok(Json(preview))
}

async fn get_invoice(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoice = state.services.invoices.get_invoice(id).await?;
    Ok(Json(invoice))
}

pub fn invoice_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_invoice))
        .route("/", get(list_invoices))
        .route("/next-number", get(next_number))
        .route("/:id", get(get_invoice))
}
