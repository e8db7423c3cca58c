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
use crate::services::quotes::{ConvertQuoteRequest, CreateQuoteRequest, QuoteListParams};
use crate::AppState;

async fn create_quote(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(request): Json<CreateQuoteRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let quote = state.services.quotes.create_quote(request).await?;
    Ok((StatusCode::CREATED, Json(quote)))
}

async fn list_quotes(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(params): Query<QuoteListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = state.services.quotes.list_quotes(params).await?;
    Ok(Json(page))
}

async fn get_quote(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let quote = state.services.quotes.get_quote(id).await?;
    Ok(Json(quote))
}

async fn send_quote(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let quote = state.services.quotes.send_quote(id).await?;
    Ok(Json(quote))
}

async fn reject_quote(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let quote = state.services.quotes.reject_quote(id).await?;
    Ok(Json(quote))
}

/// Promote a quote into a sale at the quoted prices. One-shot: a converted
/// quote refuses further conversions.
#[utoipa::path(
    post,
    path = "/api/v1/quotes/{id}/convert",
    request_body = ConvertQuoteRequest,
    params(("id" = Uuid, Path, description = "Quote id")),
    responses(
        (status = 201, description = "Sale created from quote"),
        (status = 400, description = "Quote not convertible or stock insufficient")
    ),
    security(("bearer_auth" = [])),
    tag = "quotes"
)]
pub async fn convert_quote(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ConvertQuoteRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let sale = state
        .services
        .quotes
        .convert_to_sale(id, user.id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

pub fn quote_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_quote))
        .route("/", get(list_quotes))
        .route("/:id", get(get_quote))
        .route("/:id/send", post(send_quote))
        .route("/:id/reject", post(reject_quote))
        .route("/:id/convert", post(convert_quote))
}
