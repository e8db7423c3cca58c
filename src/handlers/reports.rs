use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::auth::AuthenticatedUser;
use crate::errors::ServiceError;
use crate::services::reports::ProfitParams;
use crate::AppState;

async fn dashboard(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    let summary = state.services.reports.dashboard().await?;
    Ok(Json(summary))
}

/// Margin over a date range, from the purchase-price snapshots on sale lines.
async fn profit(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(params): Query<ProfitParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let stats = state.services.reports.profit_stats(params).await?;
    Ok(Json(stats))
}

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/profit", get(profit))
}
