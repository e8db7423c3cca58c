use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};

use crate::auth::{AuthenticatedUser, OwnerUser};
use crate::errors::ServiceError;
use crate::services::settings::UpdateSettingsRequest;
use crate::AppState;

async fn get_settings(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    let settings = state.services.settings.get_settings().await?;
    Ok(Json(settings))
}

async fn update_settings(
    State(state): State<AppState>,
    OwnerUser(_user): OwnerUser,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let settings = state.services.settings.update_settings(request).await?;
    Ok(Json(settings))
}

pub fn settings_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_settings))
        .route("/", put(update_settings))
}
