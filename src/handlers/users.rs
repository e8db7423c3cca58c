use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::auth::OwnerUser;
use crate::errors::ServiceError;
use crate::services::users::CreateUserRequest;
use crate::AppState;

/// Staff account creation, owner only.
async fn create_user(
    State(state): State<AppState>,
    OwnerUser(_user): OwnerUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.services.users.create_user(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_users(
    State(state): State<AppState>,
    OwnerUser(_user): OwnerUser,
) -> Result<impl IntoResponse, ServiceError> {
    let users = state.services.users.list_users().await?;
    Ok(Json(users))
}

async fn deactivate_user(
    State(state): State<AppState>,
    OwnerUser(_user): OwnerUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.services.users.set_active(id, false).await?;
    Ok(Json(user))
}

async fn activate_user(
    State(state): State<AppState>,
    OwnerUser(_user): OwnerUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.services.users.set_active(id, true).await?;
    Ok(Json(user))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_user))
        .route("/", get(list_users))
        .route("/:id/deactivate", post(deactivate_user))
        .route("/:id/activate", post(activate_user))
}
