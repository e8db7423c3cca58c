use axum::{extract::State, routing::post, Json, Router};

use crate::auth::{LoginRequest, TokenResponse};
use crate::errors::ServiceError;
use crate::AppState;

/// Exchange credentials for a bearer token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ServiceError> {
    let token = state.auth.login(&request.email, &request.password).await?;
    Ok(Json(token))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}
