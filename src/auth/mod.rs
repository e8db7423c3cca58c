use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::user::{self, UserRole};
use crate::errors::ServiceError;

/// JWT claims carried by every access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub name: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

/// Successful login response.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Issues and validates access tokens, and owns password hashing.
pub struct AuthService {
    db: DbPool,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiration_secs: i64,
}

impl AuthService {
    pub fn new(db: DbPool, jwt_secret: &str, token_expiration_secs: i64) -> Self {
        Self {
            db,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            token_expiration_secs,
        }
    }

    pub fn hash_password(&self, password: &str) -> Result<String, ServiceError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| ServiceError::InternalError(format!("Password hashing failed: {}", e)))
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, ServiceError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| ServiceError::InternalError(format!("Stored hash is invalid: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Verify credentials against the users table and issue a token.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, ServiceError> {
        let user = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::AuthError("Invalid credentials".to_string()))?;

        if !user.is_active {
            warn!(user_id = %user.id, "login attempt on deactivated account");
            return Err(ServiceError::AuthError("Invalid credentials".to_string()));
        }

        if !self.verify_password(password, &user.password_hash)? {
            return Err(ServiceError::AuthError("Invalid credentials".to_string()));
        }

        let token = self.issue_token(&user)?;
        Ok(TokenResponse {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: self.token_expiration_secs,
        })
    }

    pub fn issue_token(&self, user: &user::Model) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.to_string(),
            name: user.name.clone(),
            role: user.role,
            iat: now,
            exp: now + self.token_expiration_secs,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::InternalError(format!("Token creation failed: {}", e)))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ServiceError::AuthError("Token has expired".to_string())
            }
            _ => ServiceError::AuthError("Invalid token".to_string()),
        })
    }
}

/// Request identity extracted from the `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub name: String,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn is_owner(&self) -> bool {
        self.role == UserRole::Owner
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    Arc<AuthService>: axum::extract::FromRef<S>,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = <Arc<AuthService> as axum::extract::FromRef<S>>::from_ref(state);

        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ServiceError::Unauthorized("Missing authorization header".to_string()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ServiceError::Unauthorized("Expected a bearer token".to_string()))?
            .trim();

        let claims = auth.validate_token(token)?;
        let id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::AuthError("Invalid token subject".to_string()))?;

        Ok(AuthenticatedUser {
            id,
            name: claims.name,
            role: claims.role,
        })
    }
}

/// Extractor that additionally requires the `OWNER` role.
#[derive(Debug, Clone)]
pub struct OwnerUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for OwnerUser
where
    S: Send + Sync,
    Arc<AuthService>: axum::extract::FromRef<S>,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !user.is_owner() {
            return Err(ServiceError::Forbidden(
                "This operation requires the owner role".to_string(),
            ));
        }
        Ok(OwnerUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Database;

    async fn service() -> AuthService {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        AuthService::new(db, "test-secret-key-for-token-signing-0123456789abcdef", 3600)
    }

    fn sample_user() -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            name: "Amine".to_string(),
            email: "amine@example.com".to_string(),
            password_hash: String::new(),
            role: UserRole::Seller,
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn password_hash_round_trip() {
        let auth = service().await;
        let hash = auth.hash_password("s3cret!").unwrap();
        assert!(auth.verify_password("s3cret!", &hash).unwrap());
        assert!(!auth.verify_password("wrong", &hash).unwrap());
    }

    #[tokio::test]
    async fn token_round_trip_preserves_claims() {
        let auth = service().await;
        let user = sample_user();
        let token = auth.issue_token(&user).unwrap();
        let claims = auth.validate_token(&token).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.role, UserRole::Seller);
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let auth = service().await;
        assert!(auth.validate_token("not-a-token").is_err());
    }
}
