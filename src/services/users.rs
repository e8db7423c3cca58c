use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr,
};
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthService;
use crate::db::DbPool;
use crate::entities::user::{self, UserRole};
use crate::errors::ServiceError;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub role: UserRole,
}

pub struct UserService {
    db: DbPool,
    auth: Arc<AuthService>,
}

impl UserService {
    pub fn new(db: DbPool, auth: Arc<AuthService>) -> Self {
        Self { db, auth }
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn create_user(
        &self,
        request: CreateUserRequest,
    ) -> Result<user::Model, ServiceError> {
        request.validate()?;

        let password_hash = self.auth.hash_password(&request.password)?;
        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            email: Set(request.email.clone()),
            password_hash: Set(password_hash),
            role: Set(request.role),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&self.db)
        .await
        .map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                ServiceError::Conflict(format!("Email '{}' is already in use", request.email))
            } else {
                ServiceError::DatabaseError(e)
            }
        })?;

        info!(user_id = %created.id, "user created");
        Ok(created)
    }

    pub async fn get_user(&self, id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))
    }

    pub async fn list_users(&self) -> Result<Vec<user::Model>, ServiceError> {
        Ok(user::Entity::find()
            .order_by_asc(user::Column::Name)
            .all(&self.db)
            .await?)
    }

    /// Deactivated users keep their history but can no longer log in.
    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<user::Model, ServiceError> {
        let existing = self.get_user(id).await?;
        let mut model: user::ActiveModel = existing.into();
        model.is_active = Set(active);
        model.updated_at = Set(Some(Utc::now()));
        Ok(model.update(&self.db).await?)
    }

    /// Used by startup seeding and tests: true when no account exists yet.
    pub async fn has_any_user(&self) -> Result<bool, ServiceError> {
        Ok(user::Entity::find()
            .filter(user::Column::IsActive.eq(true))
            .one(&self.db)
            .await?
            .is_some())
    }
}
