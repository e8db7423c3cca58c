use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::company_settings;
use crate::errors::ServiceError;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSettingsRequest {
    #[validate(length(min = 1, max = 255))]
    pub company_name: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 10))]
    pub invoice_prefix: Option<String>,
    #[validate(length(min = 1, max = 10))]
    pub credit_note_prefix: Option<String>,
    #[validate(range(min = 1, max = 365))]
    pub quote_validity_days: Option<i32>,
}

/// Single-row settings store; the row is created lazily with defaults.
pub struct SettingsService {
    db: DbPool,
}

impl SettingsService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn get_settings(&self) -> Result<company_settings::Model, ServiceError> {
        match company_settings::Entity::find().one(&self.db).await? {
            Some(settings) => Ok(settings),
            None => self.create_defaults().await,
        }
    }

    #[instrument(skip(self, request))]
    pub async fn update_settings(
        &self,
        request: UpdateSettingsRequest,
    ) -> Result<company_settings::Model, ServiceError> {
        request.validate()?;

        let existing = self.get_settings().await?;
        let mut active: company_settings::ActiveModel = existing.into();

        if let Some(company_name) = request.company_name {
            active.company_name = Set(company_name);
        }
        if let Some(address) = request.address {
            active.address = Set(Some(address));
        }
        if let Some(phone) = request.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(invoice_prefix) = request.invoice_prefix {
            active.invoice_prefix = Set(invoice_prefix);
        }
        if let Some(credit_note_prefix) = request.credit_note_prefix {
            active.credit_note_prefix = Set(credit_note_prefix);
        }
        if let Some(quote_validity_days) = request.quote_validity_days {
            active.quote_validity_days = Set(quote_validity_days);
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&self.db).await?;
        info!("company settings updated");
        Ok(updated)
    }

    async fn create_defaults(&self) -> Result<company_settings::Model, ServiceError> {
        Ok(company_settings::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_name: Set("Alami Gestion".to_string()),
            address: Set(None),
            phone: Set(None),
            invoice_prefix: Set(company_settings::Model::DEFAULT_INVOICE_PREFIX.to_string()),
            credit_note_prefix: Set(
                company_settings::Model::DEFAULT_CREDIT_NOTE_PREFIX.to_string()
            ),
            quote_validity_days: Set(company_settings::Model::DEFAULT_QUOTE_VALIDITY_DAYS),
            updated_at: Set(Some(Utc::now())),
        }
        .insert(&self.db)
        .await?)
    }
}
