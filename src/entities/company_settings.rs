use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Single-row company configuration: identity plus the configurable document
/// number prefixes used by invoicing.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "company_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_name: String,
    #[sea_orm(nullable)]
    pub address: Option<String>,
    #[sea_orm(nullable)]
    pub phone: Option<String>,
    /// Prefix for the invoice number family (default "FAC")
    pub invoice_prefix: String,
    /// Prefix for the credit-note number family (default "FAV")
    pub credit_note_prefix: String,
    /// Days a quote remains valid from issuance
    pub quote_validity_days: i32,
    #[sea_orm(nullable)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub const DEFAULT_INVOICE_PREFIX: &'static str = "FAC";
    pub const DEFAULT_CREDIT_NOTE_PREFIX: &'static str = "FAV";
    pub const DEFAULT_QUOTE_VALIDITY_DAYS: i32 = 30;
}
