use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Customer entity. `credit_used` is the running balance of unpaid credit;
/// `credit_limit` is advisory and surfaced by the credit summary endpoint.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate, ToSchema)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[sea_orm(nullable)]
    pub phone: Option<String>,

    #[sea_orm(nullable)]
    #[validate(email)]
    pub email: Option<String>,

    #[sea_orm(nullable)]
    pub address: Option<String>,

    /// Maximum credit the shop is willing to extend
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub credit_limit: Decimal,

    /// Unpaid credit currently outstanding
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub credit_used: Decimal,

    /// Blocked customers cannot take new credit
    pub is_blocked: bool,

    pub created_at: DateTime<Utc>,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sale::Entity")]
    Sales,
    #[sea_orm(has_many = "super::credit_payment::Entity")]
    CreditPayments,
}

impl Related<super::sale::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sales.def()
    }
}

impl Related<super::credit_payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CreditPayments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
