use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::customer;
use crate::errors::ServiceError;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    pub credit_limit: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    pub credit_limit: Option<Decimal>,
}

/// Outstanding credit against the advisory limit.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreditSummary {
    pub customer_id: Uuid,
    pub credit_limit: Decimal,
    pub credit_used: Decimal,
    pub available: Decimal,
    pub is_blocked: bool,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CustomerListParams {
    pub search: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerPage {
    pub customers: Vec<customer::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

pub struct CustomerService {
    db: DbPool,
}

impl CustomerService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<customer::Model, ServiceError> {
        request.validate()?;

        let created = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            phone: Set(request.phone),
            email: Set(request.email),
            address: Set(request.address),
            credit_limit: Set(request.credit_limit.unwrap_or(Decimal::ZERO)),
            credit_used: Set(Decimal::ZERO),
            is_blocked: Set(false),
            created_at: Set(chrono::Utc::now()),
            updated_at: Set(None),
        }
        .insert(&self.db)
        .await?;

        info!(customer_id = %created.id, "customer created");
        Ok(created)
    }

    pub async fn get_customer(&self, id: Uuid) -> Result<customer::Model, ServiceError> {
        customer::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", id)))
    }

    pub async fn update_customer(
        &self,
        id: Uuid,
        request: UpdateCustomerRequest,
    ) -> Result<customer::Model, ServiceError> {
        request.validate()?;

        let existing = self.get_customer(id).await?;
        let mut active: customer::ActiveModel = existing.into();

        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(phone) = request.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(email) = request.email {
            active.email = Set(Some(email));
        }
        if let Some(address) = request.address {
            active.address = Set(Some(address));
        }
        if let Some(credit_limit) = request.credit_limit {
            active.credit_limit = Set(credit_limit);
        }
        active.updated_at = Set(Some(chrono::Utc::now()));

        Ok(active.update(&self.db).await?)
    }

    /// Blocked customers are refused new credit sales; past debt still
    /// settles normally.
    pub async fn set_blocked(
        &self,
        id: Uuid,
        blocked: bool,
    ) -> Result<customer::Model, ServiceError> {
        let existing = self.get_customer(id).await?;
        let mut active: customer::ActiveModel = existing.into();
        active.is_blocked = Set(blocked);
        active.updated_at = Set(Some(chrono::Utc::now()));
        let updated = active.update(&self.db).await?;
        info!(customer_id = %id, blocked, "customer block status changed");
        Ok(updated)
    }

    pub async fn credit_summary(&self, id: Uuid) -> Result<CreditSummary, ServiceError> {
        let customer = self.get_customer(id).await?;
        Ok(CreditSummary {
            customer_id: customer.id,
            credit_limit: customer.credit_limit,
            available: (customer.credit_limit - customer.credit_used).max(Decimal::ZERO),
            credit_used: customer.credit_used,
            is_blocked: customer.is_blocked,
        })
    }

    pub async fn list_customers(
        &self,
        params: CustomerListParams,
    ) -> Result<CustomerPage, ServiceError> {
        let page = params.page.unwrap_or(1).max(1);
        let per_page = params.per_page.unwrap_or(50).clamp(1, 200);

        let mut query = customer::Entity::find().order_by_asc(customer::Column::Name);
        if let Some(search) = params.search.filter(|s| !s.trim().is_empty()) {
            query = query.filter(customer::Column::Name.like(format!("%{}%", search.trim())));
        }

        let paginator = query.paginate(&self.db, per_page);
        let total = paginator.num_items().await?;
        let customers = paginator.fetch_page(page - 1).await?;

        Ok(CustomerPage {
            customers,
            total,
            page,
            per_page,
        })
    }
}
