use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{
    bank_check::{self, CheckStatus},
    sale::PaymentMethod,
    supplier,
    supplier_transaction::{self, SupplierTransactionType},
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::numbering::{self, SHORT_WIDTH, SUPPLIER_TX_PREFIX};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSupplierRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSupplierRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecordSupplierTransactionRequest {
    pub transaction_type: SupplierTransactionType,
    pub amount: Decimal,
    /// Only meaningful for payments
    pub payment_method: Option<PaymentMethod>,
    /// Required when paying by check
    #[validate(length(min = 1, max = 50))]
    pub check_number: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SupplierTransactionResult {
    pub transaction: supplier_transaction::Model,
    /// Balance owed to the supplier after the transaction
    pub balance: Decimal,
}

pub struct SupplierService {
    db: DbPool,
    event_sender: Arc<EventSender>,
}

impl SupplierService {
    pub fn new(db: DbPool, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_supplier(
        &self,
        request: CreateSupplierRequest,
    ) -> Result<supplier::Model, ServiceError> {
        request.validate()?;

        let created = supplier::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            phone: Set(request.phone),
            email: Set(request.email),
            balance: Set(Decimal::ZERO),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&self.db)
        .await?;

        info!(supplier_id = %created.id, "supplier created");
        Ok(created)
    }

    pub async fn get_supplier(&self, id: Uuid) -> Result<supplier::Model, ServiceError> {
        supplier::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Supplier {} not found", id)))
    }

    pub async fn update_supplier(
        &self,
        id: Uuid,
        request: UpdateSupplierRequest,
    ) -> Result<supplier::Model, ServiceError> {
        request.validate()?;

        let existing = self.get_supplier(id).await?;
        let mut active: supplier::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(phone) = request.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(email) = request.email {
            active.email = Set(Some(email));
        }
        active.updated_at = Set(Some(Utc::now()));
        Ok(active.update(&self.db).await?)
    }

    pub async fn list_suppliers(&self) -> Result<Vec<supplier::Model>, ServiceError> {
        Ok(supplier::Entity::find()
            .order_by_asc(supplier::Column::Name)
            .all(&self.db)
            .await?)
    }

    /// Ledger entry against a supplier: `PURCHASE` raises the owed balance,
    /// `PAYMENT` lowers it. Transaction row and balance move together.
    #[instrument(skip(self, request), fields(supplier_id = %supplier_id))]
    pub async fn record_transaction(
        &self,
        supplier_id: Uuid,
        request: RecordSupplierTransactionRequest,
    ) -> Result<SupplierTransactionResult, ServiceError> {
        request.validate()?;
        if request.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Transaction amount must be greater than zero".to_string(),
            ));
        }
        if request.payment_method == Some(PaymentMethod::Check)
            && request.check_number.is_none()
        {
            return Err(ServiceError::ValidationError(
                "Check payments require a check number".to_string(),
            ));
        }

        let db = &self.db;
        let request_ref = &request;
        let result = numbering::with_number_retry(SUPPLIER_TX_PREFIX, move || async move {
            let txn = db.begin().await?;

            let supplier = supplier::Entity::find_by_id(supplier_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Supplier {} not found", supplier_id))
                })?;

            let new_balance = match request_ref.transaction_type {
                SupplierTransactionType::Purchase => supplier.balance + request_ref.amount,
                SupplierTransactionType::Payment => supplier.balance - request_ref.amount,
            };

            let check_id = if request_ref.payment_method == Some(PaymentMethod::Check) {
                let check_number = request_ref.check_number.clone().ok_or_else(|| {
                    ServiceError::ValidationError(
                        "Check payments require a check number".to_string(),
                    )
                })?;
                let check = bank_check::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    check_number: Set(check_number),
                    amount: Set(request_ref.amount),
                    customer_id: Set(None),
                    supplier_id: Set(Some(supplier_id)),
                    status: Set(CheckStatus::Issued),
                    issued_at: Set(Utc::now()),
                    cashed_at: Set(None),
                    created_at: Set(Utc::now()),
                }
                .insert(&txn)
                .await?;
                Some(check.id)
            } else {
                None
            };

            let latest = supplier_transaction::Entity::find()
                .select_only()
                .column(supplier_transaction::Column::TransactionNumber)
                .order_by_desc(supplier_transaction::Column::TransactionNumber)
                .limit(1)
                .into_tuple::<String>()
                .one(&txn)
                .await?;
            let transaction_number =
                numbering::next_in_sequence(latest.as_deref(), SUPPLIER_TX_PREFIX, SHORT_WIDTH);

            let transaction = supplier_transaction::ActiveModel {
                id: Set(Uuid::new_v4()),
                supplier_id: Set(supplier_id),
                transaction_number: Set(transaction_number),
                transaction_type: Set(request_ref.transaction_type),
                amount: Set(request_ref.amount),
                payment_method: Set(request_ref.payment_method),
                check_id: Set(check_id),
                description: Set(request_ref.description.clone()),
                created_at: Set(Utc::now()),
            }
            .insert(&txn)
            .await?;

            let mut active: supplier::ActiveModel = supplier.into();
            active.balance = Set(new_balance);
            active.updated_at = Set(Some(Utc::now()));
            active.update(&txn).await?;

            txn.commit().await?;
            Ok(SupplierTransactionResult {
                transaction,
                balance: new_balance,
            })
        })
        .await?;

        info!(
            transaction_number = %result.transaction.transaction_number,
            balance = %result.balance,
            "supplier transaction recorded"
        );
        self.event_sender
            .send(Event::SupplierTransactionRecorded {
                supplier_id,
                transaction_number: result.transaction.transaction_number.clone(),
            })
            .await;

        Ok(result)
    }

    pub async fn list_transactions(
        &self,
        supplier_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<Vec<supplier_transaction::Model>, ServiceError> {
        Ok(supplier_transaction::Entity::find()
            .filter(supplier_transaction::Column::SupplierId.eq(supplier_id))
            .order_by_desc(supplier_transaction::Column::CreatedAt)
            .paginate(&self.db, per_page.max(1))
            .fetch_page(page.saturating_sub(1))
            .await?)
    }
}
