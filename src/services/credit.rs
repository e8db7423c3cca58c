use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{
    bank_check::{self, CheckStatus},
    credit_payment, customer,
    sale::{self, PaymentMethod, SaleStatus},
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Moves `customer.credit_used` by `delta` on the caller's connection.
/// The balance is floored at zero; it must never go negative.
pub(crate) async fn adjust_customer_credit<C: ConnectionTrait>(
    conn: &C,
    customer_id: Uuid,
    delta: Decimal,
) -> Result<customer::Model, ServiceError> {
    let customer = customer::Entity::find_by_id(customer_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))?;

    let new_balance = (customer.credit_used + delta).max(Decimal::ZERO);
    let mut active: customer::ActiveModel = customer.into();
    active.credit_used = Set(new_balance);
    active.updated_at = Set(Some(Utc::now()));
    Ok(active.update(conn).await?)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecordCreditPaymentRequest {
    pub customer_id: Uuid,
    /// Optional sale to settle; also raises that sale's paid amount
    pub sale_id: Option<Uuid>,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    /// Required when paying by check
    #[validate(length(min = 1, max = 50))]
    pub check_number: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreditPaymentResult {
    pub payment: credit_payment::Model,
    /// Customer's outstanding credit after the payment
    pub credit_used: Decimal,
    pub check: Option<bank_check::Model>,
}

pub struct CreditService {
    db: DbPool,
    event_sender: Arc<EventSender>,
}

impl CreditService {
    pub fn new(db: DbPool, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Applies a payment against a customer's outstanding credit. Payments
    /// larger than the outstanding balance are rejected outright.
    #[instrument(skip(self, request), fields(customer_id = %request.customer_id))]
    pub async fn record_payment(
        &self,
        request: RecordCreditPaymentRequest,
    ) -> Result<CreditPaymentResult, ServiceError> {
        request.validate()?;
        if request.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Payment amount must be greater than zero".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let customer = customer::Entity::find_by_id(request.customer_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Customer {} not found", request.customer_id))
            })?;

        if request.amount > customer.credit_used {
            return Err(ServiceError::CreditError(format!(
                "Payment of {} exceeds outstanding credit of {}",
                request.amount, customer.credit_used
            )));
        }

        if let Some(sale_id) = request.sale_id {
            let sale = sale::Entity::find_by_id(sale_id)
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Sale {} not found", sale_id)))?;
            if sale.customer_id != Some(request.customer_id) {
                return Err(ServiceError::InvalidOperation(format!(
                    "Sale {} does not belong to this customer",
                    sale.sale_number
                )));
            }
            if request.amount > sale.credit_amount {
                return Err(ServiceError::CreditError(format!(
                    "Payment of {} exceeds the sale's outstanding credit of {}",
                    request.amount, sale.credit_amount
                )));
            }

            let new_credit = sale.credit_amount - request.amount;
            let new_paid = sale.paid_amount + request.amount;
            let mut active: sale::ActiveModel = sale.into();
            active.paid_amount = Set(new_paid);
            active.credit_amount = Set(new_credit);
            if new_credit <= Decimal::ZERO {
                active.status = Set(SaleStatus::Completed);
            }
            active.updated_at = Set(Some(Utc::now()));
            active.update(&txn).await?;
        }

        let check = if request.payment_method == PaymentMethod::Check {
            let check_number = request.check_number.clone().ok_or_else(|| {
                ServiceError::ValidationError(
                    "Check payments require a check number".to_string(),
                )
            })?;
            Some(
                bank_check::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    check_number: Set(check_number),
                    amount: Set(request.amount),
                    customer_id: Set(Some(request.customer_id)),
                    supplier_id: Set(None),
                    status: Set(CheckStatus::Issued),
                    issued_at: Set(Utc::now()),
                    cashed_at: Set(None),
                    created_at: Set(Utc::now()),
                }
                .insert(&txn)
                .await?,
            )
        } else {
            None
        };

        let payment = credit_payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(request.customer_id),
            sale_id: Set(request.sale_id),
            amount: Set(request.amount),
            payment_method: Set(request.payment_method),
            check_id: Set(check.as_ref().map(|c| c.id)),
            notes: Set(request.notes.clone()),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        let updated_customer =
            adjust_customer_credit(&txn, request.customer_id, -request.amount).await?;

        txn.commit().await?;

        info!(
            payment_id = %payment.id,
            amount = %request.amount,
            "credit payment recorded"
        );
        self.event_sender
            .send(Event::CreditPaymentRecorded {
                customer_id: request.customer_id,
                amount: request.amount,
            })
            .await;

        Ok(CreditPaymentResult {
            payment,
            credit_used: updated_customer.credit_used,
            check,
        })
    }

    pub async fn list_payments(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<credit_payment::Model>, ServiceError> {
        Ok(credit_payment::Entity::find()
            .filter(credit_payment::Column::CustomerId.eq(customer_id))
            .order_by_desc(credit_payment::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Marks an issued check as cashed. Only `ISSUED` checks can transition.
    #[instrument(skip(self))]
    pub async fn cash_check(&self, check_id: Uuid) -> Result<bank_check::Model, ServiceError> {
        let check = bank_check::Entity::find_by_id(check_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Check {} not found", check_id)))?;

        if check.status != CheckStatus::Issued {
            return Err(ServiceError::InvalidOperation(format!(
                "Check {} is not in ISSUED state",
                check.check_number
            )));
        }

        let mut active: bank_check::ActiveModel = check.into();
        active.status = Set(CheckStatus::Cashed);
        active.cashed_at = Set(Some(Utc::now()));
        let cashed = active.update(&self.db).await?;

        self.event_sender.send(Event::CheckCashed { check_id }).await;
        Ok(cashed)
    }

    pub async fn list_checks(
        &self,
        status: Option<CheckStatus>,
    ) -> Result<Vec<bank_check::Model>, ServiceError> {
        let mut query =
            bank_check::Entity::find().order_by_desc(bank_check::Column::IssuedAt);
        if let Some(status) = status {
            query = query.filter(bank_check::Column::Status.eq(status));
        }
        Ok(query.all(&self.db).await?)
    }
}
