use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{
    company_settings,
    invoice::{self, InvoiceType},
    invoice_item,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::numbering::{self, LONG_WIDTH};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct InvoiceLineRequest {
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInvoiceRequest {
    pub invoice_type: InvoiceType,
    pub customer_id: Option<Uuid>,
    /// Required for credit notes: the invoice being corrected
    pub original_invoice_id: Option<Uuid>,
    #[validate]
    #[validate(length(min = 1, message = "An invoice needs at least one line"))]
    pub items: Vec<InvoiceLineRequest>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceWithItems {
    #[serde(flatten)]
    pub invoice: invoice::Model,
    pub items: Vec<invoice_item::Model>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NextNumberPreview {
    pub invoice_type: InvoiceType,
    pub next_number: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct InvoiceListParams {
    pub invoice_type: Option<InvoiceType>,
    pub customer_id: Option<Uuid>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoicePage {
    pub invoices: Vec<invoice::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

pub struct InvoiceService {
    db: DbPool,
    event_sender: Arc<EventSender>,
}

impl InvoiceService {
    pub fn new(db: DbPool, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Issues an invoice or credit note with the next number in its family.
    #[instrument(skip(self, request))]
    pub async fn create_invoice(
        &self,
        request: CreateInvoiceRequest,
    ) -> Result<InvoiceWithItems, ServiceError> {
        request.validate()?;

        if request.invoice_type == InvoiceType::CreditNote {
            let original_id = request.original_invoice_id.ok_or_else(|| {
                ServiceError::ValidationError(
                    "A credit note must reference the original invoice".to_string(),
                )
            })?;
            let original = invoice::Entity::find_by_id(original_id)
                .one(&self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Invoice {} not found", original_id))
                })?;
            if original.invoice_type != InvoiceType::Invoice {
                return Err(ServiceError::InvalidOperation(
                    "A credit note can only be issued against an invoice".to_string(),
                ));
            }
        }

        let prefix = self.family_prefix(request.invoice_type).await?;

        let db = &self.db;
        let prefix_ref = prefix.as_str();
        let request_ref = &request;
        let result = numbering::with_number_retry(prefix_ref, move || async move {
            let txn = db.begin().await?;

            let invoice_number = next_in_family(&txn, prefix_ref).await?;
            let total: Decimal = request_ref
                .items
                .iter()
                .map(|line| line.unit_price * Decimal::from(line.quantity))
                .sum();

            let created = invoice::ActiveModel {
                id: Set(Uuid::new_v4()),
                invoice_number: Set(invoice_number),
                invoice_type: Set(request_ref.invoice_type),
                customer_id: Set(request_ref.customer_id),
                original_invoice_id: Set(request_ref.original_invoice_id),
                total_amount: Set(total),
                notes: Set(request_ref.notes.clone()),
                created_at: Set(Utc::now()),
            }
            .insert(&txn)
            .await?;

            let mut items = Vec::with_capacity(request_ref.items.len());
            for line in &request_ref.items {
                let item = invoice_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    invoice_id: Set(created.id),
                    description: Set(line.description.clone()),
                    quantity: Set(line.quantity),
                    unit_price: Set(line.unit_price),
                    total: Set(line.unit_price * Decimal::from(line.quantity)),
                }
                .insert(&txn)
                .await?;
                items.push(item);
            }

            txn.commit().await?;
            Ok(InvoiceWithItems {
                invoice: created,
                items,
            })
        })
        .await?;

        info!(
            invoice_id = %result.invoice.id,
            invoice_number = %result.invoice.invoice_number,
            "invoice issued"
        );
        self.event_sender
            .send(Event::InvoiceIssued {
                invoice_id: result.invoice.id,
                invoice_number: result.invoice.invoice_number.clone(),
            })
            .await;

        Ok(result)
    }

    /// Preview of the number the next document in a family would take.
    /// Advisory only; the actual number is allocated at insert time.
    pub async fn next_number(
        &self,
        invoice_type: InvoiceType,
    ) -> Result<NextNumberPreview, ServiceError> {
        let prefix = self.family_prefix(invoice_type).await?;
        let next_number = next_in_family(&self.db, &prefix).await?;
        Ok(NextNumberPreview {
            invoice_type,
            next_number,
        })
    }

    pub async fn get_invoice(&self, id: Uuid) -> Result<InvoiceWithItems, ServiceError> {
        let invoice = invoice::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Invoice {} not found", id)))?;
        let items = invoice_item::Entity::find()
            .filter(invoice_item::Column::InvoiceId.eq(id))
            .all(&self.db)
            .await?;
        Ok(InvoiceWithItems { invoice, items })
    }

    pub async fn list_invoices(
        &self,
        params: InvoiceListParams,
    ) -> Result<InvoicePage, ServiceError> {
        let page = params.page.unwrap_or(1).max(1);
        let per_page = params.per_page.unwrap_or(50).clamp(1, 200);

        let mut query = invoice::Entity::find().order_by_desc(invoice::Column::CreatedAt);
        if let Some(invoice_type) = params.invoice_type {
            query = query.filter(invoice::Column::InvoiceType.eq(invoice_type));
        }
        if let Some(customer_id) = params.customer_id {
            query = query.filter(invoice::Column::CustomerId.eq(customer_id));
        }

        let paginator = query.paginate(&self.db, per_page);
        let total = paginator.num_items().await?;
        let invoices = paginator.fetch_page(page - 1).await?;

        Ok(InvoicePage {
            invoices,
            total,
            page,
            per_page,
        })
    }

    async fn family_prefix(&self, invoice_type: InvoiceType) -> Result<String, ServiceError> {
        let settings = company_settings::Entity::find().one(&self.db).await?;
        Ok(match invoice_type {
            InvoiceType::Invoice => settings
                .map(|s| s.invoice_prefix)
                .unwrap_or_else(|| company_settings::Model::DEFAULT_INVOICE_PREFIX.to_string()),
            InvoiceType::CreditNote => settings
                .map(|s| s.credit_note_prefix)
                .unwrap_or_else(|| {
                    company_settings::Model::DEFAULT_CREDIT_NOTE_PREFIX.to_string()
                }),
        })
    }
}

async fn next_in_family<C: ConnectionTrait>(
    conn: &C,
    prefix: &str,
) -> Result<String, ServiceError> {
    let latest = invoice::Entity::find()
        .select_only()
        .column(invoice::Column::InvoiceNumber)
        .filter(invoice::Column::InvoiceNumber.starts_with(format!("{}-", prefix)))
        .order_by_desc(invoice::Column::InvoiceNumber)
        .limit(1)
        .into_tuple::<String>()
        .one(conn)
        .await?;
    Ok(numbering::next_in_sequence(
        latest.as_deref(),
        prefix,
        LONG_WIDTH,
    ))
}
