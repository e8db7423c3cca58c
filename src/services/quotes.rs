use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
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
    company_settings, product,
    quote::{self, QuoteStatus},
    quote_item,
    sale::PaymentMethod,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::numbering::{self, QUOTE_PREFIX, SALE_PREFIX, SHORT_WIDTH};
use crate::services::sales::{
    insert_sale, SaleDraft, SaleLineRequest, SaleService, SaleWithItems,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateQuoteRequest {
    pub customer_id: Option<Uuid>,
    #[validate]
    #[validate(length(min = 1, message = "A quote needs at least one line"))]
    pub items: Vec<SaleLineRequest>,
    /// Defaults to now + the configured validity window
    pub valid_until: Option<DateTime<Utc>>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ConvertQuoteRequest {
    /// Defaults to the full quote total
    pub paid_amount: Option<Decimal>,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuoteWithItems {
    #[serde(flatten)]
    pub quote: quote::Model,
    pub items: Vec<quote_item::Model>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct QuoteListParams {
    pub customer_id: Option<Uuid>,
    pub status: Option<QuoteStatus>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuotePage {
    pub quotes: Vec<quote::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

pub struct QuoteService {
    db: DbPool,
    event_sender: Arc<EventSender>,
    sale_service: Arc<SaleService>,
}

impl QuoteService {
    pub fn new(db: DbPool, event_sender: Arc<EventSender>, sale_service: Arc<SaleService>) -> Self {
        Self {
            db,
            event_sender,
            sale_service,
        }
    }

    /// Creates a quote with locked-in unit prices. Quotes never touch stock.
    #[instrument(skip(self, request))]
    pub async fn create_quote(
        &self,
        request: CreateQuoteRequest,
    ) -> Result<QuoteWithItems, ServiceError> {
        request.validate()?;

        let validity_days = self.quote_validity_days().await?;
        let valid_until = request
            .valid_until
            .unwrap_or_else(|| Utc::now() + Duration::days(validity_days as i64));

        let db = &self.db;
        let request_ref = &request;
        let result = numbering::with_number_retry(QUOTE_PREFIX, move || async move {
            let txn = db.begin().await?;

            // Lock in current prices for every line.
            let mut priced_lines = Vec::with_capacity(request_ref.items.len());
            for line in &request_ref.items {
                let product = product::Entity::find_by_id(line.product_id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Product {} not found", line.product_id))
                    })?;
                if !product.is_active {
                    return Err(ServiceError::InvalidOperation(format!(
                        "Product '{}' is no longer active",
                        product.name
                    )));
                }
                let unit_price = line.unit_price.unwrap_or(product.price);
                priced_lines.push((product.id, line.quantity, unit_price));
            }

            let total: Decimal = priced_lines
                .iter()
                .map(|(_, qty, unit_price)| *unit_price * Decimal::from(*qty))
                .sum();

            let latest = quote::Entity::find()
                .select_only()
                .column(quote::Column::QuoteNumber)
                .order_by_desc(quote::Column::QuoteNumber)
                .limit(1)
                .into_tuple::<String>()
                .one(&txn)
                .await?;
            let quote_number =
                numbering::next_in_sequence(latest.as_deref(), QUOTE_PREFIX, SHORT_WIDTH);

            let created = quote::ActiveModel {
                id: Set(Uuid::new_v4()),
                quote_number: Set(quote_number),
                customer_id: Set(request_ref.customer_id),
                status: Set(QuoteStatus::Draft),
                valid_until: Set(valid_until),
                converted_to_sale_id: Set(None),
                total_amount: Set(total),
                notes: Set(request_ref.notes.clone()),
                created_at: Set(Utc::now()),
                updated_at: Set(None),
            }
            .insert(&txn)
            .await?;

            let mut items = Vec::with_capacity(priced_lines.len());
            for (product_id, quantity, unit_price) in &priced_lines {
                let item = quote_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    quote_id: Set(created.id),
                    product_id: Set(*product_id),
                    quantity: Set(*quantity),
                    unit_price: Set(*unit_price),
                    total: Set(*unit_price * Decimal::from(*quantity)),
                }
                .insert(&txn)
                .await?;
                items.push(item);
            }

            txn.commit().await?;
            Ok(QuoteWithItems {
                quote: created,
                items,
            })
        })
        .await?;

        info!(quote_id = %result.quote.id, quote_number = %result.quote.quote_number, "quote created");
        Ok(result)
    }

    pub async fn get_quote(&self, id: Uuid) -> Result<QuoteWithItems, ServiceError> {
        let quote = quote::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Quote {} not found", id)))?;
        let items = quote_item::Entity::find()
            .filter(quote_item::Column::QuoteId.eq(id))
            .all(&self.db)
            .await?;
        Ok(QuoteWithItems { quote, items })
    }

    pub async fn list_quotes(&self, params: QuoteListParams) -> Result<QuotePage, ServiceError> {
        let page = params.page.unwrap_or(1).max(1);
        let per_page = params.per_page.unwrap_or(50).clamp(1, 200);

        let mut query = quote::Entity::find().order_by_desc(quote::Column::CreatedAt);
        if let Some(customer_id) = params.customer_id {
            query = query.filter(quote::Column::CustomerId.eq(customer_id));
        }
        if let Some(status) = params.status {
            query = query.filter(quote::Column::Status.eq(status));
        }

        let paginator = query.paginate(&self.db, per_page);
        let total = paginator.num_items().await?;
        let quotes = paginator.fetch_page(page - 1).await?;

        Ok(QuotePage {
            quotes,
            total,
            page,
            per_page,
        })
    }

    /// Draft → Sent.
    pub async fn send_quote(&self, id: Uuid) -> Result<quote::Model, ServiceError> {
        self.transition(id, QuoteStatus::Sent, &[QuoteStatus::Draft])
            .await
    }

    /// Draft|Sent → Rejected.
    pub async fn reject_quote(&self, id: Uuid) -> Result<quote::Model, ServiceError> {
        self.transition(
            id,
            QuoteStatus::Rejected,
            &[QuoteStatus::Draft, QuoteStatus::Sent],
        )
        .await
    }

    async fn transition(
        &self,
        id: Uuid,
        to: QuoteStatus,
        allowed_from: &[QuoteStatus],
    ) -> Result<quote::Model, ServiceError> {
        let quote = quote::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Quote {} not found", id)))?;

        if !allowed_from.contains(&quote.status) {
            return Err(ServiceError::InvalidOperation(format!(
                "Quote {} cannot move from {:?} to {:?}",
                quote.quote_number, quote.status, to
            )));
        }

        let mut active: quote::ActiveModel = quote.into();
        active.status = Set(to);
        active.updated_at = Set(Some(Utc::now()));
        Ok(active.update(&self.db).await?)
    }

    /// Converts a quote into a sale at the quoted prices. Stock is
    /// re-verified at conversion time; the quote flips to `CONVERTED` in the
    /// same transaction as the sale insert, so it can convert at most once.
    #[instrument(skip(self, request))]
    pub async fn convert_to_sale(
        &self,
        id: Uuid,
        seller_id: Uuid,
        request: ConvertQuoteRequest,
    ) -> Result<SaleWithItems, ServiceError> {
        request.validate()?;

        let db = &self.db;
        let request_ref = &request;
        let outcome = numbering::with_number_retry(SALE_PREFIX, move || async move {
            let txn = db.begin().await?;

            let quote = quote::Entity::find_by_id(id)
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Quote {} not found", id)))?;

            if !quote.status.is_convertible() {
                return Err(ServiceError::InvalidOperation(format!(
                    "Quote {} is {:?} and cannot be converted",
                    quote.quote_number, quote.status
                )));
            }
            if quote.valid_until < Utc::now() {
                return Err(ServiceError::InvalidOperation(format!(
                    "Quote {} expired on {}",
                    quote.quote_number,
                    quote.valid_until.date_naive()
                )));
            }

            let items = quote_item::Entity::find()
                .filter(quote_item::Column::QuoteId.eq(id))
                .all(&txn)
                .await?;
            if items.is_empty() {
                return Err(ServiceError::InvalidOperation(format!(
                    "Quote {} has no lines",
                    quote.quote_number
                )));
            }

            let draft = SaleDraft {
                customer_id: quote.customer_id,
                seller_id,
                lines: items
                    .iter()
                    .map(|item| SaleLineRequest {
                        product_id: item.product_id,
                        quantity: item.quantity,
                        unit_price: Some(item.unit_price),
                    })
                    .collect(),
                paid_amount: request_ref.paid_amount,
                payment_method: request_ref.payment_method,
                notes: Some(format!("Converti du devis {}", quote.quote_number)),
            };

            let outcome = insert_sale(&txn, &draft).await?;

            let mut active: quote::ActiveModel = quote.into();
            active.status = Set(QuoteStatus::Converted);
            active.converted_to_sale_id = Set(Some(outcome.sale.id));
            active.updated_at = Set(Some(Utc::now()));
            active.update(&txn).await?;

            txn.commit().await?;
            Ok(outcome)
        })
        .await?;

        self.sale_service.after_sale_committed(&outcome).await;
        self.event_sender
            .send(Event::QuoteConverted {
                quote_id: id,
                sale_id: outcome.sale.id,
            })
            .await;
        info!(quote_id = %id, sale_id = %outcome.sale.id, "quote converted to sale");

        Ok(SaleWithItems {
            sale: outcome.sale,
            items: outcome.items,
        })
    }

    async fn quote_validity_days(&self) -> Result<i32, ServiceError> {
        let settings = company_settings::Entity::find().one(&self.db).await?;
        Ok(settings
            .map(|s| s.quote_validity_days)
            .unwrap_or(company_settings::Model::DEFAULT_QUOTE_VALIDITY_DAYS))
    }
}
