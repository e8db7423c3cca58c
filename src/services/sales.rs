use std::sync::Arc;

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

use crate::cache::{CacheBackend, ACTIVE_PRODUCTS_KEY};
use crate::db::DbPool;
use crate::entities::{
    customer, product,
    sale::{self, PaymentMethod, SaleStatus},
    sale_item,
    stock_movement::MovementType,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::credit::adjust_customer_credit;
use crate::services::numbering::{self, SALE_PREFIX, SHORT_WIDTH};
use crate::services::stock::{apply_stock_change, StockChange};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SaleLineRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    /// Defaults to the product's current selling price
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSaleRequest {
    pub customer_id: Option<Uuid>,
    #[validate]
    #[validate(length(min = 1, message = "A sale needs at least one line"))]
    pub items: Vec<SaleLineRequest>,
    /// Defaults to the full total (cash-and-carry)
    pub paid_amount: Option<Decimal>,
    pub payment_method: PaymentMethod,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SaleWithItems {
    #[serde(flatten)]
    pub sale: sale::Model,
    pub items: Vec<sale_item::Model>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SaleListParams {
    pub customer_id: Option<Uuid>,
    pub status: Option<SaleStatus>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SalePage {
    pub sales: Vec<sale::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Everything needed to materialize a sale inside a transaction. Built from a
/// direct request or from a quote's locked-in lines.
#[derive(Debug, Clone)]
pub struct SaleDraft {
    pub customer_id: Option<Uuid>,
    pub seller_id: Uuid,
    pub lines: Vec<SaleLineRequest>,
    pub paid_amount: Option<Decimal>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

/// Result of an in-transaction sale insert, carried out of the transaction so
/// the caller can emit events for durable state only.
pub struct SaleInsertOutcome {
    pub sale: sale::Model,
    pub items: Vec<sale_item::Model>,
    pub stock_changes: Vec<StockChange>,
}

/// Inserts a sale with its items, decrements stock through the shared
/// mutation path and books any credit portion against the customer, all on
/// the caller's connection. Nothing is mutated until every line has been
/// verified against current stock.
pub(crate) async fn insert_sale<C: ConnectionTrait>(
    conn: &C,
    draft: &SaleDraft,
) -> Result<SaleInsertOutcome, ServiceError> {
    if draft.lines.is_empty() {
        return Err(ServiceError::ValidationError(
            "A sale needs at least one line".to_string(),
        ));
    }

    let customer = match draft.customer_id {
        Some(customer_id) => Some(
            customer::Entity::find_by_id(customer_id)
                .one(conn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Customer {} not found", customer_id))
                })?,
        ),
        None => None,
    };

    // Verify every line before touching anything, naming the offender.
    let mut priced_lines = Vec::with_capacity(draft.lines.len());
    for line in &draft.lines {
        if line.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }
        let product = product::Entity::find_by_id(line.product_id)
            .one(conn)
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
        if line.quantity > product.stock {
            return Err(ServiceError::InsufficientStock(format!(
                "Product '{}' has {} in stock, requested {}",
                product.name, product.stock, line.quantity
            )));
        }
        let unit_price = line.unit_price.unwrap_or(product.price);
        priced_lines.push((product, line.quantity, unit_price));
    }

    let total: Decimal = priced_lines
        .iter()
        .map(|(_, qty, unit_price)| *unit_price * Decimal::from(*qty))
        .sum();
    let paid = draft.paid_amount.unwrap_or(total);
    if paid < Decimal::ZERO || paid > total {
        return Err(ServiceError::ValidationError(format!(
            "Paid amount must be between 0 and the sale total ({})",
            total
        )));
    }
    let credit = total - paid;

    if credit > Decimal::ZERO {
        let customer = customer.as_ref().ok_or_else(|| {
            ServiceError::CreditError("Credit sales require a customer".to_string())
        })?;
        if customer.is_blocked {
            return Err(ServiceError::CreditError(format!(
                "Customer '{}' is blocked and cannot take new credit",
                customer.name
            )));
        }
    }

    let latest = sale::Entity::find()
        .select_only()
        .column(sale::Column::SaleNumber)
        .order_by_desc(sale::Column::SaleNumber)
        .limit(1)
        .into_tuple::<String>()
        .one(conn)
        .await?;
    let sale_number = numbering::next_in_sequence(latest.as_deref(), SALE_PREFIX, SHORT_WIDTH);

    let status = if credit <= Decimal::ZERO {
        SaleStatus::Completed
    } else {
        SaleStatus::Pending
    };

    let sale = sale::ActiveModel {
        id: Set(Uuid::new_v4()),
        sale_number: Set(sale_number.clone()),
        customer_id: Set(draft.customer_id),
        seller_id: Set(draft.seller_id),
        total_amount: Set(total),
        paid_amount: Set(paid),
        credit_amount: Set(credit),
        payment_method: Set(draft.payment_method),
        status: Set(status),
        notes: Set(draft.notes.clone()),
        created_at: Set(chrono::Utc::now()),
        updated_at: Set(None),
    }
    .insert(conn)
    .await?;

    let mut items = Vec::with_capacity(priced_lines.len());
    let mut stock_changes = Vec::with_capacity(priced_lines.len());
    for (product, quantity, unit_price) in &priced_lines {
        let item = sale_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            sale_id: Set(sale.id),
            product_id: Set(product.id),
            quantity: Set(*quantity),
            unit_price: Set(*unit_price),
            purchase_price: Set(product.purchase_price),
            total: Set(*unit_price * Decimal::from(*quantity)),
        }
        .insert(conn)
        .await?;
        items.push(item);

        let change = apply_stock_change(
            conn,
            product.id,
            MovementType::Out,
            *quantity,
            "Vente",
            Some(sale_number.clone()),
        )
        .await?;
        stock_changes.push(change);
    }

    if credit > Decimal::ZERO {
        if let Some(customer) = &customer {
            adjust_customer_credit(conn, customer.id, credit).await?;
        }
    }

    Ok(SaleInsertOutcome {
        sale,
        items,
        stock_changes,
    })
}

pub struct SaleService {
    db: DbPool,
    event_sender: Arc<EventSender>,
    cache: Arc<dyn CacheBackend>,
}

impl SaleService {
    pub fn new(db: DbPool, event_sender: Arc<EventSender>, cache: Arc<dyn CacheBackend>) -> Self {
        Self {
            db,
            event_sender,
            cache,
        }
    }

    /// Creates a sale atomically: sale + items + per-line stock decrement +
    /// customer credit in one transaction, retried on number collision.
    #[instrument(skip(self, request))]
    pub async fn create_sale(
        &self,
        seller_id: Uuid,
        request: CreateSaleRequest,
    ) -> Result<SaleWithItems, ServiceError> {
        request.validate()?;

        let draft = SaleDraft {
            customer_id: request.customer_id,
            seller_id,
            lines: request.items,
            paid_amount: request.paid_amount,
            payment_method: request.payment_method,
            notes: request.notes,
        };

        let db = &self.db;
        let draft_ref = &draft;
        let outcome = numbering::with_number_retry(SALE_PREFIX, move || async move {
            let txn = db.begin().await?;
            let outcome = insert_sale(&txn, draft_ref).await?;
            txn.commit().await?;
            Ok(outcome)
        })
        .await?;

        self.after_sale_committed(&outcome).await;
        info!(
            sale_id = %outcome.sale.id,
            sale_number = %outcome.sale.sale_number,
            total = %outcome.sale.total_amount,
            "sale created"
        );

        Ok(SaleWithItems {
            sale: outcome.sale,
            items: outcome.items,
        })
    }

    /// Post-commit bookkeeping shared with quote conversion: cache
    /// invalidation and domain events.
    pub(crate) async fn after_sale_committed(&self, outcome: &SaleInsertOutcome) {
        if let Err(e) = self.cache.invalidate(ACTIVE_PRODUCTS_KEY).await {
            tracing::warn!("cache invalidation failed: {}", e);
        }

        self.event_sender
            .send(Event::SaleCreated {
                sale_id: outcome.sale.id,
                sale_number: outcome.sale.sale_number.clone(),
                total_amount: outcome.sale.total_amount,
                credit_amount: outcome.sale.credit_amount,
            })
            .await;

        for change in &outcome.stock_changes {
            if change.is_below_minimum() {
                self.event_sender
                    .send(Event::LowStock {
                        product_id: change.movement.product_id,
                        stock: change.new_stock,
                        min_stock: change.min_stock,
                    })
                    .await;
            }
        }
    }

    pub async fn get_sale(&self, id: Uuid) -> Result<SaleWithItems, ServiceError> {
        let sale = sale::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Sale {} not found", id)))?;
        let items = sale_item::Entity::find()
            .filter(sale_item::Column::SaleId.eq(id))
            .all(&self.db)
            .await?;
        Ok(SaleWithItems { sale, items })
    }

    pub async fn list_sales(&self, params: SaleListParams) -> Result<SalePage, ServiceError> {
        let page = params.page.unwrap_or(1).max(1);
        let per_page = params.per_page.unwrap_or(50).clamp(1, 200);

        let mut query = sale::Entity::find().order_by_desc(sale::Column::CreatedAt);
        if let Some(customer_id) = params.customer_id {
            query = query.filter(sale::Column::CustomerId.eq(customer_id));
        }
        if let Some(status) = params.status {
            query = query.filter(sale::Column::Status.eq(status));
        }

        let paginator = query.paginate(&self.db, per_page);
        let total = paginator.num_items().await?;
        let sales = paginator.fetch_page(page - 1).await?;

        Ok(SalePage {
            sales,
            total,
            page,
            per_page,
        })
    }

    /// Cancels a sale: restores stock line by line through the shared
    /// mutation path and releases any outstanding credit, atomically.
    #[instrument(skip(self))]
    pub async fn cancel_sale(&self, id: Uuid) -> Result<SaleWithItems, ServiceError> {
        let txn = self.db.begin().await?;

        let sale = sale::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Sale {} not found", id)))?;
        if sale.status == SaleStatus::Cancelled {
            return Err(ServiceError::InvalidOperation(format!(
                "Sale {} is already cancelled",
                sale.sale_number
            )));
        }

        let items = sale_item::Entity::find()
            .filter(sale_item::Column::SaleId.eq(id))
            .all(&txn)
            .await?;

        for item in &items {
            apply_stock_change(
                &txn,
                item.product_id,
                MovementType::In,
                item.quantity,
                "Annulation vente",
                Some(sale.sale_number.clone()),
            )
            .await?;
        }

        if sale.credit_amount > Decimal::ZERO {
            if let Some(customer_id) = sale.customer_id {
                adjust_customer_credit(&txn, customer_id, -sale.credit_amount).await?;
            }
        }

        let sale_number = sale.sale_number.clone();
        let mut active: sale::ActiveModel = sale.into();
        active.status = Set(SaleStatus::Cancelled);
        active.updated_at = Set(Some(chrono::Utc::now()));
        let cancelled = active.update(&txn).await?;

        txn.commit().await?;

        if let Err(e) = self.cache.invalidate(ACTIVE_PRODUCTS_KEY).await {
            tracing::warn!("cache invalidation failed: {}", e);
        }
        self.event_sender
            .send(Event::SaleCancelled {
                sale_id: id,
                sale_number,
            })
            .await;

        Ok(SaleWithItems {
            sale: cancelled,
            items,
        })
    }
}
