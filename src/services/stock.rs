use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::cache::{CacheBackend, ACTIVE_PRODUCTS_KEY};
use crate::db::DbPool;
use crate::entities::{
    product,
    stock_movement::{self, MovementType},
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Outcome of a single stock mutation, including the movement row written
/// alongside it.
#[derive(Debug, Clone)]
pub struct StockChange {
    pub movement: stock_movement::Model,
    pub old_stock: i32,
    pub new_stock: i32,
    pub min_stock: i32,
}

impl StockChange {
    pub fn is_below_minimum(&self) -> bool {
        self.new_stock <= self.min_stock
    }
}

/// The only code path that changes `products.stock`. Verifies sufficiency for
/// outbound movements and writes the paired ledger row in the caller's
/// transaction, so the on-hand figure and the movement history cannot drift.
pub async fn apply_stock_change<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    movement_type: MovementType,
    quantity: i32,
    reason: &str,
    reference: Option<String>,
) -> Result<StockChange, ServiceError> {
    if quantity <= 0 {
        return Err(ServiceError::ValidationError(
            "Quantity must be greater than zero".to_string(),
        ));
    }

    let product = product::Entity::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

    let old_stock = product.stock;
    let new_stock = match movement_type {
        MovementType::In => old_stock + quantity,
        MovementType::Out => {
            if quantity > old_stock {
                return Err(ServiceError::InsufficientStock(format!(
                    "Product '{}' has {} in stock, requested {}",
                    product.name, old_stock, quantity
                )));
            }
            old_stock - quantity
        }
    };
    let min_stock = product.min_stock;

    let mut active: product::ActiveModel = product.into();
    active.stock = Set(new_stock);
    active.update(conn).await?;

    let movement = stock_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        quantity: Set(quantity),
        movement_type: Set(movement_type),
        reason: Set(reason.to_string()),
        reference: Set(reference),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;

    Ok(StockChange {
        movement,
        old_stock,
        new_stock,
        min_stock,
    })
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecordMovementRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub movement_type: MovementType,
    #[validate(length(max = 255))]
    pub reason: Option<String>,
    #[validate(length(max = 100))]
    pub reference: Option<String>,
}

/// Severity bucket for a product at or below its reorder threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    OutOfStock,
    Critical,
    Warning,
}

/// Classifies a low-stock product. Returns `None` when stock is comfortably
/// above the threshold.
pub fn classify_stock_level(stock: i32, min_stock: i32) -> Option<AlertLevel> {
    if stock > min_stock {
        return None;
    }
    if stock == 0 {
        Some(AlertLevel::OutOfStock)
    } else if stock * 2 < min_stock {
        Some(AlertLevel::Critical)
    } else {
        Some(AlertLevel::Warning)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockAlert {
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub stock: i32,
    pub min_stock: i32,
    pub level: AlertLevel,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MovementPage {
    pub movements: Vec<stock_movement::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

pub struct StockService {
    db: DbPool,
    event_sender: Arc<EventSender>,
    cache: Arc<dyn CacheBackend>,
}

impl StockService {
    pub fn new(db: DbPool, event_sender: Arc<EventSender>, cache: Arc<dyn CacheBackend>) -> Self {
        Self {
            db,
            event_sender,
            cache,
        }
    }

    /// Manual inventory adjustment. The product update and its movement row
    /// commit together or not at all.
    #[instrument(skip(self))]
    pub async fn record_movement(
        &self,
        request: RecordMovementRequest,
    ) -> Result<stock_movement::Model, ServiceError> {
        request.validate()?;

        let reason = request
            .reason
            .clone()
            .unwrap_or_else(|| "Ajustement manuel".to_string());

        let txn = self.db.begin().await?;
        let change = apply_stock_change(
            &txn,
            request.product_id,
            request.movement_type,
            request.quantity,
            &reason,
            request.reference.clone(),
        )
        .await?;
        txn.commit().await?;

        if let Err(e) = self.cache.invalidate(ACTIVE_PRODUCTS_KEY).await {
            tracing::warn!("cache invalidation failed: {}", e);
        }

        info!(
            product_id = %request.product_id,
            old_stock = change.old_stock,
            new_stock = change.new_stock,
            "stock adjusted"
        );

        self.event_sender
            .send(Event::StockAdjusted {
                product_id: request.product_id,
                old_stock: change.old_stock,
                new_stock: change.new_stock,
                reason,
                reference: request.reference,
            })
            .await;
        if change.is_below_minimum() {
            self.event_sender
                .send(Event::LowStock {
                    product_id: request.product_id,
                    stock: change.new_stock,
                    min_stock: change.min_stock,
                })
                .await;
        }

        Ok(change.movement)
    }

    pub async fn list_movements(
        &self,
        product_id: Option<Uuid>,
        page: u64,
        per_page: u64,
    ) -> Result<MovementPage, ServiceError> {
        let mut query = stock_movement::Entity::find()
            .order_by_desc(stock_movement::Column::CreatedAt);
        if let Some(product_id) = product_id {
            query = query.filter(stock_movement::Column::ProductId.eq(product_id));
        }

        let paginator = query.paginate(&self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let movements = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(MovementPage {
            movements,
            total,
            page,
            per_page,
        })
    }

    /// Active products at or below their reorder threshold, worst first.
    pub async fn stock_alerts(&self) -> Result<Vec<StockAlert>, ServiceError> {
        let products = product::Entity::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(
                sea_orm::sea_query::Expr::col(product::Column::Stock)
                    .lte(sea_orm::sea_query::Expr::col(product::Column::MinStock)),
            )
            .order_by_asc(product::Column::Stock)
            .all(&self.db)
            .await?;

        let alerts = products
            .into_iter()
            .filter_map(|p| {
                classify_stock_level(p.stock, p.min_stock).map(|level| StockAlert {
                    product_id: p.id,
                    sku: p.sku,
                    name: p.name,
                    stock: p.stock,
                    min_stock: p.min_stock,
                    level,
                })
            })
            .collect();

        Ok(alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, 10 => Some(AlertLevel::OutOfStock); "zero is out of stock")]
    #[test_case(4, 10 => Some(AlertLevel::Critical); "below half the threshold")]
    #[test_case(5, 10 => Some(AlertLevel::Warning); "exactly half the threshold")]
    #[test_case(10, 10 => Some(AlertLevel::Warning); "at the threshold")]
    #[test_case(11, 10 => None; "above the threshold")]
    #[test_case(0, 0 => Some(AlertLevel::OutOfStock); "zero threshold, zero stock")]
    fn alert_levels(stock: i32, min_stock: i32) -> Option<AlertLevel> {
        classify_stock_level(stock, min_stock)
    }
}
