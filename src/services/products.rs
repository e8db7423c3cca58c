use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::cache::{CacheBackend, ACTIVE_PRODUCTS_KEY};
use crate::db::DbPool;
use crate::entities::product;
use crate::errors::ServiceError;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 100))]
    pub sku: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub purchase_price: Option<Decimal>,
    pub price: Decimal,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    #[validate(range(min = 0))]
    pub min_stock: Option<i32>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub purchase_price: Option<Decimal>,
    pub price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub min_stock: Option<i32>,
    pub category_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProductListParams {
    /// Substring match on name or SKU
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    /// Include soft-deleted products
    #[serde(default)]
    pub include_inactive: bool,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductPage {
    pub products: Vec<product::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

pub struct ProductService {
    db: DbPool,
    cache: Arc<dyn CacheBackend>,
    cache_ttl: Duration,
}

impl ProductService {
    pub fn new(db: DbPool, cache: Arc<dyn CacheBackend>, cache_ttl: Duration) -> Self {
        Self {
            db,
            cache,
            cache_ttl,
        }
    }

    #[instrument(skip(self, request), fields(sku = %request.sku))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;

        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(request.sku.clone()),
            name: Set(request.name),
            description: Set(request.description),
            purchase_price: Set(request.purchase_price.unwrap_or(Decimal::ZERO)),
            price: Set(request.price),
            stock: Set(request.stock.unwrap_or(0)),
            min_stock: Set(request.min_stock.unwrap_or(0)),
            category_id: Set(request.category_id),
            ..Default::default()
        };

        let created = model.insert(&self.db).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                ServiceError::Conflict(format!("SKU '{}' already exists", request.sku))
            } else {
                ServiceError::DatabaseError(e)
            }
        })?;

        self.invalidate_listing().await;
        info!(product_id = %created.id, "product created");
        Ok(created)
    }

    pub async fn get_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    #[instrument(skip(self, request))]
    pub async fn update_product(
        &self,
        id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;

        let existing = self.get_product(id).await?;
        let mut active: product::ActiveModel = existing.into();

        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(purchase_price) = request.purchase_price {
            active.purchase_price = Set(purchase_price);
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(min_stock) = request.min_stock {
            active.min_stock = Set(min_stock);
        }
        if let Some(category_id) = request.category_id {
            active.category_id = Set(Some(category_id));
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }

        let updated = active.update(&self.db).await?;
        self.invalidate_listing().await;
        Ok(updated)
    }

    /// Soft delete: the product disappears from listings but stays referenced
    /// by historical sales and movements.
    #[instrument(skip(self))]
    pub async fn deactivate_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        let existing = self.get_product(id).await?;
        let mut active: product::ActiveModel = existing.into();
        active.is_active = Set(false);
        let updated = active.update(&self.db).await?;
        self.invalidate_listing().await;
        info!(product_id = %id, "product deactivated");
        Ok(updated)
    }

    pub async fn list_products(
        &self,
        params: ProductListParams,
    ) -> Result<ProductPage, ServiceError> {
        let page = params.page.unwrap_or(1).max(1);
        let per_page = params.per_page.unwrap_or(50).clamp(1, 200);

        let mut query = product::Entity::find().order_by_asc(product::Column::Name);
        if !params.include_inactive {
            query = query.filter(product::Column::IsActive.eq(true));
        }
        if let Some(category_id) = params.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(search) = params.search.filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            query = query.filter(
                Condition::any()
                    .add(product::Column::Name.like(pattern.clone()))
                    .add(product::Column::Sku.like(pattern)),
            );
        }

        let paginator = query.paginate(&self.db, per_page);
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page - 1).await?;

        Ok(ProductPage {
            products,
            total,
            page,
            per_page,
        })
    }

    /// Active-product listing served from the TTL cache when fresh.
    pub async fn active_products(&self) -> Result<Vec<product::Model>, ServiceError> {
        match self.cache.get(ACTIVE_PRODUCTS_KEY).await {
            Ok(Some(cached)) => {
                if let Ok(products) = serde_json::from_str::<Vec<product::Model>>(&cached) {
                    debug!("active-product listing served from cache");
                    return Ok(products);
                }
                warn!("discarding undecodable cache entry");
            }
            Ok(None) => {}
            Err(e) => warn!("cache read failed: {}", e),
        }

        let products = product::Entity::find()
            .filter(product::Column::IsActive.eq(true))
            .order_by_asc(product::Column::Name)
            .all(&self.db)
            .await?;

        match serde_json::to_string(&products) {
            Ok(serialized) => {
                if let Err(e) = self
                    .cache
                    .set(ACTIVE_PRODUCTS_KEY, &serialized, Some(self.cache_ttl))
                    .await
                {
                    warn!("cache write failed: {}", e);
                }
            }
            Err(e) => warn!("could not serialize product listing for cache: {}", e),
        }

        Ok(products)
    }

    async fn invalidate_listing(&self) {
        if let Err(e) = self.cache.invalidate(ACTIVE_PRODUCTS_KEY).await {
            warn!("cache invalidation failed: {}", e);
        }
    }
}
