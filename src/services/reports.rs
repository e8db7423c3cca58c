use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::DbPool;
use crate::entities::{
    customer, product,
    sale::{self, SaleStatus},
    sale_item,
};
use crate::errors::ServiceError;

/// Headline figures for the landing dashboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardSummary {
    pub today_sales_count: u64,
    pub today_revenue: Decimal,
    /// Total unpaid credit across all customers
    pub outstanding_credit: Decimal,
    pub low_stock_count: u64,
    pub recent_sales: Vec<sale::Model>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProfitParams {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Margin over a date range, computed from the purchase price snapshot taken
/// on each sale line.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfitStats {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub sales_count: u64,
    pub revenue: Decimal,
    pub cost: Decimal,
    pub margin: Decimal,
}

pub struct ReportService {
    db: DbPool,
}

impl ReportService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn dashboard(&self) -> Result<DashboardSummary, ServiceError> {
        let today_start = Utc::now()
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_utc();

        let todays_sales = sale::Entity::find()
            .filter(sale::Column::CreatedAt.gte(today_start))
            .filter(sale::Column::Status.ne(SaleStatus::Cancelled))
            .all(&self.db)
            .await?;
        let today_sales_count = todays_sales.len() as u64;
        let today_revenue = todays_sales
            .iter()
            .map(|s| s.total_amount)
            .sum::<Decimal>();

        let outstanding_credit = customer::Entity::find()
            .filter(customer::Column::CreditUsed.gt(Decimal::ZERO))
            .all(&self.db)
            .await?
            .iter()
            .map(|c| c.credit_used)
            .sum::<Decimal>();

        let low_stock_count = product::Entity::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(Expr::col(product::Column::Stock).lte(Expr::col(product::Column::MinStock)))
            .count(&self.db)
            .await?;

        let recent_sales = sale::Entity::find()
            .order_by_desc(sale::Column::CreatedAt)
            .limit(5)
            .all(&self.db)
            .await?;

        Ok(DashboardSummary {
            today_sales_count,
            today_revenue,
            outstanding_credit,
            low_stock_count,
            recent_sales,
        })
    }

    pub async fn profit_stats(&self, params: ProfitParams) -> Result<ProfitStats, ServiceError> {
        if params.from > params.to {
            return Err(ServiceError::ValidationError(
                "'from' must not be after 'to'".to_string(),
            ));
        }

        let sales = sale::Entity::find()
            .filter(sale::Column::CreatedAt.gte(params.from))
            .filter(sale::Column::CreatedAt.lte(params.to))
            .filter(sale::Column::Status.ne(SaleStatus::Cancelled))
            .all(&self.db)
            .await?;

        let mut revenue = Decimal::ZERO;
        let mut cost = Decimal::ZERO;
        for s in &sales {
            let items = sale_item::Entity::find()
                .filter(sale_item::Column::SaleId.eq(s.id))
                .all(&self.db)
                .await?;
            for item in items {
                revenue += item.total;
                cost += item.purchase_price * Decimal::from(item.quantity);
            }
        }

        Ok(ProfitStats {
            from: params.from,
            to: params.to,
            sales_count: sales.len() as u64,
            revenue,
            cost,
            margin: revenue - cost,
        })
    }
}
