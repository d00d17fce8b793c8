//! Inventory repository

use crate::{error::AppError, models::inventory::*};
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct InventoryRepository {
    db: PgPool,
}

impl InventoryRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Per-product stock with valuation at cost
    pub async fn stock_status(&self, business_id: Uuid) -> Result<Vec<StockStatusRow>, AppError> {
        let rows = sqlx::query_as::<_, StockStatusRow>(
            r#"
            SELECT
                p.id AS product_id, p.name AS product_name, p.sku,
                c.name AS category_name,
                p.stock_quantity, p.min_stock_level, p.cost_price,
                p.stock_quantity * p.cost_price AS stock_value
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id AND NOT c.is_deleted
            WHERE p.business_id = $1 AND NOT p.is_deleted
            ORDER BY p.name
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    pub async fn list_transactions(
        &self,
        business_id: Uuid,
        query: &TransactionListQuery,
    ) -> Result<(Vec<TransactionRow>, i64), AppError> {
        let offset = (query.page.max(1) - 1) * query.limit;

        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT
                t.id, t.product_id, p.name AS product_name, p.sku,
                u.username, t.transaction_type, t.quantity_change,
                t.previous_quantity, t.new_quantity, t.notes, t.created_at
            FROM inventory_transactions t
            JOIN products p ON p.id = t.product_id
            JOIN users u ON u.id = t.user_id
            WHERE t.business_id = $1
              AND ($2::uuid IS NULL OR t.product_id = $2)
              AND ($3::text IS NULL OR t.transaction_type = $3)
              AND ($4::date IS NULL OR t.created_at >= $4::date)
              AND ($5::date IS NULL OR t.created_at < $5::date + INTERVAL '1 day')
            ORDER BY t.created_at DESC
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(business_id)
        .bind(query.product_id)
        .bind(&query.transaction_type)
        .bind(query.start_date)
        .bind(query.end_date)
        .bind(query.limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) FROM inventory_transactions t
            WHERE t.business_id = $1
              AND ($2::uuid IS NULL OR t.product_id = $2)
              AND ($3::text IS NULL OR t.transaction_type = $3)
              AND ($4::date IS NULL OR t.created_at >= $4::date)
              AND ($5::date IS NULL OR t.created_at < $5::date + INTERVAL '1 day')
            "#,
        )
        .bind(business_id)
        .bind(query.product_id)
        .bind(&query.transaction_type)
        .bind(query.start_date)
        .bind(query.end_date)
        .fetch_one(&self.db)
        .await?
        .get(0);

        Ok((rows, total))
    }

    pub async fn value_report(
        &self,
        business_id: Uuid,
        start: Option<chrono::NaiveDate>,
        end: Option<chrono::NaiveDate>,
    ) -> Result<InventoryValueReport, AppError> {
        let valuation = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(stock_quantity * cost_price), 0) AS total_value,
                COALESCE(SUM(stock_quantity), 0)::bigint AS total_units,
                COUNT(*) AS product_count
            FROM products
            WHERE business_id = $1 AND NOT is_deleted
            "#,
        )
        .bind(business_id)
        .fetch_one(&self.db)
        .await?;

        let movement = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(quantity_change) FILTER (WHERE quantity_change > 0), 0)::bigint AS units_in,
                COALESCE(-SUM(quantity_change) FILTER (WHERE quantity_change < 0), 0)::bigint AS units_out
            FROM inventory_transactions
            WHERE business_id = $1
              AND ($2::date IS NULL OR created_at >= $2::date)
              AND ($3::date IS NULL OR created_at < $3::date + INTERVAL '1 day')
            "#,
        )
        .bind(business_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.db)
        .await?;

        Ok(InventoryValueReport {
            total_stock_value: valuation.get("total_value"),
            total_units: valuation.get("total_units"),
            product_count: valuation.get("product_count"),
            units_in: movement.get("units_in"),
            units_out: movement.get("units_out"),
        })
    }
}
