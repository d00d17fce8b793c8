//! Sale repository.
//! Reads for sales, line items and the credit-payment ledger. Writes that
//! must be atomic (sale creation, payment recording) live in the sale
//! service, inside a transaction.

use crate::{error::AppError, models::sale::*};
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct SaleRepository {
    db: PgPool,
}

impl SaleRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        business_id: Uuid,
        query: &SaleListQuery,
    ) -> Result<(Vec<SaleListRow>, i64), AppError> {
        let offset = (query.page.max(1) - 1) * query.limit;

        let rows = sqlx::query_as::<_, SaleListRow>(
            r#"
            SELECT
                s.id, s.customer_id, c.name AS customer_name,
                u.username AS cashier_name,
                s.total_amount, s.discount, s.tax, s.payment_method,
                s.amount_paid, s.status, s.created_at
            FROM sales s
            LEFT JOIN customers c ON c.id = s.customer_id
            JOIN users u ON u.id = s.user_id
            WHERE s.business_id = $1
              AND s.parent_sale_id IS NULL
              AND NOT s.is_deleted
              AND ($2::date IS NULL OR s.created_at >= $2::date)
              AND ($3::date IS NULL OR s.created_at < $3::date + INTERVAL '1 day')
              AND ($4::text IS NULL OR s.status = $4)
            ORDER BY s.created_at DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(business_id)
        .bind(query.start_date)
        .bind(query.end_date)
        .bind(&query.status)
        .bind(query.limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) FROM sales s
            WHERE s.business_id = $1
              AND s.parent_sale_id IS NULL
              AND NOT s.is_deleted
              AND ($2::date IS NULL OR s.created_at >= $2::date)
              AND ($3::date IS NULL OR s.created_at < $3::date + INTERVAL '1 day')
              AND ($4::text IS NULL OR s.status = $4)
            "#,
        )
        .bind(business_id)
        .bind(query.start_date)
        .bind(query.end_date)
        .bind(&query.status)
        .fetch_one(&self.db)
        .await?
        .get(0);

        Ok((rows, total))
    }

    pub async fn find_by_id(&self, id: Uuid, business_id: Uuid) -> Result<Option<Sale>, AppError> {
        let sale = sqlx::query_as::<_, Sale>(
            "SELECT * FROM sales WHERE id = $1 AND business_id = $2 AND NOT is_deleted",
        )
        .bind(id)
        .bind(business_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(sale)
    }

    pub async fn items_for_sale(&self, sale_id: Uuid) -> Result<Vec<SaleItemDetail>, AppError> {
        let items = sqlx::query_as::<_, SaleItemDetail>(
            r#"
            SELECT
                si.id, si.product_id, p.name AS product_name, p.sku,
                si.quantity, si.unit_price, si.subtotal
            FROM sale_items si
            JOIN products p ON p.id = si.product_id
            WHERE si.sale_id = $1
            ORDER BY p.name
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    /// Payment ledger: child rows referencing this sale
    pub async fn payments_for_sale(&self, sale_id: Uuid) -> Result<Vec<SalePayment>, AppError> {
        let payments = sqlx::query_as::<_, SalePayment>(
            r#"
            SELECT id, amount_paid, payment_method, notes, created_at
            FROM sales
            WHERE parent_sale_id = $1 AND NOT is_deleted
            ORDER BY created_at
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.db)
        .await?;

        Ok(payments)
    }

    /// Sum of payments recorded against a credit sale, including the
    /// upfront portion stored on the parent row.
    pub async fn paid_total(&self, sale: &Sale) -> Result<f64, AppError> {
        let child_total: f64 = sqlx::query(
            r#"
            SELECT COALESCE(SUM(amount_paid), 0)
            FROM sales
            WHERE parent_sale_id = $1 AND NOT is_deleted
            "#,
        )
        .bind(sale.id)
        .fetch_one(&self.db)
        .await?
        .get(0);

        Ok(sale.amount_paid + child_total)
    }

    pub async fn report(
        &self,
        business_id: Uuid,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        group_by: &str,
    ) -> Result<Vec<SaleReportBucket>, AppError> {
        // date_trunc unit is validated by the service before we get here
        let format = match group_by {
            "month" => "YYYY-MM",
            "week" => "IYYY-IW",
            _ => "YYYY-MM-DD",
        };
        let trunc_unit = match group_by {
            "month" => "month",
            "week" => "week",
            _ => "day",
        };

        let buckets = sqlx::query_as::<_, SaleReportBucket>(&format!(
            r#"
            SELECT
                to_char(date_trunc('{unit}', s.created_at), '{format}') AS period,
                COUNT(DISTINCT s.id) AS sale_count,
                COALESCE(SUM(si.subtotal), 0) AS revenue,
                COALESCE(SUM(si.cost_price * si.quantity), 0) AS cogs,
                COALESCE(SUM(si.subtotal) - SUM(si.cost_price * si.quantity), 0) AS gross_profit
            FROM sales s
            JOIN sale_items si ON si.sale_id = s.id
            WHERE s.business_id = $1
              AND s.parent_sale_id IS NULL
              AND NOT s.is_deleted
              AND s.status <> 'refunded'
              AND ($2::date IS NULL OR s.created_at >= $2::date)
              AND ($3::date IS NULL OR s.created_at < $3::date + INTERVAL '1 day')
            GROUP BY date_trunc('{unit}', s.created_at)
            ORDER BY date_trunc('{unit}', s.created_at)
            "#,
            unit = trunc_unit,
            format = format,
        ))
        .bind(business_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;

        Ok(buckets)
    }

    /// Total still owed across all open credit sales
    pub async fn outstanding_credit(&self, business_id: Uuid) -> Result<f64, AppError> {
        let total: f64 = sqlx::query(
            r#"
            SELECT COALESCE(SUM(s.total_amount - s.amount_paid - COALESCE(p.paid, 0)), 0)
            FROM sales s
            LEFT JOIN LATERAL (
                SELECT SUM(amount_paid) AS paid FROM sales
                WHERE parent_sale_id = s.id AND NOT is_deleted
            ) p ON TRUE
            WHERE s.business_id = $1
              AND s.status = 'unpaid'
              AND s.parent_sale_id IS NULL
              AND NOT s.is_deleted
            "#,
        )
        .bind(business_id)
        .fetch_one(&self.db)
        .await?
        .get(0);

        Ok(total)
    }

    pub async fn top_products(
        &self,
        business_id: Uuid,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        limit: i64,
    ) -> Result<Vec<TopProductRow>, AppError> {
        let rows = sqlx::query_as::<_, TopProductRow>(
            r#"
            SELECT
                si.product_id, p.name AS product_name, p.sku,
                SUM(si.quantity)::bigint AS total_quantity,
                COALESCE(SUM(si.subtotal), 0) AS total_revenue
            FROM sale_items si
            JOIN sales s ON s.id = si.sale_id
            JOIN products p ON p.id = si.product_id
            WHERE s.business_id = $1
              AND s.parent_sale_id IS NULL
              AND NOT s.is_deleted
              AND s.status <> 'refunded'
              AND ($2::date IS NULL OR s.created_at >= $2::date)
              AND ($3::date IS NULL OR s.created_at < $3::date + INTERVAL '1 day')
            GROUP BY si.product_id, p.name, p.sku
            ORDER BY total_quantity DESC
            LIMIT $4
            "#,
        )
        .bind(business_id)
        .bind(start)
        .bind(end)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Open credit sales with their running balances
    pub async fn credit_report(&self, business_id: Uuid) -> Result<Vec<CreditSaleRow>, AppError> {
        let rows = sqlx::query_as::<_, CreditSaleRow>(
            r#"
            SELECT
                s.id, s.customer_id, c.name AS customer_name,
                s.total_amount,
                s.amount_paid + COALESCE(p.paid, 0) AS paid_amount,
                s.total_amount - s.amount_paid - COALESCE(p.paid, 0) AS remaining_amount,
                s.created_at
            FROM sales s
            LEFT JOIN customers c ON c.id = s.customer_id
            LEFT JOIN LATERAL (
                SELECT SUM(amount_paid) AS paid FROM sales
                WHERE parent_sale_id = s.id AND NOT is_deleted
            ) p ON TRUE
            WHERE s.business_id = $1
              AND s.status = 'unpaid'
              AND s.parent_sale_id IS NULL
              AND NOT s.is_deleted
            ORDER BY s.created_at
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }
}
