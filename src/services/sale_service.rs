//! Sale flows.
//! Creating a sale, recording a credit payment and refunding all touch
//! several tables and run inside one transaction: stock is checked and
//! decremented under a row lock so two concurrent sales cannot both
//! take the last unit.

use crate::{
    error::AppError,
    models::sale::*,
    repository::SaleRepository,
};
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Amounts are compared with a small tolerance to absorb float noise
const AMOUNT_EPSILON: f64 = 0.005;

/// Loyalty points granted per unit of revenue
const LOYALTY_POINTS_DIVISOR: f64 = 10.0;

const PAYMENT_METHODS: &[&str] = &["cash", "card", "credit", "mixed"];

pub struct SaleService {
    db: PgPool,
    sales: SaleRepository,
}

impl SaleService {
    pub fn new(db: PgPool) -> Self {
        Self {
            sales: SaleRepository::new(db.clone()),
            db,
        }
    }

    pub async fn create_sale(
        &self,
        business_id: Uuid,
        user_id: Uuid,
        req: &CreateSaleRequest,
    ) -> Result<SaleDetail, AppError> {
        if !PAYMENT_METHODS.contains(&req.payment_method.as_str()) {
            return Err(AppError::BadRequest(format!(
                "Invalid payment method: {}",
                req.payment_method
            )));
        }

        let discount = req.discount.unwrap_or(0.0);
        let tax = req.tax.unwrap_or(0.0);

        let mut tx = self.db.begin().await?;

        // Lock each product row, check stock and price the line
        let mut lines: Vec<(Uuid, i32, f64, f64, i32)> = Vec::with_capacity(req.items.len());
        let mut subtotal_sum = 0.0;
        for item in &req.items {
            let product = sqlx::query(
                r#"
                SELECT id, name, price, cost_price, stock_quantity
                FROM products
                WHERE id = $1 AND business_id = $2 AND NOT is_deleted
                FOR UPDATE
                "#,
            )
            .bind(item.product_id)
            .bind(business_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))?;

            let name: String = product.get("name");
            let stock: i32 = product.get("stock_quantity");
            if stock < item.quantity {
                return Err(AppError::Conflict(format!(
                    "Insufficient stock for {}: {} available, {} requested",
                    name, stock, item.quantity
                )));
            }

            let unit_price = item.unit_price.unwrap_or_else(|| product.get("price"));
            if unit_price < 0.0 {
                return Err(AppError::BadRequest("unit_price must not be negative".to_string()));
            }
            let cost_price: f64 = product.get("cost_price");
            let line_subtotal = unit_price * item.quantity as f64;
            subtotal_sum += line_subtotal;

            lines.push((item.product_id, item.quantity, unit_price, cost_price, stock));
        }

        let total_amount = subtotal_sum - discount + tax;
        if total_amount < 0.0 {
            return Err(AppError::BadRequest("Discount exceeds sale total".to_string()));
        }

        let (amount_paid, status) = match req.payment_method.as_str() {
            "cash" | "card" => (total_amount, "paid"),
            _ => {
                // credit and mixed sales carry an upfront portion
                let upfront = req.amount_paid.unwrap_or(0.0);
                if upfront < 0.0 {
                    return Err(AppError::BadRequest("amount_paid must not be negative".to_string()));
                }
                if upfront > total_amount + AMOUNT_EPSILON {
                    return Err(AppError::BadRequest(
                        "amount_paid exceeds the sale total".to_string(),
                    ));
                }
                if upfront + AMOUNT_EPSILON >= total_amount {
                    (total_amount, "paid")
                } else {
                    (upfront, "unpaid")
                }
            }
        };

        if status == "unpaid" && req.customer_id.is_none() {
            return Err(AppError::BadRequest(
                "Credit sales require a customer".to_string(),
            ));
        }

        // A sale may only reference a customer of the same business
        if let Some(customer_id) = req.customer_id {
            sqlx::query_scalar::<_, Uuid>(
                "SELECT id FROM customers WHERE id = $1 AND business_id = $2 AND NOT is_deleted",
            )
            .bind(customer_id)
            .bind(business_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("Customer"))?;
        }

        let sale_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO sales
                (business_id, customer_id, user_id, total_amount, discount, tax,
                 payment_method, amount_paid, status, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(business_id)
        .bind(req.customer_id)
        .bind(user_id)
        .bind(total_amount)
        .bind(discount)
        .bind(tax)
        .bind(&req.payment_method)
        .bind(amount_paid)
        .bind(status)
        .bind(&req.notes)
        .fetch_one(&mut *tx)
        .await?;

        for (product_id, quantity, unit_price, cost_price, previous_stock) in &lines {
            sqlx::query(
                r#"
                INSERT INTO sale_items (sale_id, product_id, quantity, unit_price, cost_price, subtotal)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(sale_id)
            .bind(product_id)
            .bind(quantity)
            .bind(unit_price)
            .bind(cost_price)
            .bind(unit_price * *quantity as f64)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(product_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO inventory_transactions
                    (business_id, product_id, user_id, transaction_type,
                     quantity_change, previous_quantity, new_quantity, reference_id)
                VALUES ($1, $2, $3, 'sale', $4, $5, $6, $7)
                "#,
            )
            .bind(business_id)
            .bind(product_id)
            .bind(user_id)
            .bind(-quantity)
            .bind(previous_stock)
            .bind(previous_stock - quantity)
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(customer_id) = req.customer_id {
            let points = (total_amount / LOYALTY_POINTS_DIVISOR).floor() as i32;
            if points > 0 {
                sqlx::query(
                    r#"
                    UPDATE customers
                    SET loyalty_points = loyalty_points + $3, updated_at = NOW()
                    WHERE id = $1 AND business_id = $2 AND NOT is_deleted
                    "#,
                )
                .bind(customer_id)
                .bind(business_id)
                .bind(points)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        tracing::info!(%sale_id, total_amount, status, "Sale created");

        self.detail(sale_id, business_id)
            .await?
            .ok_or_else(|| AppError::Internal("Sale vanished after creation".to_string()))
    }

    /// Record a payment against a credit sale. The running paid total can
    /// never exceed the sale total; full settlement flips the sale to paid.
    pub async fn record_payment(
        &self,
        sale_id: Uuid,
        business_id: Uuid,
        user_id: Uuid,
        req: &SalePaymentRequest,
    ) -> Result<SaleDetail, AppError> {
        let mut tx = self.db.begin().await?;

        let sale = sqlx::query(
            r#"
            SELECT id, customer_id, total_amount, amount_paid, status
            FROM sales
            WHERE id = $1 AND business_id = $2
              AND parent_sale_id IS NULL AND NOT is_deleted
            FOR UPDATE
            "#,
        )
        .bind(sale_id)
        .bind(business_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Sale"))?;

        let status: String = sale.get("status");
        if status != "unpaid" {
            return Err(AppError::Conflict("Sale is not an open credit sale".to_string()));
        }

        let total_amount: f64 = sale.get("total_amount");
        let upfront: f64 = sale.get("amount_paid");
        let child_paid: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount_paid), 0) FROM sales WHERE parent_sale_id = $1 AND NOT is_deleted",
        )
        .bind(sale_id)
        .fetch_one(&mut *tx)
        .await?;

        let remaining = total_amount - upfront - child_paid;
        if req.amount > remaining + AMOUNT_EPSILON {
            return Err(AppError::BadRequest(format!(
                "Payment of {:.2} exceeds remaining balance of {:.2}",
                req.amount, remaining
            )));
        }

        let customer_id: Option<Uuid> = sale.get("customer_id");
        let method = req.payment_method.as_deref().unwrap_or("cash");

        sqlx::query(
            r#"
            INSERT INTO sales
                (business_id, customer_id, user_id, parent_sale_id,
                 total_amount, payment_method, amount_paid, status, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $5, 'paid', $7)
            "#,
        )
        .bind(business_id)
        .bind(customer_id)
        .bind(user_id)
        .bind(sale_id)
        .bind(req.amount)
        .bind(method)
        .bind(&req.notes)
        .execute(&mut *tx)
        .await?;

        let settled = req.amount + AMOUNT_EPSILON >= remaining;
        if settled {
            sqlx::query("UPDATE sales SET status = 'paid', updated_at = NOW() WHERE id = $1")
                .bind(sale_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(%sale_id, amount = req.amount, settled, "Credit payment recorded");

        self.detail(sale_id, business_id)
            .await?
            .ok_or_else(|| AppError::Internal("Sale vanished after payment".to_string()))
    }

    /// Refund a sale: mark it refunded and put the stock back
    pub async fn refund_sale(
        &self,
        sale_id: Uuid,
        business_id: Uuid,
        user_id: Uuid,
    ) -> Result<SaleDetail, AppError> {
        let mut tx = self.db.begin().await?;

        let status: String = sqlx::query_scalar(
            r#"
            SELECT status FROM sales
            WHERE id = $1 AND business_id = $2
              AND parent_sale_id IS NULL AND NOT is_deleted
            FOR UPDATE
            "#,
        )
        .bind(sale_id)
        .bind(business_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Sale"))?;

        if status == "refunded" {
            return Err(AppError::Conflict("Sale is already refunded".to_string()));
        }

        let items = sqlx::query(
            "SELECT product_id, quantity FROM sale_items WHERE sale_id = $1",
        )
        .bind(sale_id)
        .fetch_all(&mut *tx)
        .await?;

        for item in &items {
            let product_id: Uuid = item.get("product_id");
            let quantity: i32 = item.get("quantity");

            let previous: i32 = sqlx::query_scalar(
                "SELECT stock_quantity FROM products WHERE id = $1 FOR UPDATE",
            )
            .bind(product_id)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                "UPDATE products SET stock_quantity = stock_quantity + $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(product_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO inventory_transactions
                    (business_id, product_id, user_id, transaction_type,
                     quantity_change, previous_quantity, new_quantity, reference_id, notes)
                VALUES ($1, $2, $3, 'adjustment', $4, $5, $6, $7, 'refund')
                "#,
            )
            .bind(business_id)
            .bind(product_id)
            .bind(user_id)
            .bind(quantity)
            .bind(previous)
            .bind(previous + quantity)
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE sales SET status = 'refunded', updated_at = NOW() WHERE id = $1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(%sale_id, "Sale refunded");

        self.detail(sale_id, business_id)
            .await?
            .ok_or_else(|| AppError::Internal("Sale vanished after refund".to_string()))
    }

    pub async fn detail(
        &self,
        sale_id: Uuid,
        business_id: Uuid,
    ) -> Result<Option<SaleDetail>, AppError> {
        let Some(sale) = self.sales.find_by_id(sale_id, business_id).await? else {
            return Ok(None);
        };

        // Child payment rows are not standalone sales
        if sale.parent_sale_id.is_some() {
            return Ok(None);
        }

        let items = self.sales.items_for_sale(sale_id).await?;
        let payments = self.sales.payments_for_sale(sale_id).await?;
        let paid_amount = self.sales.paid_total(&sale).await?;
        let remaining_amount = (sale.total_amount - paid_amount).max(0.0);

        Ok(Some(SaleDetail {
            sale,
            items,
            payments,
            paid_amount,
            remaining_amount,
        }))
    }

    pub async fn report(
        &self,
        business_id: Uuid,
        query: &SaleReportQuery,
    ) -> Result<SaleReport, AppError> {
        let group_by = query.group_by.as_deref().unwrap_or("day");
        if !["day", "week", "month"].contains(&group_by) {
            return Err(AppError::BadRequest(format!(
                "Invalid group_by: {} (expected day, week or month)",
                group_by
            )));
        }

        let buckets = self
            .sales
            .report(business_id, query.start_date, query.end_date, group_by)
            .await?;
        let outstanding_credit = self.sales.outstanding_credit(business_id).await?;

        let total_revenue = buckets.iter().map(|b| b.revenue).sum();
        let total_cogs = buckets.iter().map(|b| b.cogs).sum();
        let total_profit = buckets.iter().map(|b| b.gross_profit).sum();

        Ok(SaleReport {
            buckets,
            total_revenue,
            total_cogs,
            total_profit,
            outstanding_credit,
        })
    }
}
