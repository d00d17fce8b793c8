//! Subscription billing repository.
//! Monthly bills, payment status history and suspension notices for
//! tenant businesses. State transitions that touch several tables run
//! in the billing service inside a transaction.

use crate::{error::AppError, models::billing::*};
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct BillingRepository {
    db: PgPool,
}

impl BillingRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// One bill per business per month; a second insert for the same
    /// month is a conflict.
    pub async fn insert_bill(
        &self,
        business_id: Uuid,
        billing_month: NaiveDate,
        base_fee: f64,
        due_date: NaiveDate,
    ) -> Result<MonthlyBill, AppError> {
        let bill = sqlx::query_as::<_, MonthlyBill>(
            r#"
            INSERT INTO monthly_bills (business_id, billing_month, base_fee, total_amount, due_date)
            VALUES ($1, $2, $3, $3, $4)
            RETURNING *
            "#,
        )
        .bind(business_id)
        .bind(billing_month)
        .bind(base_fee)
        .bind(due_date)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("A bill already exists for this month".to_string())
            }
            _ => AppError::Database(e),
        })?;

        Ok(bill)
    }

    pub async fn bills_for_business(
        &self,
        business_id: Uuid,
    ) -> Result<Vec<MonthlyBill>, AppError> {
        let bills = sqlx::query_as::<_, MonthlyBill>(
            "SELECT * FROM monthly_bills WHERE business_id = $1 ORDER BY billing_month DESC",
        )
        .bind(business_id)
        .fetch_all(&self.db)
        .await?;

        Ok(bills)
    }

    pub async fn mark_bill_paid(&self, bill_id: Uuid) -> Result<Option<MonthlyBill>, AppError> {
        let bill = sqlx::query_as::<_, MonthlyBill>(
            r#"
            UPDATE monthly_bills
            SET status = 'paid', paid_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'overdue')
            RETURNING *
            "#,
        )
        .bind(bill_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(bill)
    }

    pub async fn mark_overdue_bills(&self) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE monthly_bills
            SET status = 'overdue'
            WHERE status = 'pending' AND due_date < CURRENT_DATE
            "#,
        )
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn log_status_change(
        &self,
        business_id: Uuid,
        status_from: &str,
        status_to: &str,
        reason: Option<&str>,
        triggered_by: &str,
        triggered_by_user_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO business_payment_status_log
                (business_id, status_from, status_to, reason, triggered_by, triggered_by_user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(business_id)
        .bind(status_from)
        .bind(status_to)
        .bind(reason)
        .bind(triggered_by)
        .bind(triggered_by_user_id)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    pub async fn status_history(
        &self,
        business_id: Uuid,
    ) -> Result<Vec<PaymentStatusLogEntry>, AppError> {
        let entries = sqlx::query_as::<_, PaymentStatusLogEntry>(
            r#"
            SELECT * FROM business_payment_status_log
            WHERE business_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }

    pub async fn send_suspension_notification(
        &self,
        business_id: Uuid,
        notification_type: &str,
        message: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO business_suspension_notifications (business_id, notification_type, message)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(business_id)
        .bind(notification_type)
        .bind(message)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    pub async fn suspension_notifications(
        &self,
        business_id: Uuid,
    ) -> Result<Vec<SuspensionNotification>, AppError> {
        let notices = sqlx::query_as::<_, SuspensionNotification>(
            r#"
            SELECT * FROM business_suspension_notifications
            WHERE business_id = $1
            ORDER BY sent_at DESC
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.db)
        .await?;

        Ok(notices)
    }

    pub async fn mark_suspension_notification_read(
        &self,
        id: Uuid,
        business_id: Uuid,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE business_suspension_notifications
            SET is_read = TRUE, read_at = NOW()
            WHERE id = $1 AND business_id = $2 AND NOT is_read
            "#,
        )
        .bind(id)
        .bind(business_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Payment status board across all tenants
    pub async fn payment_overview(
        &self,
        query: &PaymentStatusQuery,
    ) -> Result<(Vec<BusinessPaymentRow>, i64), AppError> {
        let offset = (query.page.max(1) - 1) * query.limit;

        let rows = sqlx::query_as::<_, BusinessPaymentRow>(
            r#"
            SELECT
                b.id, b.name, b.business_code, b.payment_status, b.is_active,
                b.subscription_plan, b.monthly_fee,
                b.last_payment_date, b.next_payment_due_date, b.grace_period_end_date,
                COUNT(u.id) FILTER (WHERE u.status = 'active' AND NOT u.is_deleted) AS active_users,
                (SELECT COUNT(*) FROM products p
                 WHERE p.business_id = b.id AND NOT p.is_deleted) AS total_products,
                (SELECT COUNT(*) FROM monthly_bills mb
                 WHERE mb.business_id = b.id AND mb.status = 'overdue') AS overdue_bills_count
            FROM businesses b
            LEFT JOIN users u ON u.business_id = b.id
            WHERE NOT b.is_deleted
              AND ($1::text IS NULL OR b.payment_status = $1)
            GROUP BY b.id
            ORDER BY b.next_payment_due_date NULLS LAST, b.name
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&query.status)
        .bind(query.limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) FROM businesses b
            WHERE NOT b.is_deleted
              AND ($1::text IS NULL OR b.payment_status = $1)
            "#,
        )
        .bind(&query.status)
        .fetch_one(&self.db)
        .await?
        .get(0);

        Ok((rows, total))
    }

    pub async fn payment_summary(&self) -> Result<PaymentSummary, AppError> {
        let status_counts = sqlx::query_as::<_, StatusCountRow>(
            r#"
            SELECT payment_status, COUNT(*) AS count
            FROM businesses
            WHERE NOT is_deleted
            GROUP BY payment_status
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let totals = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE payment_status = 'suspended') AS suspended,
                COUNT(*) FILTER (WHERE payment_status = 'active' AND is_active) AS active,
                COALESCE(SUM(monthly_fee) FILTER (WHERE payment_status <> 'suspended'), 0)
                    AS monthly_revenue
            FROM businesses
            WHERE NOT is_deleted
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        let overdue: i64 = sqlx::query(
            r#"
            SELECT COUNT(DISTINCT business_id) FROM monthly_bills WHERE status = 'overdue'
            "#,
        )
        .fetch_one(&self.db)
        .await?
        .get(0);

        Ok(PaymentSummary {
            status_counts,
            overdue_businesses: overdue,
            suspended_businesses: totals.get("suspended"),
            total_monthly_revenue: totals.get("monthly_revenue"),
            active_businesses: totals.get("active"),
        })
    }

    /// Businesses whose due date has passed while still marked active
    pub async fn businesses_past_due(&self) -> Result<Vec<Uuid>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT id FROM businesses
            WHERE NOT is_deleted
              AND payment_status = 'active'
              AND next_payment_due_date IS NOT NULL
              AND next_payment_due_date < CURRENT_DATE
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.iter().map(|r| r.get(0)).collect())
    }

    /// Businesses in grace period whose grace window has ended
    pub async fn businesses_past_grace(&self) -> Result<Vec<Uuid>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT id FROM businesses
            WHERE NOT is_deleted
              AND payment_status = 'grace_period'
              AND grace_period_end_date IS NOT NULL
              AND grace_period_end_date < CURRENT_DATE
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.iter().map(|r| r.get(0)).collect())
    }
}
