//! Subscription billing.
//! Monthly bills are generated per tenant, and a periodic sweep walks
//! businesses through active -> grace_period -> suspended as due dates
//! pass. Every transition is logged and surfaced to the tenant as a
//! suspension notice.

use crate::{
    config::AppConfig,
    error::AppError,
    models::billing::*,
    repository::{BillingRepository, BusinessRepository},
};
use chrono::{Datelike, NaiveDate, Utc};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use uuid::Uuid;

pub struct BillingService {
    db: PgPool,
    billing: BillingRepository,
    businesses: BusinessRepository,
    config: Arc<AppConfig>,
}

impl BillingService {
    pub fn new(db: PgPool, config: Arc<AppConfig>) -> Self {
        Self {
            billing: BillingRepository::new(db.clone()),
            businesses: BusinessRepository::new(db.clone()),
            db,
            config,
        }
    }

    /// First day of the month the date falls in
    fn month_start(date: NaiveDate) -> NaiveDate {
        NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
    }

    fn due_date_for(&self, billing_month: NaiveDate) -> NaiveDate {
        NaiveDate::from_ymd_opt(
            billing_month.year(),
            billing_month.month(),
            self.config.billing.bill_due_day,
        )
        .unwrap_or(billing_month)
    }

    /// Generate one bill for a business. Billing the same month twice is
    /// rejected as a conflict.
    pub async fn generate_bill(
        &self,
        business_id: Uuid,
        req: &GenerateBillRequest,
    ) -> Result<MonthlyBill, AppError> {
        let business = self
            .businesses
            .find_by_id(business_id)
            .await?
            .ok_or_else(|| AppError::not_found("Business"))?;

        let billing_month =
            Self::month_start(req.billing_month.unwrap_or_else(|| Utc::now().date_naive()));
        let due_date = self.due_date_for(billing_month);

        let bill = self
            .billing
            .insert_bill(business_id, billing_month, business.monthly_fee, due_date)
            .await?;

        self.businesses
            .update_due_date(business_id, Some(due_date), None)
            .await?;

        tracing::info!(%business_id, %billing_month, "Bill generated");

        Ok(bill)
    }

    /// Generate the current month's bill for every active business that
    /// does not have one yet. Returns the number of bills created.
    pub async fn generate_monthly_bills(&self) -> Result<u64, AppError> {
        let billing_month = Self::month_start(Utc::now().date_naive());
        let due_date = self.due_date_for(billing_month);

        let result = sqlx::query(
            r#"
            INSERT INTO monthly_bills (business_id, billing_month, base_fee, total_amount, due_date)
            SELECT b.id, $1, b.monthly_fee, b.monthly_fee, $2
            FROM businesses b
            WHERE NOT b.is_deleted
              AND b.payment_status <> 'suspended'
              AND b.monthly_fee > 0
            ON CONFLICT (business_id, billing_month) DO NOTHING
            "#,
        )
        .bind(billing_month)
        .bind(due_date)
        .execute(&self.db)
        .await?;

        tracing::info!(bills = result.rows_affected(), %billing_month, "Monthly bills generated");

        Ok(result.rows_affected())
    }

    /// Record a bill as paid and restore the business to active
    pub async fn pay_bill(
        &self,
        bill_id: Uuid,
        actor_id: Uuid,
    ) -> Result<MonthlyBill, AppError> {
        let bill = self
            .billing
            .mark_bill_paid(bill_id)
            .await?
            .ok_or_else(|| AppError::Conflict("Bill not found or already settled".to_string()))?;

        let business = self
            .businesses
            .find_by_id(bill.business_id)
            .await?
            .ok_or_else(|| AppError::not_found("Business"))?;

        let next_due = self.due_date_for(Self::month_start(
            bill.billing_month + chrono::Months::new(1),
        ));

        self.businesses
            .set_payment_status(business.id, "active", None)
            .await?;
        self.businesses
            .update_due_date(business.id, Some(next_due), None)
            .await?;

        if business.payment_status != "active" {
            self.billing
                .log_status_change(
                    business.id,
                    &business.payment_status,
                    "active",
                    Some("bill paid"),
                    "manual",
                    Some(actor_id),
                )
                .await?;

            if business.payment_status == "suspended" {
                self.billing
                    .send_suspension_notification(
                        business.id,
                        "reactivation_notice",
                        "Your subscription payment was received. Access has been restored.",
                    )
                    .await?;
            }
        }

        tracing::info!(%bill_id, business_id = %business.id, "Bill paid");

        Ok(bill)
    }

    pub async fn suspend(
        &self,
        business_id: Uuid,
        reason: Option<&str>,
        actor_id: Uuid,
    ) -> Result<(), AppError> {
        let business = self
            .businesses
            .find_by_id(business_id)
            .await?
            .ok_or_else(|| AppError::not_found("Business"))?;

        if business.payment_status == "suspended" {
            return Err(AppError::Conflict("Business is already suspended".to_string()));
        }

        self.businesses
            .set_payment_status(business_id, "suspended", reason)
            .await?;
        self.billing
            .log_status_change(
                business_id,
                &business.payment_status,
                "suspended",
                reason,
                "manual",
                Some(actor_id),
            )
            .await?;
        self.billing
            .send_suspension_notification(
                business_id,
                "suspension_notice",
                "Your account has been suspended. Contact support to restore access.",
            )
            .await?;

        tracing::warn!(%business_id, "Business suspended");

        Ok(())
    }

    pub async fn reactivate(&self, business_id: Uuid, actor_id: Uuid) -> Result<(), AppError> {
        let business = self
            .businesses
            .find_by_id(business_id)
            .await?
            .ok_or_else(|| AppError::not_found("Business"))?;

        if business.payment_status == "active" && business.is_active {
            return Err(AppError::Conflict("Business is already active".to_string()));
        }

        self.businesses
            .set_payment_status(business_id, "active", None)
            .await?;
        self.billing
            .log_status_change(
                business_id,
                &business.payment_status,
                "active",
                Some("manual reactivation"),
                "manual",
                Some(actor_id),
            )
            .await?;
        self.billing
            .send_suspension_notification(
                business_id,
                "reactivation_notice",
                "Your account has been reactivated.",
            )
            .await?;

        tracing::info!(%business_id, "Business reactivated");

        Ok(())
    }

    pub async fn update_due_date(
        &self,
        business_id: Uuid,
        req: &UpdateDueDateRequest,
    ) -> Result<(), AppError> {
        if let Some(days) = req.grace_period_days {
            if !(0..=90).contains(&days) {
                return Err(AppError::BadRequest(
                    "grace_period_days must be between 0 and 90".to_string(),
                ));
            }
        }

        let updated = self
            .businesses
            .update_due_date(business_id, req.next_payment_due_date, req.grace_period_days)
            .await?;
        if !updated {
            return Err(AppError::not_found("Business"));
        }

        Ok(())
    }

    /// Walk every tenant through the payment lifecycle: pending bills past
    /// their due date become overdue, overdue businesses enter the grace
    /// period, and businesses past their grace window are suspended.
    pub async fn run_payment_sweep(&self) -> Result<SweepOutcome, AppError> {
        let mut outcome = SweepOutcome {
            bills_marked_overdue: self.billing.mark_overdue_bills().await?,
            ..Default::default()
        };

        for business_id in self.billing.businesses_past_due().await? {
            let moved = sqlx::query(
                r#"
                UPDATE businesses
                SET payment_status = 'grace_period',
                    grace_period_end_date = next_payment_due_date + grace_period_days,
                    updated_at = NOW()
                WHERE id = $1 AND payment_status = 'active'
                "#,
            )
            .bind(business_id)
            .execute(&self.db)
            .await?;

            if moved.rows_affected() == 0 {
                continue;
            }

            self.billing
                .log_status_change(
                    business_id,
                    "active",
                    "grace_period",
                    Some("payment overdue"),
                    "automatic",
                    None,
                )
                .await?;

            let end: Option<NaiveDate> = sqlx::query(
                "SELECT grace_period_end_date FROM businesses WHERE id = $1",
            )
            .bind(business_id)
            .fetch_one(&self.db)
            .await?
            .get(0);

            let message = match end {
                Some(end) => format!(
                    "Subscription payment overdue. Access will be suspended after {}.",
                    end
                ),
                None => "Subscription payment overdue.".to_string(),
            };
            self.billing
                .send_suspension_notification(business_id, "warning", &message)
                .await?;

            outcome.businesses_moved_to_grace += 1;
        }

        for business_id in self.billing.businesses_past_grace().await? {
            self.businesses
                .set_payment_status(business_id, "suspended", Some("grace period expired"))
                .await?;
            self.billing
                .log_status_change(
                    business_id,
                    "grace_period",
                    "suspended",
                    Some("grace period expired"),
                    "automatic",
                    None,
                )
                .await?;
            self.billing
                .send_suspension_notification(
                    business_id,
                    "suspension_notice",
                    "Your account has been suspended for non-payment. Contact support to restore access.",
                )
                .await?;

            outcome.businesses_suspended += 1;
        }

        tracing::info!(
            bills_marked_overdue = outcome.bills_marked_overdue,
            moved_to_grace = outcome.businesses_moved_to_grace,
            suspended = outcome.businesses_suspended,
            "Payment sweep completed"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_start() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 17).unwrap();
        assert_eq!(
            BillingService::month_start(date),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
    }
}
