//! Subscription billing domain models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MonthlyBill {
    pub id: Uuid,
    pub business_id: Uuid,
    /// First day of the month the bill covers
    pub billing_month: NaiveDate,
    pub base_fee: f64,
    pub total_amount: f64,
    pub due_date: NaiveDate,
    pub status: String, // pending, paid, overdue, waived
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentStatusLogEntry {
    pub id: Uuid,
    pub business_id: Uuid,
    pub status_from: String,
    pub status_to: String,
    pub reason: Option<String>,
    pub triggered_by: String, // manual, automatic
    pub triggered_by_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SuspensionNotification {
    pub id: Uuid,
    pub business_id: Uuid,
    pub notification_type: String, // warning, suspension_notice, reactivation_notice
    pub message: String,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SuspendRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDueDateRequest {
    pub next_payment_due_date: Option<NaiveDate>,
    pub grace_period_days: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateBillRequest {
    /// Month to bill, defaults to the current month
    pub billing_month: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentStatusQuery {
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

/// Payment status board row
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct BusinessPaymentRow {
    pub id: Uuid,
    pub name: String,
    pub business_code: String,
    pub payment_status: String,
    pub is_active: bool,
    pub subscription_plan: String,
    pub monthly_fee: f64,
    pub last_payment_date: Option<NaiveDate>,
    pub next_payment_due_date: Option<NaiveDate>,
    pub grace_period_end_date: Option<NaiveDate>,
    pub active_users: i64,
    pub total_products: i64,
    pub overdue_bills_count: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct StatusCountRow {
    pub payment_status: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct PaymentSummary {
    pub status_counts: Vec<StatusCountRow>,
    pub overdue_businesses: i64,
    pub suspended_businesses: i64,
    pub total_monthly_revenue: f64,
    pub active_businesses: i64,
}

/// Outcome of one payment status sweep
#[derive(Debug, Default, Serialize)]
pub struct SweepOutcome {
    pub bills_marked_overdue: u64,
    pub businesses_moved_to_grace: u64,
    pub businesses_suspended: u64,
}
