//! Business (tenant) domain models

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid regex"));

/// Six-digit hex color, e.g. #2563EB
pub fn is_valid_hex_color(color: &str) -> bool {
    HEX_COLOR_RE.is_match(color)
}

/// Tenant record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Business {
    pub id: Uuid,
    pub name: String,
    pub business_code: String,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
    pub owner_phone: Option<String>,
    pub address: Option<String>,

    pub subscription_plan: String,
    pub monthly_fee: f64,
    pub payment_status: String, // active, grace_period, suspended
    pub is_active: bool,

    pub last_payment_date: Option<NaiveDate>,
    pub next_payment_due_date: Option<NaiveDate>,
    pub grace_period_days: i32,
    pub grace_period_end_date: Option<NaiveDate>,
    pub suspension_date: Option<DateTime<Utc>>,
    pub suspension_reason: Option<String>,

    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Compact tenant view embedded in login/profile responses
#[derive(Debug, Serialize)]
pub struct BusinessSummary {
    pub id: Uuid,
    pub name: String,
    pub business_code: String,
    pub payment_status: String,
    pub subscription_plan: String,
}

impl From<&Business> for BusinessSummary {
    fn from(b: &Business) -> Self {
        Self {
            id: b.id,
            name: b.name.clone(),
            business_code: b.business_code.clone(),
            payment_status: b.payment_status.clone(),
            subscription_plan: b.subscription_plan.clone(),
        }
    }
}

/// Create business request (superadmin). Creates the tenant together with
/// its first admin account.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBusinessRequest {
    #[validate(length(min = 2, max = 128))]
    pub name: String,
    pub owner_name: Option<String>,
    #[validate(email)]
    pub owner_email: Option<String>,
    pub owner_phone: Option<String>,
    pub address: Option<String>,
    pub subscription_plan: Option<String>,
    pub monthly_fee: Option<f64>,
    pub admin_username: String,
    pub admin_password: String,
}

/// Update business settings (partial)
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBusinessRequest {
    #[validate(length(min = 2, max = 128))]
    pub name: Option<String>,
    pub owner_name: Option<String>,
    #[validate(email)]
    pub owner_email: Option<String>,
    pub owner_phone: Option<String>,
    pub address: Option<String>,
    pub subscription_plan: Option<String>,
    pub monthly_fee: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBusinessStatusRequest {
    pub is_active: bool,
    pub reason: Option<String>,
}

/// List filters for the superadmin business board
#[derive(Debug, Deserialize)]
pub struct BusinessListQuery {
    pub search: Option<String>,
    pub payment_status: Option<String>,
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

/// Tenant branding and locale settings, shown on receipts and the
/// storefront shell
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct BrandingSettings {
    pub primary_color: String,
    pub secondary_color: String,
    pub accent_color: String,
    pub theme: String, // light, dark
    pub branding_enabled: bool,
    pub tagline: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub social_media: serde_json::Value,
    pub business_hours: serde_json::Value,
    pub currency: String,
    pub timezone: String,
    pub language: String,
}

/// Update branding settings (partial)
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBrandingRequest {
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub accent_color: Option<String>,
    pub theme: Option<String>,
    pub branding_enabled: Option<bool>,
    #[validate(length(max = 256))]
    pub tagline: Option<String>,
    #[validate(email)]
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub social_media: Option<serde_json::Value>,
    pub business_hours: Option<serde_json::Value>,
    #[validate(length(min = 3, max = 3))]
    pub currency: Option<String>,
    pub timezone: Option<String>,
    #[validate(length(min = 2, max = 8))]
    pub language: Option<String>,
}

impl UpdateBrandingRequest {
    /// Colors the request wants to change, paired with their field names
    pub fn colors(&self) -> [(&'static str, Option<&str>); 3] {
        [
            ("primary_color", self.primary_color.as_deref()),
            ("secondary_color", self.secondary_color.as_deref()),
            ("accent_color", self.accent_color.as_deref()),
        ]
    }
}

/// Business row augmented with usage counts
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct BusinessOverview {
    pub id: Uuid,
    pub name: String,
    pub business_code: String,
    pub subscription_plan: String,
    pub monthly_fee: f64,
    pub payment_status: String,
    pub is_active: bool,
    pub next_payment_due_date: Option<NaiveDate>,
    pub active_users: i64,
    pub total_products: i64,
    pub created_at: DateTime<Utc>,
}

/// Per-business statistics
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct BusinessStatistics {
    pub total_users: i64,
    pub total_products: i64,
    pub total_customers: i64,
    pub total_sales: i64,
    pub total_revenue: f64,
    pub outstanding_credit: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color_validation() {
        assert!(is_valid_hex_color("#2563EB"));
        assert!(is_valid_hex_color("#ab12cd"));
        assert!(!is_valid_hex_color("2563EB"));
        assert!(!is_valid_hex_color("#25E"));
        assert!(!is_valid_hex_color("#25G3EBZ"));
        assert!(!is_valid_hex_color("blue"));
    }
}
