//! Inventory domain models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Manual stock adjustment
#[derive(Debug, Deserialize, Validate)]
pub struct StockAdjustRequest {
    /// Positive to add, negative to subtract
    pub quantity_change: i32,
    #[validate(length(min = 1, max = 512))]
    pub reason: String,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct StockStatusRow {
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub category_name: Option<String>,
    pub stock_quantity: i32,
    pub min_stock_level: i32,
    pub cost_price: f64,
    pub stock_value: f64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TransactionRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub username: String,
    pub transaction_type: String,
    pub quantity_change: i32,
    pub previous_quantity: i32,
    pub new_quantity: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionListQuery {
    pub product_id: Option<Uuid>,
    pub transaction_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    50
}

/// Period movement totals plus current valuation
#[derive(Debug, Serialize)]
pub struct InventoryValueReport {
    pub total_stock_value: f64,
    pub total_units: i64,
    pub product_count: i64,
    pub units_in: i64,
    pub units_out: i64,
}
