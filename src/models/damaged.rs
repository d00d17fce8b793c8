//! Damaged product domain models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DamagedProduct {
    pub id: Uuid,
    pub business_id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub quantity: i32,
    pub reason: String,
    pub estimated_loss: f64,
    pub status: String, // reported, written_off, recovered
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReportDamageRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(length(min = 1, max = 512))]
    pub reason: String,
    /// Defaults to cost_price * quantity when absent
    pub estimated_loss: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDamageRequest {
    #[validate(range(min = 1))]
    pub quantity: Option<i32>,
    pub reason: Option<String>,
    pub estimated_loss: Option<f64>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DamagedProductRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub reported_by: String,
    pub quantity: i32,
    pub reason: String,
    pub estimated_loss: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct DamageListQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DamageBreakdownRow {
    pub label: String,
    pub incident_count: i64,
    pub total_quantity: i64,
    pub total_loss: f64,
}

#[derive(Debug, Serialize)]
pub struct DamageSummary {
    pub total_incidents: i64,
    pub total_quantity: i64,
    pub total_estimated_loss: f64,
    pub by_product: Vec<DamageBreakdownRow>,
    pub by_reason: Vec<DamageBreakdownRow>,
}
