//! Sale domain models.
//! A credit sale starts with status `unpaid`; each payment against it is a
//! child row in `sales` referencing the original through `parent_sale_id`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Sale {
    pub id: Uuid,
    pub business_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub user_id: Uuid,
    pub parent_sale_id: Option<Uuid>,
    pub total_amount: f64,
    pub discount: f64,
    pub tax: f64,
    pub payment_method: String, // cash, card, credit, mixed
    pub amount_paid: f64,
    pub status: String, // paid, unpaid, refunded
    pub notes: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sale line as submitted by the client
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SaleItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Overrides the catalogue price when present (e.g. negotiated price)
    pub unit_price: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSaleRequest {
    pub customer_id: Option<Uuid>,
    #[validate(nested, length(min = 1))]
    pub items: Vec<SaleItemRequest>,
    #[validate(range(min = 0.0))]
    pub discount: Option<f64>,
    #[validate(range(min = 0.0))]
    pub tax: Option<f64>,
    pub payment_method: String,
    /// Upfront portion; required for mixed payments
    pub amount_paid: Option<f64>,
    pub notes: Option<String>,
}

/// Record a payment against a credit sale
#[derive(Debug, Deserialize, Validate)]
pub struct SalePaymentRequest {
    #[validate(range(min = 0.01))]
    pub amount: f64,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

/// Sale list row joined with names
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SaleListRow {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub cashier_name: String,
    pub total_amount: f64,
    pub discount: f64,
    pub tax: f64,
    pub payment_method: String,
    pub amount_paid: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Full sale detail with its items and payment ledger
#[derive(Debug, Serialize)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItemDetail>,
    pub payments: Vec<SalePayment>,
    pub paid_amount: f64,
    pub remaining_amount: f64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SaleItemDetail {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub subtotal: f64,
}

/// A child payment row, shaped for responses
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SalePayment {
    pub id: Uuid,
    pub amount_paid: f64,
    pub payment_method: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SaleListQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
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
    50
}

/// Report grouping granularity
#[derive(Debug, Deserialize)]
pub struct SaleReportQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// day, week or month
    pub group_by: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SaleReportBucket {
    pub period: String,
    pub sale_count: i64,
    pub revenue: f64,
    pub cogs: f64,
    pub gross_profit: f64,
}

#[derive(Debug, Serialize)]
pub struct SaleReport {
    pub buckets: Vec<SaleReportBucket>,
    pub total_revenue: f64,
    pub total_cogs: f64,
    pub total_profit: f64,
    pub outstanding_credit: f64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TopProductRow {
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub total_quantity: i64,
    pub total_revenue: f64,
}

/// An open credit sale with its running balance
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CreditSaleRow {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub total_amount: f64,
    pub paid_amount: f64,
    pub remaining_amount: f64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_sale_request_rejects_empty_items() {
        let req = CreateSaleRequest {
            customer_id: None,
            items: vec![],
            discount: None,
            tax: None,
            payment_method: "cash".to_string(),
            amount_paid: None,
            notes: None,
        };
        assert!(req.validate().is_err());

        let req = CreateSaleRequest {
            items: vec![SaleItemRequest {
                product_id: Uuid::new_v4(),
                quantity: 2,
                unit_price: None,
            }],
            ..req
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_sale_item_request_rejects_zero_quantity() {
        let item = SaleItemRequest {
            product_id: Uuid::new_v4(),
            quantity: 0,
            unit_price: None,
        };
        assert!(item.validate().is_err());
    }
}
