//! Platform administration: superadmin dashboard, revenue analytics,
//! soft-delete recovery and application settings.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct PlatformDashboard {
    pub businesses_total: i64,
    pub businesses_active: i64,
    pub businesses_grace_period: i64,
    pub businesses_suspended: i64,
    pub total_users: i64,
    pub sales_last_30_days: i64,
    pub sales_revenue_last_30_days: f64,
    pub billing_revenue_collected: f64,
    pub pending_bills: i64,
    pub overdue_bills: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RevenueTrendRow {
    pub billing_month: chrono::NaiveDate,
    pub billed: f64,
    pub collected: f64,
    pub bill_count: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TopBusinessRow {
    pub id: Uuid,
    pub name: String,
    pub business_code: String,
    pub sale_count: i64,
    pub revenue: f64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SalesTrendRow {
    pub month: chrono::NaiveDate,
    pub sale_count: i64,
    pub revenue: f64,
}

#[derive(Debug, Serialize)]
pub struct SalesAnalytics {
    pub trend: Vec<SalesTrendRow>,
    pub ranking: Vec<TopBusinessRow>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SignupRow {
    pub month: chrono::NaiveDate,
    pub businesses: i64,
    pub users: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RoleCountRow {
    pub role: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct UserAnalytics {
    pub total_users: i64,
    pub active_users: i64,
    pub role_distribution: Vec<RoleCountRow>,
    pub signups: Vec<SignupRow>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TopProductRow {
    pub product_id: Uuid,
    pub name: String,
    pub business_name: String,
    pub units_sold: i64,
    pub revenue: f64,
}

#[derive(Debug, Serialize)]
pub struct ProductAnalytics {
    pub total_products: i64,
    pub low_stock_products: i64,
    pub out_of_stock_products: i64,
    pub top_selling: Vec<TopProductRow>,
}

/// A soft-deleted row eligible for recovery
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DeletedRecordRow {
    pub id: Uuid,
    pub label: String,
    pub business_id: Option<Uuid>,
    pub deleted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AppSetting {
    pub key: String,
    pub value: String,
    pub updated_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

/// Resources the recovery endpoints can operate on, mapped to their
/// table and label column.
fn recovery_target(resource: &str) -> Option<(&'static str, &'static str)> {
    match resource {
        "product" => Some(("products", "name")),
        "category" => Some(("categories", "name")),
        "customer" => Some(("customers", "name")),
        "user" => Some(("users", "username")),
        _ => None,
    }
}

pub struct AnalyticsService {
    db: PgPool,
}

impl AnalyticsService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn platform_dashboard(&self) -> Result<PlatformDashboard, AppError> {
        let businesses = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE payment_status = 'active') AS active,
                COUNT(*) FILTER (WHERE payment_status = 'grace_period') AS grace,
                COUNT(*) FILTER (WHERE payment_status = 'suspended') AS suspended
            FROM businesses
            WHERE NOT is_deleted
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        let total_users: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE NOT is_deleted")
                .fetch_one(&self.db)
                .await?;

        let sales = sqlx::query(
            r#"
            SELECT COUNT(*) AS sale_count, COALESCE(SUM(total_amount), 0) AS revenue
            FROM sales
            WHERE parent_sale_id IS NULL AND NOT is_deleted
              AND status <> 'refunded'
              AND created_at > NOW() - INTERVAL '30 days'
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        let bills = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(total_amount) FILTER (WHERE status = 'paid'), 0) AS collected,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'overdue') AS overdue
            FROM monthly_bills
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        Ok(PlatformDashboard {
            businesses_total: businesses.get("total"),
            businesses_active: businesses.get("active"),
            businesses_grace_period: businesses.get("grace"),
            businesses_suspended: businesses.get("suspended"),
            total_users,
            sales_last_30_days: sales.get("sale_count"),
            sales_revenue_last_30_days: sales.get("revenue"),
            billing_revenue_collected: bills.get("collected"),
            pending_bills: bills.get("pending"),
            overdue_bills: bills.get("overdue"),
        })
    }

    /// Billed vs collected subscription revenue per month
    pub async fn revenue_trend(&self, months: i64) -> Result<Vec<RevenueTrendRow>, AppError> {
        let months = months.clamp(1, 36);

        let rows = sqlx::query_as::<_, RevenueTrendRow>(
            r#"
            SELECT
                billing_month,
                COALESCE(SUM(total_amount), 0) AS billed,
                COALESCE(SUM(total_amount) FILTER (WHERE status = 'paid'), 0) AS collected,
                COUNT(*) AS bill_count
            FROM monthly_bills
            WHERE billing_month > CURRENT_DATE - ($1 || ' months')::interval
            GROUP BY billing_month
            ORDER BY billing_month
            "#,
        )
        .bind(months.to_string())
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Busiest tenants over the last 30 days
    pub async fn top_businesses(&self, limit: i64) -> Result<Vec<TopBusinessRow>, AppError> {
        let rows = sqlx::query_as::<_, TopBusinessRow>(
            r#"
            SELECT
                b.id, b.name, b.business_code,
                COUNT(s.id) AS sale_count,
                COALESCE(SUM(s.total_amount), 0) AS revenue
            FROM businesses b
            LEFT JOIN sales s ON s.business_id = b.id
                AND s.parent_sale_id IS NULL AND NOT s.is_deleted
                AND s.status <> 'refunded'
                AND s.created_at > NOW() - INTERVAL '30 days'
            WHERE NOT b.is_deleted
            GROUP BY b.id
            ORDER BY revenue DESC
            LIMIT $1
            "#,
        )
        .bind(limit.clamp(1, 100))
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Cross-tenant sale volume per month plus a per-business ranking
    /// over the same window
    pub async fn sales_analytics(&self, months: i64) -> Result<SalesAnalytics, AppError> {
        let months = months.clamp(1, 36);

        let trend = sqlx::query_as::<_, SalesTrendRow>(
            r#"
            SELECT
                date_trunc('month', created_at)::date AS month,
                COUNT(*) AS sale_count,
                COALESCE(SUM(total_amount), 0) AS revenue
            FROM sales
            WHERE parent_sale_id IS NULL AND NOT is_deleted
              AND status <> 'refunded'
              AND created_at > CURRENT_DATE - ($1 || ' months')::interval
            GROUP BY month
            ORDER BY month
            "#,
        )
        .bind(months.to_string())
        .fetch_all(&self.db)
        .await?;

        let ranking = sqlx::query_as::<_, TopBusinessRow>(
            r#"
            SELECT
                b.id, b.name, b.business_code,
                COUNT(s.id) AS sale_count,
                COALESCE(SUM(s.total_amount), 0) AS revenue
            FROM businesses b
            LEFT JOIN sales s ON s.business_id = b.id
                AND s.parent_sale_id IS NULL AND NOT s.is_deleted
                AND s.status <> 'refunded'
                AND s.created_at > CURRENT_DATE - ($1 || ' months')::interval
            WHERE NOT b.is_deleted
            GROUP BY b.id
            ORDER BY revenue DESC
            LIMIT 20
            "#,
        )
        .bind(months.to_string())
        .fetch_all(&self.db)
        .await?;

        Ok(SalesAnalytics { trend, ranking })
    }

    pub async fn user_analytics(&self) -> Result<UserAnalytics, AppError> {
        let totals = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'active') AS active
            FROM users
            WHERE NOT is_deleted
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        let role_distribution = sqlx::query_as::<_, RoleCountRow>(
            r#"
            SELECT role, COUNT(*) AS count
            FROM users
            WHERE NOT is_deleted
            GROUP BY role
            ORDER BY count DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let signups = sqlx::query_as::<_, SignupRow>(
            r#"
            SELECT
                m.month,
                COALESCE(b.count, 0) AS businesses,
                COALESCE(u.count, 0) AS users
            FROM (
                SELECT date_trunc('month', created_at)::date AS month
                FROM users WHERE NOT is_deleted
                UNION
                SELECT date_trunc('month', created_at)::date
                FROM businesses WHERE NOT is_deleted
            ) m
            LEFT JOIN (
                SELECT date_trunc('month', created_at)::date AS month, COUNT(*) AS count
                FROM businesses WHERE NOT is_deleted GROUP BY 1
            ) b ON b.month = m.month
            LEFT JOIN (
                SELECT date_trunc('month', created_at)::date AS month, COUNT(*) AS count
                FROM users WHERE NOT is_deleted GROUP BY 1
            ) u ON u.month = m.month
            WHERE m.month > CURRENT_DATE - INTERVAL '12 months'
            ORDER BY m.month
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(UserAnalytics {
            total_users: totals.get("total"),
            active_users: totals.get("active"),
            role_distribution,
            signups,
        })
    }

    pub async fn product_analytics(&self) -> Result<ProductAnalytics, AppError> {
        let counts = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE stock_quantity <= min_stock_level) AS low_stock,
                COUNT(*) FILTER (WHERE stock_quantity = 0) AS out_of_stock
            FROM products
            WHERE NOT is_deleted
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        let top_selling = sqlx::query_as::<_, TopProductRow>(
            r#"
            SELECT
                p.id AS product_id, p.name, b.name AS business_name,
                COALESCE(SUM(si.quantity), 0) AS units_sold,
                COALESCE(SUM(si.subtotal), 0) AS revenue
            FROM products p
            JOIN businesses b ON b.id = p.business_id
            JOIN sale_items si ON si.product_id = p.id
            JOIN sales s ON s.id = si.sale_id
                AND NOT s.is_deleted AND s.status <> 'refunded'
                AND s.created_at > NOW() - INTERVAL '30 days'
            WHERE NOT p.is_deleted
            GROUP BY p.id, b.name
            ORDER BY units_sold DESC
            LIMIT 20
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(ProductAnalytics {
            total_products: counts.get("total"),
            low_stock_products: counts.get("low_stock"),
            out_of_stock_products: counts.get("out_of_stock"),
            top_selling,
        })
    }

    pub async fn deleted_records(
        &self,
        resource: &str,
        business_id: Option<Uuid>,
    ) -> Result<Vec<DeletedRecordRow>, AppError> {
        let (table, label) = recovery_target(resource)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown resource: {}", resource)))?;

        let rows = sqlx::query_as::<_, DeletedRecordRow>(&format!(
            r#"
            SELECT id, {label} AS label, business_id, updated_at AS deleted_at
            FROM {table}
            WHERE is_deleted
              AND ($1::uuid IS NULL OR business_id = $1)
            ORDER BY updated_at DESC
            LIMIT 200
            "#,
            table = table,
            label = label,
        ))
        .bind(business_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    pub async fn restore_record(&self, resource: &str, id: Uuid) -> Result<bool, AppError> {
        let (table, _) = recovery_target(resource)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown resource: {}", resource)))?;

        let result = sqlx::query(&format!(
            "UPDATE {} SET is_deleted = FALSE, updated_at = NOW() WHERE id = $1 AND is_deleted",
            table
        ))
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Permanently remove a soft-deleted row. Referential integrity may
    /// still reject the delete if live rows point at it.
    pub async fn purge_record(&self, resource: &str, id: Uuid) -> Result<bool, AppError> {
        let (table, _) = recovery_target(resource)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown resource: {}", resource)))?;

        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1 AND is_deleted", table))
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                    AppError::Conflict(
                        "Record is still referenced and cannot be permanently deleted".to_string(),
                    )
                }
                _ => AppError::Database(e),
            })?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn settings(&self) -> Result<Vec<AppSetting>, AppError> {
        let settings =
            sqlx::query_as::<_, AppSetting>("SELECT * FROM app_settings ORDER BY key")
                .fetch_all(&self.db)
                .await?;

        Ok(settings)
    }

    pub async fn update_setting(
        &self,
        key: &str,
        value: &str,
        updated_by: Uuid,
    ) -> Result<AppSetting, AppError> {
        let setting = sqlx::query_as::<_, AppSetting>(
            r#"
            INSERT INTO app_settings (key, value, updated_by, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (key) DO UPDATE
                SET value = EXCLUDED.value,
                    updated_by = EXCLUDED.updated_by,
                    updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(updated_by)
        .fetch_one(&self.db)
        .await?;

        Ok(setting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovery_targets() {
        assert_eq!(recovery_target("product"), Some(("products", "name")));
        assert_eq!(recovery_target("user"), Some(("users", "username")));
        assert_eq!(recovery_target("sale"), None);
        assert_eq!(recovery_target("'; DROP TABLE users; --"), None);
    }
}
