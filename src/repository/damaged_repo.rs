//! Damaged product repository

use crate::{error::AppError, models::damaged::*};
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct DamagedRepository {
    db: PgPool,
}

impl DamagedRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn find_by_id(
        &self,
        id: Uuid,
        business_id: Uuid,
    ) -> Result<Option<DamagedProduct>, AppError> {
        let damaged = sqlx::query_as::<_, DamagedProduct>(
            "SELECT * FROM damaged_products WHERE id = $1 AND business_id = $2 AND NOT is_deleted",
        )
        .bind(id)
        .bind(business_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(damaged)
    }

    pub async fn list(
        &self,
        business_id: Uuid,
        query: &DamageListQuery,
    ) -> Result<Vec<DamagedProductRow>, AppError> {
        let rows = sqlx::query_as::<_, DamagedProductRow>(
            r#"
            SELECT
                d.id, d.product_id, p.name AS product_name, p.sku,
                u.username AS reported_by,
                d.quantity, d.reason, d.estimated_loss, d.status, d.created_at
            FROM damaged_products d
            JOIN products p ON p.id = d.product_id
            JOIN users u ON u.id = d.user_id
            WHERE d.business_id = $1 AND NOT d.is_deleted
              AND ($2::date IS NULL OR d.created_at >= $2::date)
              AND ($3::date IS NULL OR d.created_at < $3::date + INTERVAL '1 day')
              AND ($4::text IS NULL OR d.status = $4)
            ORDER BY d.created_at DESC
            "#,
        )
        .bind(business_id)
        .bind(query.start_date)
        .bind(query.end_date)
        .bind(&query.status)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    pub async fn summary(&self, business_id: Uuid) -> Result<DamageSummary, AppError> {
        let totals = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_incidents,
                COALESCE(SUM(quantity), 0)::bigint AS total_quantity,
                COALESCE(SUM(estimated_loss), 0) AS total_loss
            FROM damaged_products
            WHERE business_id = $1 AND NOT is_deleted
            "#,
        )
        .bind(business_id)
        .fetch_one(&self.db)
        .await?;

        let by_product = sqlx::query_as::<_, DamageBreakdownRow>(
            r#"
            SELECT
                p.name AS label,
                COUNT(*) AS incident_count,
                COALESCE(SUM(d.quantity), 0)::bigint AS total_quantity,
                COALESCE(SUM(d.estimated_loss), 0) AS total_loss
            FROM damaged_products d
            JOIN products p ON p.id = d.product_id
            WHERE d.business_id = $1 AND NOT d.is_deleted
            GROUP BY p.name
            ORDER BY total_loss DESC
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.db)
        .await?;

        let by_reason = sqlx::query_as::<_, DamageBreakdownRow>(
            r#"
            SELECT
                d.reason AS label,
                COUNT(*) AS incident_count,
                COALESCE(SUM(d.quantity), 0)::bigint AS total_quantity,
                COALESCE(SUM(d.estimated_loss), 0) AS total_loss
            FROM damaged_products d
            WHERE d.business_id = $1 AND NOT d.is_deleted
            GROUP BY d.reason
            ORDER BY total_loss DESC
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.db)
        .await?;

        Ok(DamageSummary {
            total_incidents: totals.get("total_incidents"),
            total_quantity: totals.get("total_quantity"),
            total_estimated_loss: totals.get("total_loss"),
            by_product,
            by_reason,
        })
    }
}
