//! Audit log repository

use crate::{error::AppError, models::audit::*};
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct AuditRepository {
    db: PgPool,
}

impl AuditRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn insert(
        &self,
        user_id: Option<Uuid>,
        business_id: Option<Uuid>,
        action: &str,
        resource_type: &str,
        resource_id: Option<Uuid>,
        details: Option<serde_json::Value>,
        ip_address: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs
                (user_id, business_id, action, resource_type, resource_id, details, ip_address)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user_id)
        .bind(business_id)
        .bind(action)
        .bind(resource_type)
        .bind(resource_id)
        .bind(details)
        .bind(ip_address)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    pub async fn list(&self, query: &AuditLogQuery) -> Result<(Vec<AuditLog>, i64), AppError> {
        let offset = (query.page.max(1) - 1) * query.limit;
        let action = query.action.as_ref().map(|a| format!("{}%", a));

        let rows = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT * FROM audit_logs
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::uuid IS NULL OR business_id = $2)
              AND ($3::text IS NULL OR action LIKE $3)
              AND ($4::text IS NULL OR resource_type = $4)
              AND ($5::date IS NULL OR created_at >= $5::date)
              AND ($6::date IS NULL OR created_at < $6::date + INTERVAL '1 day')
            ORDER BY created_at DESC
            LIMIT $7 OFFSET $8
            "#,
        )
        .bind(query.user_id)
        .bind(query.business_id)
        .bind(&action)
        .bind(&query.resource_type)
        .bind(query.start_date)
        .bind(query.end_date)
        .bind(query.limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) FROM audit_logs
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::uuid IS NULL OR business_id = $2)
              AND ($3::text IS NULL OR action LIKE $3)
              AND ($4::text IS NULL OR resource_type = $4)
              AND ($5::date IS NULL OR created_at >= $5::date)
              AND ($6::date IS NULL OR created_at < $6::date + INTERVAL '1 day')
            "#,
        )
        .bind(query.user_id)
        .bind(query.business_id)
        .bind(&action)
        .bind(&query.resource_type)
        .bind(query.start_date)
        .bind(query.end_date)
        .fetch_one(&self.db)
        .await?
        .get(0);

        Ok((rows, total))
    }

    pub async fn action_counts(&self, limit: i64) -> Result<Vec<AuditActionCount>, AppError> {
        let counts = sqlx::query_as::<_, AuditActionCount>(
            r#"
            SELECT action, COUNT(*) AS count
            FROM audit_logs
            GROUP BY action
            ORDER BY count DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(counts)
    }
}
