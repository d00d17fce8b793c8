//! Category repository

use crate::{error::AppError, models::category::*};
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct CategoryRepository {
    db: PgPool,
}

impl CategoryRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, business_id: Uuid) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE business_id = $1 AND NOT is_deleted ORDER BY name",
        )
        .bind(business_id)
        .fetch_all(&self.db)
        .await?;

        Ok(categories)
    }

    pub async fn find_by_id(
        &self,
        id: Uuid,
        business_id: Uuid,
    ) -> Result<Option<Category>, AppError> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE id = $1 AND business_id = $2 AND NOT is_deleted",
        )
        .bind(id)
        .bind(business_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(category)
    }

    pub async fn create(
        &self,
        business_id: Uuid,
        req: &CreateCategoryRequest,
    ) -> Result<Category, AppError> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (business_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(business_id)
        .bind(&req.name)
        .bind(&req.description)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("A category with this name already exists".to_string())
            }
            _ => AppError::Database(e),
        })?;

        Ok(category)
    }

    pub async fn update(
        &self,
        id: Uuid,
        business_id: Uuid,
        req: &UpdateCategoryRequest,
    ) -> Result<Option<Category>, AppError> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                updated_at = NOW()
            WHERE id = $1 AND business_id = $2 AND NOT is_deleted
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(business_id)
        .bind(&req.name)
        .bind(&req.description)
        .fetch_optional(&self.db)
        .await?;

        Ok(category)
    }

    /// Number of live products still referencing the category. Deletion is
    /// refused while this is non-zero.
    pub async fn product_count(&self, id: Uuid, business_id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) FROM products
            WHERE category_id = $1 AND business_id = $2 AND NOT is_deleted
            "#,
        )
        .bind(id)
        .bind(business_id)
        .fetch_one(&self.db)
        .await?
        .get(0);

        Ok(count)
    }

    pub async fn soft_delete(&self, id: Uuid, business_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE categories
            SET is_deleted = TRUE, updated_at = NOW()
            WHERE id = $1 AND business_id = $2 AND NOT is_deleted
            "#,
        )
        .bind(id)
        .bind(business_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
