//! Product repository

use crate::{error::AppError, models::product::*};
use rand::Rng;
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct ProductRepository {
    db: PgPool,
}

impl ProductRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Auto-generated SKU for products created without one
    pub fn generate_sku() -> String {
        const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
        let mut rng = rand::thread_rng();
        let suffix: String = (0..6)
            .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
            .collect();
        format!("PRD-{}", suffix)
    }

    pub async fn list(
        &self,
        business_id: Uuid,
        query: &ProductListQuery,
    ) -> Result<(Vec<ProductWithCategory>, i64), AppError> {
        let offset = (query.page.max(1) - 1) * query.limit;
        let search = query.search.as_ref().map(|s| format!("%{}%", s));

        let rows = sqlx::query_as::<_, ProductWithCategory>(
            r#"
            SELECT
                p.id, p.category_id, c.name AS category_name,
                p.name, p.sku, p.barcode, p.price, p.cost_price,
                p.stock_quantity, p.min_stock_level, p.image_url, p.created_at
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id AND NOT c.is_deleted
            WHERE p.business_id = $1 AND NOT p.is_deleted
              AND ($2::text IS NULL OR p.name ILIKE $2 OR p.sku ILIKE $2 OR p.barcode ILIKE $2)
              AND ($3::uuid IS NULL OR p.category_id = $3)
            ORDER BY p.name
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(business_id)
        .bind(&search)
        .bind(query.category_id)
        .bind(query.limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) FROM products p
            WHERE p.business_id = $1 AND NOT p.is_deleted
              AND ($2::text IS NULL OR p.name ILIKE $2 OR p.sku ILIKE $2 OR p.barcode ILIKE $2)
              AND ($3::uuid IS NULL OR p.category_id = $3)
            "#,
        )
        .bind(business_id)
        .bind(&search)
        .bind(query.category_id)
        .fetch_one(&self.db)
        .await?
        .get(0);

        Ok((rows, total))
    }

    pub async fn find_by_id(
        &self,
        id: Uuid,
        business_id: Uuid,
    ) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE id = $1 AND business_id = $2 AND NOT is_deleted",
        )
        .bind(id)
        .bind(business_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(product)
    }

    pub async fn create(
        &self,
        business_id: Uuid,
        req: &CreateProductRequest,
        sku: &str,
    ) -> Result<Product, AppError> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products
                (business_id, category_id, name, sku, barcode, description,
                 price, cost_price, stock_quantity, min_stock_level, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, 0), COALESCE($9, 0), COALESCE($10, 0), $11)
            RETURNING *
            "#,
        )
        .bind(business_id)
        .bind(req.category_id)
        .bind(&req.name)
        .bind(sku)
        .bind(&req.barcode)
        .bind(&req.description)
        .bind(req.price)
        .bind(req.cost_price)
        .bind(req.stock_quantity)
        .bind(req.min_stock_level)
        .bind(&req.image_url)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("A product with this SKU already exists".to_string())
            }
            _ => AppError::Database(e),
        })?;

        Ok(product)
    }

    pub async fn update(
        &self,
        id: Uuid,
        business_id: Uuid,
        req: &UpdateProductRequest,
    ) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET
                name = COALESCE($3, name),
                barcode = COALESCE($4, barcode),
                description = COALESCE($5, description),
                category_id = COALESCE($6, category_id),
                price = COALESCE($7, price),
                cost_price = COALESCE($8, cost_price),
                min_stock_level = COALESCE($9, min_stock_level),
                image_url = COALESCE($10, image_url),
                updated_at = NOW()
            WHERE id = $1 AND business_id = $2 AND NOT is_deleted
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(business_id)
        .bind(&req.name)
        .bind(&req.barcode)
        .bind(&req.description)
        .bind(req.category_id)
        .bind(req.price)
        .bind(req.cost_price)
        .bind(req.min_stock_level)
        .bind(&req.image_url)
        .fetch_optional(&self.db)
        .await?;

        Ok(product)
    }

    pub async fn soft_delete(&self, id: Uuid, business_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE products
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

    pub async fn restore(&self, id: Uuid, business_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET is_deleted = FALSE, updated_at = NOW()
            WHERE id = $1 AND business_id = $2 AND is_deleted
            "#,
        )
        .bind(id)
        .bind(business_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn low_stock(&self, business_id: Uuid) -> Result<Vec<ProductWithCategory>, AppError> {
        let rows = sqlx::query_as::<_, ProductWithCategory>(
            r#"
            SELECT
                p.id, p.category_id, c.name AS category_name,
                p.name, p.sku, p.barcode, p.price, p.cost_price,
                p.stock_quantity, p.min_stock_level, p.image_url, p.created_at
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id AND NOT c.is_deleted
            WHERE p.business_id = $1 AND NOT p.is_deleted
              AND p.stock_quantity <= p.min_stock_level
            ORDER BY p.stock_quantity ASC
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_sku_shape() {
        let sku = ProductRepository::generate_sku();
        assert!(sku.starts_with("PRD-"));
        assert_eq!(sku.len(), 10);
    }
}
