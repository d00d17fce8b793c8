//! Customer repository

use crate::{error::AppError, models::customer::*};
use sqlx::PgPool;
use uuid::Uuid;

pub struct CustomerRepository {
    db: PgPool,
}

impl CustomerRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, business_id: Uuid) -> Result<Vec<Customer>, AppError> {
        let customers = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE business_id = $1 AND NOT is_deleted ORDER BY name",
        )
        .bind(business_id)
        .fetch_all(&self.db)
        .await?;

        Ok(customers)
    }

    pub async fn find_by_id(
        &self,
        id: Uuid,
        business_id: Uuid,
    ) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE id = $1 AND business_id = $2 AND NOT is_deleted",
        )
        .bind(id)
        .bind(business_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(customer)
    }

    pub async fn create(
        &self,
        business_id: Uuid,
        req: &CreateCustomerRequest,
    ) -> Result<Customer, AppError> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (business_id, name, phone, email, address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(business_id)
        .bind(&req.name)
        .bind(&req.phone)
        .bind(&req.email)
        .bind(&req.address)
        .fetch_one(&self.db)
        .await?;

        Ok(customer)
    }

    pub async fn update(
        &self,
        id: Uuid,
        business_id: Uuid,
        req: &UpdateCustomerRequest,
    ) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers
            SET
                name = COALESCE($3, name),
                phone = COALESCE($4, phone),
                email = COALESCE($5, email),
                address = COALESCE($6, address),
                updated_at = NOW()
            WHERE id = $1 AND business_id = $2 AND NOT is_deleted
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(business_id)
        .bind(&req.name)
        .bind(&req.phone)
        .bind(&req.email)
        .bind(&req.address)
        .fetch_optional(&self.db)
        .await?;

        Ok(customer)
    }

    pub async fn soft_delete(&self, id: Uuid, business_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE customers
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

    /// Prefix search over name and phone, capped at 10 rows for typeahead
    pub async fn search(&self, business_id: Uuid, term: &str) -> Result<Vec<Customer>, AppError> {
        let pattern = format!("{}%", term);

        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT * FROM customers
            WHERE business_id = $1 AND NOT is_deleted
              AND (name ILIKE $2 OR phone LIKE $2)
            ORDER BY name
            LIMIT 10
            "#,
        )
        .bind(business_id)
        .bind(&pattern)
        .fetch_all(&self.db)
        .await?;

        Ok(customers)
    }

    /// Adjust loyalty points; the balance never goes below zero
    pub async fn adjust_loyalty_points(
        &self,
        id: Uuid,
        business_id: Uuid,
        delta: i32,
    ) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers
            SET loyalty_points = GREATEST(loyalty_points + $3, 0), updated_at = NOW()
            WHERE id = $1 AND business_id = $2 AND NOT is_deleted
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(business_id)
        .bind(delta)
        .fetch_optional(&self.db)
        .await?;

        Ok(customer)
    }
}
