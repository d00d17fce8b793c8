//! User repository

use crate::{error::AppError, models::user::*};
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct UserRepository {
    db: PgPool,
}

impl UserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Find a user by username or email. Used by login, which accepts either.
    pub async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE (username = $1 OR email = $1) AND NOT is_deleted",
        )
        .bind(identifier)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND NOT is_deleted")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    /// Username uniqueness check within a tenant (or among superadmins)
    pub async fn username_exists(
        &self,
        business_id: Option<Uuid>,
        username: &str,
    ) -> Result<bool, AppError> {
        let count: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) FROM users
            WHERE username = $1
              AND business_id IS NOT DISTINCT FROM $2
              AND NOT is_deleted
            "#,
        )
        .bind(username)
        .bind(business_id)
        .fetch_one(&self.db)
        .await?
        .get(0);

        Ok(count > 0)
    }

    pub async fn create(
        &self,
        business_id: Option<Uuid>,
        req: &CreateUserRequest,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (business_id, username, email, password_hash, full_name, phone, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(business_id)
        .bind(&req.username)
        .bind(&req.email)
        .bind(password_hash)
        .bind(&req.full_name)
        .bind(&req.phone)
        .bind(&req.role)
        .fetch_one(&self.db)
        .await?;

        Ok(user)
    }

    pub async fn update(
        &self,
        id: Uuid,
        business_id: Option<Uuid>,
        req: &UpdateUserRequest,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET
                email = COALESCE($3, email),
                full_name = COALESCE($4, full_name),
                phone = COALESCE($5, phone),
                role = COALESCE($6, role),
                status = COALESCE($7, status),
                updated_at = NOW()
            WHERE id = $1
              AND ($2::uuid IS NULL OR business_id = $2)
              AND NOT is_deleted
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(business_id)
        .bind(&req.email)
        .bind(&req.full_name)
        .bind(&req.phone)
        .bind(&req.role)
        .bind(&req.status)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    /// Update the caller's own profile fields
    pub async fn update_profile(
        &self,
        id: Uuid,
        email: Option<&str>,
        full_name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET
                email = COALESCE($2, email),
                full_name = COALESCE($3, full_name),
                phone = COALESCE($4, phone),
                updated_at = NOW()
            WHERE id = $1 AND NOT is_deleted
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(full_name)
        .bind(phone)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    pub async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET
                password_hash = $2,
                failed_login_attempts = 0,
                locked_until = NULL,
                updated_at = NOW()
            WHERE id = $1 AND NOT is_deleted
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn soft_delete(&self, id: Uuid, business_id: Option<Uuid>) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_deleted = TRUE, updated_at = NOW()
            WHERE id = $1
              AND ($2::uuid IS NULL OR business_id = $2)
              AND NOT is_deleted
            "#,
        )
        .bind(id)
        .bind(business_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn increment_failed_attempts(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
            SET
                failed_login_attempts = failed_login_attempts + 1,
                last_failed_login_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    pub async fn reset_failed_attempts(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
            SET
                failed_login_attempts = 0,
                last_failed_login_at = NULL,
                locked_until = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    pub async fn lock_account(
        &self,
        id: Uuid,
        locked_until: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
            SET locked_until = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(locked_until)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// List users, tenant-scoped unless business_id is None (superadmin)
    pub async fn list(
        &self,
        business_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE ($1::uuid IS NULL OR business_id = $1)
              AND NOT is_deleted
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(business_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    pub async fn count(&self, business_id: Option<Uuid>) -> Result<i64, AppError> {
        let count: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) FROM users
            WHERE ($1::uuid IS NULL OR business_id = $1)
              AND NOT is_deleted
            "#,
        )
        .bind(business_id)
        .fetch_one(&self.db)
        .await?
        .get(0);

        Ok(count)
    }
}
