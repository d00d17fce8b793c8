//! Refresh token and login event storage

use crate::{error::AppError, models::auth::*};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct AuthRepository {
    db: PgPool,
}

impl AuthRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Refresh tokens are stored hashed so a database leak does not leak
    /// usable credentials.
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub async fn store_refresh_token(&self, token: &RefreshToken) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens
                (id, user_id, token_hash, ip_address, user_agent, expires_at, replaced_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.token_hash)
        .bind(&token.ip_address)
        .bind(&token.user_agent)
        .bind(token.expires_at)
        .bind(token.replaced_by)
        .bind(token.created_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    pub async fn find_refresh_token_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshToken>, AppError> {
        let token = sqlx::query_as::<_, RefreshToken>(
            "SELECT * FROM refresh_tokens WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.db)
        .await?;

        Ok(token)
    }

    pub async fn revoke_refresh_token_by_hash(
        &self,
        token_hash: &str,
        user_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = NOW()
            WHERE token_hash = $1 AND user_id = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(token_hash)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Rotation: revoke the old token and point it at its successor
    pub async fn mark_replaced(&self, old_id: Uuid, new_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = NOW(), replaced_by = $2
            WHERE id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(old_id)
        .bind(new_id)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    pub async fn revoke_all_refresh_tokens(&self, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    /// Failed logins from one address within the window, for rate limiting
    pub async fn count_recent_login_failures(
        &self,
        source_ip: &str,
        window_secs: i64,
    ) -> Result<i64, AppError> {
        let count: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) FROM login_events
            WHERE source_ip = $1
              AND event_type = 'login_failure'
              AND occurred_at > NOW() - ($2 || ' seconds')::interval
            "#,
        )
        .bind(source_ip)
        .bind(window_secs.to_string())
        .fetch_one(&self.db)
        .await?
        .get(0);

        Ok(count)
    }

    pub async fn record_login_event(&self, event: &LoginEvent) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO login_events
                (id, user_id, username, event_type, failure_reason, source_ip, user_agent, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.id)
        .bind(event.user_id)
        .bind(&event.username)
        .bind(&event.event_type)
        .bind(&event.failure_reason)
        .bind(&event.source_ip)
        .bind(&event.user_agent)
        .bind(event.occurred_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_stable() {
        let a = AuthRepository::hash_token("some-refresh-token");
        let b = AuthRepository::hash_token("some-refresh-token");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_hash_token_differs_per_input() {
        let a = AuthRepository::hash_token("token-a");
        let b = AuthRepository::hash_token("token-b");
        assert_ne!(a, b);
    }
}
