//! Notification repository.
//! Broadcast rows live in notifications; per-user read state in
//! user_notifications. Fan-out to recipients happens in the
//! notification service inside a transaction.

use crate::{error::AppError, models::notification::*};
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct NotificationRepository {
    db: PgPool,
}

impl NotificationRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn find_by_id(
        &self,
        id: Uuid,
        business_id: Uuid,
    ) -> Result<Option<Notification>, AppError> {
        let notification = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE id = $1 AND business_id = $2 AND NOT is_deleted",
        )
        .bind(id)
        .bind(business_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(notification)
    }

    pub async fn inbox(
        &self,
        user_id: Uuid,
        query: &InboxQuery,
    ) -> Result<(Vec<InboxRow>, i64), AppError> {
        let offset = (query.page.max(1) - 1) * query.limit;
        let unread_only = query.unread_only.unwrap_or(false);

        let rows = sqlx::query_as::<_, InboxRow>(
            r#"
            SELECT
                n.id, n.parent_id, n.sender_id, s.username AS sender_name,
                n.title, n.message, n.notification_type, n.priority,
                n.target_role, un.is_read, n.created_at
            FROM user_notifications un
            JOIN notifications n ON n.id = un.notification_id
            JOIN users s ON s.id = n.sender_id
            WHERE un.user_id = $1 AND NOT n.is_deleted
              AND (NOT $2 OR NOT un.is_read)
              AND ($3::text IS NULL OR n.notification_type = $3)
            ORDER BY n.created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(&query.notification_type)
        .bind(query.limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query(
            r#"
            SELECT COUNT(*)
            FROM user_notifications un
            JOIN notifications n ON n.id = un.notification_id
            WHERE un.user_id = $1 AND NOT n.is_deleted
              AND (NOT $2 OR NOT un.is_read)
              AND ($3::text IS NULL OR n.notification_type = $3)
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(&query.notification_type)
        .fetch_one(&self.db)
        .await?
        .get(0);

        Ok((rows, total))
    }

    pub async fn sent(
        &self,
        sender_id: Uuid,
        query: &InboxQuery,
    ) -> Result<(Vec<InboxRow>, i64), AppError> {
        let offset = (query.page.max(1) - 1) * query.limit;

        let rows = sqlx::query_as::<_, InboxRow>(
            r#"
            SELECT
                n.id, n.parent_id, n.sender_id, s.username AS sender_name,
                n.title, n.message, n.notification_type, n.priority,
                n.target_role, TRUE AS is_read, n.created_at
            FROM notifications n
            JOIN users s ON s.id = n.sender_id
            WHERE n.sender_id = $1 AND NOT n.is_deleted
              AND ($2::text IS NULL OR n.notification_type = $2)
            ORDER BY n.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(sender_id)
        .bind(&query.notification_type)
        .bind(query.limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) FROM notifications n
            WHERE n.sender_id = $1 AND NOT n.is_deleted
              AND ($2::text IS NULL OR n.notification_type = $2)
            "#,
        )
        .bind(sender_id)
        .bind(&query.notification_type)
        .fetch_one(&self.db)
        .await?
        .get(0);

        Ok((rows, total))
    }

    /// Root notification plus its replies, with read state for the viewer
    pub async fn thread(
        &self,
        root_id: Uuid,
        business_id: Uuid,
        viewer_id: Uuid,
    ) -> Result<Option<NotificationThread>, AppError> {
        let rows = sqlx::query_as::<_, InboxRow>(
            r#"
            SELECT
                n.id, n.parent_id, n.sender_id, s.username AS sender_name,
                n.title, n.message, n.notification_type, n.priority,
                n.target_role, COALESCE(un.is_read, n.sender_id = $3) AS is_read,
                n.created_at
            FROM notifications n
            JOIN users s ON s.id = n.sender_id
            LEFT JOIN user_notifications un
                ON un.notification_id = n.id AND un.user_id = $3
            WHERE (n.id = $1 OR n.parent_id = $1)
              AND n.business_id = $2 AND NOT n.is_deleted
            ORDER BY n.created_at
            "#,
        )
        .bind(root_id)
        .bind(business_id)
        .bind(viewer_id)
        .fetch_all(&self.db)
        .await?;

        let mut root = None;
        let mut replies = Vec::new();
        for row in rows {
            if row.id == root_id {
                root = Some(row);
            } else {
                replies.push(row);
            }
        }

        Ok(root.map(|root| NotificationThread { root, replies }))
    }

    pub async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE user_notifications
            SET is_read = TRUE, read_at = NOW()
            WHERE notification_id = $1 AND user_id = $2 AND NOT is_read
            "#,
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE user_notifications
            SET is_read = TRUE, read_at = NOW()
            WHERE user_id = $1 AND NOT is_read
            "#,
        )
        .bind(user_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    /// Sender may retract their own notification; replies stay
    pub async fn soft_delete(
        &self,
        id: Uuid,
        business_id: Uuid,
        sender_id: Uuid,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_deleted = TRUE
            WHERE id = $1 AND business_id = $2 AND sender_id = $3 AND NOT is_deleted
            "#,
        )
        .bind(id)
        .bind(business_id)
        .bind(sender_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query(
            r#"
            SELECT COUNT(*)
            FROM user_notifications un
            JOIN notifications n ON n.id = un.notification_id
            WHERE un.user_id = $1 AND NOT un.is_read AND NOT n.is_deleted
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?
        .get(0);

        Ok(count)
    }

    pub async fn stats(&self, user_id: Uuid) -> Result<NotificationStats, AppError> {
        let totals = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE NOT un.is_read) AS unread
            FROM user_notifications un
            JOIN notifications n ON n.id = un.notification_id
            WHERE un.user_id = $1 AND NOT n.is_deleted
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        let by_type = sqlx::query_as::<_, NotificationTypeCount>(
            r#"
            SELECT n.notification_type, COUNT(*) AS count
            FROM user_notifications un
            JOIN notifications n ON n.id = un.notification_id
            WHERE un.user_id = $1 AND NOT n.is_deleted
            GROUP BY n.notification_type
            ORDER BY count DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(NotificationStats {
            total: totals.get("total"),
            unread: totals.get("unread"),
            by_type,
        })
    }
}
