//! Notification delivery.
//! A notification is written once and fanned out to recipient rows in
//! user_notifications inside one transaction. Replies are addressed to
//! the parent's sender only and inherit the thread title.

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    models::{notification::*, user::Role},
    repository::NotificationRepository,
};
use sqlx::{PgPool, Row};
use uuid::Uuid;

const PRIORITIES: &[&str] = &["low", "normal", "high"];
const TARGET_ROLES: &[&str] = &["all", "admin", "manager", "cashier"];

pub struct NotificationService {
    db: PgPool,
    notifications: NotificationRepository,
}

impl NotificationService {
    pub fn new(db: PgPool) -> Self {
        Self {
            notifications: NotificationRepository::new(db.clone()),
            db,
        }
    }

    pub async fn send(
        &self,
        ctx: &AuthContext,
        business_id: Uuid,
        req: &SendNotificationRequest,
    ) -> Result<Notification, AppError> {
        let priority = req.priority.as_deref().unwrap_or("normal");
        if !PRIORITIES.contains(&priority) {
            return Err(AppError::BadRequest(format!("Invalid priority: {}", priority)));
        }

        match req.parent_id {
            Some(parent_id) => self.send_reply(ctx, business_id, parent_id, req, priority).await,
            None => self.send_broadcast(ctx, business_id, req, priority).await,
        }
    }

    async fn send_broadcast(
        &self,
        ctx: &AuthContext,
        business_id: Uuid,
        req: &SendNotificationRequest,
        priority: &str,
    ) -> Result<Notification, AppError> {
        let title = req
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("title is required".to_string()))?;

        let target_role = req.target_role.as_deref().unwrap_or("all");
        if !TARGET_ROLES.contains(&target_role) {
            return Err(AppError::BadRequest(format!("Invalid target_role: {}", target_role)));
        }

        // Cashiers may only message upwards, not broadcast
        if ctx.role == Role::Cashier && target_role != "admin" && target_role != "manager" {
            return Err(AppError::Forbidden);
        }

        let notification_type = req.notification_type.as_deref().unwrap_or("general");

        let mut tx = self.db.begin().await?;

        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications
                (business_id, sender_id, title, message, notification_type, priority, target_role)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(business_id)
        .bind(ctx.user_id)
        .bind(title)
        .bind(&req.message)
        .bind(notification_type)
        .bind(priority)
        .bind(target_role)
        .fetch_one(&mut *tx)
        .await?;

        let recipients = sqlx::query(
            r#"
            INSERT INTO user_notifications (notification_id, user_id)
            SELECT $1, u.id FROM users u
            WHERE u.business_id = $2
              AND u.id <> $3
              AND u.status = 'active' AND NOT u.is_deleted
              AND ($4 = 'all' OR u.role = $4)
            "#,
        )
        .bind(notification.id)
        .bind(business_id)
        .bind(ctx.user_id)
        .bind(target_role)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            notification_id = %notification.id,
            recipients = recipients.rows_affected(),
            target_role,
            "Notification sent"
        );

        Ok(notification)
    }

    async fn send_reply(
        &self,
        ctx: &AuthContext,
        business_id: Uuid,
        parent_id: Uuid,
        req: &SendNotificationRequest,
        priority: &str,
    ) -> Result<Notification, AppError> {
        let mut tx = self.db.begin().await?;

        let parent = sqlx::query(
            r#"
            SELECT id, sender_id, title, notification_type
            FROM notifications
            WHERE id = $1 AND business_id = $2 AND parent_id IS NULL AND NOT is_deleted
            "#,
        )
        .bind(parent_id)
        .bind(business_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Notification"))?;

        let parent_title: String = parent.get("title");
        let parent_sender: Uuid = parent.get("sender_id");
        let notification_type: String = parent.get("notification_type");

        let title = match req.title.as_deref().filter(|t| !t.trim().is_empty()) {
            Some(title) => title.to_string(),
            None if parent_title.starts_with("Re: ") => parent_title.clone(),
            None => format!("Re: {}", parent_title),
        };

        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications
                (business_id, sender_id, parent_id, title, message, notification_type, priority, target_role)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'all')
            RETURNING *
            "#,
        )
        .bind(business_id)
        .bind(ctx.user_id)
        .bind(parent_id)
        .bind(&title)
        .bind(&req.message)
        .bind(&notification_type)
        .bind(priority)
        .fetch_one(&mut *tx)
        .await?;

        // The reply goes to the parent's sender only
        if parent_sender != ctx.user_id {
            sqlx::query(
                "INSERT INTO user_notifications (notification_id, user_id) VALUES ($1, $2)",
            )
            .bind(notification.id)
            .bind(parent_sender)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(notification_id = %notification.id, %parent_id, "Reply sent");

        Ok(notification)
    }

    pub async fn inbox(
        &self,
        ctx: &AuthContext,
        query: &InboxQuery,
    ) -> Result<(Vec<InboxRow>, i64), AppError> {
        match query.direction.as_deref() {
            Some("sent") => self.notifications.sent(ctx.user_id, query).await,
            _ => self.notifications.inbox(ctx.user_id, query).await,
        }
    }
}
