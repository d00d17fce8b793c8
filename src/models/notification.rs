//! Notification domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub business_id: Uuid,
    pub sender_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    pub notification_type: String,
    pub priority: String, // low, normal, high
    pub target_role: String, // all, admin, manager, cashier
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendNotificationRequest {
    /// Defaults to "Re: <parent title>" for replies
    pub title: Option<String>,
    #[validate(length(min = 1, max = 4096))]
    pub message: String,
    pub notification_type: Option<String>,
    pub priority: Option<String>,
    /// Ignored for replies; the recipient is the parent's sender
    pub target_role: Option<String>,
    pub parent_id: Option<Uuid>,
}

/// Inbox row with sender and read state
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct InboxRow {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub title: String,
    pub message: String,
    pub notification_type: String,
    pub priority: String,
    pub target_role: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct InboxQuery {
    pub unread_only: Option<bool>,
    pub notification_type: Option<String>,
    /// "sent" or "received" (default)
    pub direction: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct NotificationThread {
    pub root: InboxRow,
    pub replies: Vec<InboxRow>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct NotificationTypeCount {
    pub notification_type: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct NotificationStats {
    pub total: i64,
    pub unread: i64,
    pub by_type: Vec<NotificationTypeCount>,
}
