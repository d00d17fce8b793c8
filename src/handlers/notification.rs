//! Notification endpoints: broadcasts, threaded replies and per-user
//! read state.

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::notification::*,
    repository::NotificationRepository,
    services::{AuditAction, PermissionService},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use super::Paginated;

pub async fn send_notification(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(req): Json<SendNotificationRequest>,
) -> Result<(StatusCode, Json<Notification>), AppError> {
    req.validate()?;

    let business_id = PermissionService::tenant_id(&ctx)?;
    let notification = state
        .notification_service
        .send(&ctx, business_id, &req)
        .await?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            Some(business_id),
            AuditAction::NotificationSend,
            Some(notification.id),
            Some(json!({
                "target_role": notification.target_role,
                "parent_id": notification.parent_id,
            })),
            None,
        )
        .await;

    Ok((StatusCode::CREATED, Json(notification)))
}

pub async fn inbox(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<InboxQuery>,
) -> Result<Json<Paginated<InboxRow>>, AppError> {
    let (items, total) = state.notification_service.inbox(&ctx, &query).await?;

    Ok(Json(Paginated::new(items, total, query.page, query.limit)))
}

/// A root notification and its replies
pub async fn get_thread(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<NotificationThread>, AppError> {
    let business_id = PermissionService::tenant_id(&ctx)?;
    let thread = NotificationRepository::new(state.db.clone())
        .thread(id, business_id, ctx.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Notification"))?;

    Ok(Json(thread))
}

pub async fn mark_read(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !NotificationRepository::new(state.db.clone())
        .mark_read(id, ctx.user_id)
        .await?
    {
        return Err(AppError::not_found("Notification"));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<serde_json::Value>, AppError> {
    let updated = NotificationRepository::new(state.db.clone())
        .mark_all_read(ctx.user_id)
        .await?;

    Ok(Json(json!({ "marked_read": updated })))
}

/// Senders can retract their own notifications
pub async fn delete_notification(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let business_id = PermissionService::tenant_id(&ctx)?;
    if !NotificationRepository::new(state.db.clone())
        .soft_delete(id, business_id, ctx.user_id)
        .await?
    {
        return Err(AppError::not_found("Notification"));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn unread_count(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<serde_json::Value>, AppError> {
    let count = NotificationRepository::new(state.db.clone())
        .unread_count(ctx.user_id)
        .await?;

    Ok(Json(json!({ "unread": count })))
}

pub async fn notification_stats(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<NotificationStats>, AppError> {
    let stats = NotificationRepository::new(state.db.clone())
        .stats(ctx.user_id)
        .await?;

    Ok(Json(stats))
}
