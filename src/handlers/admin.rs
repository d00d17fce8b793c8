//! Superadmin platform endpoints: analytics, audit trail, deleted
//! record recovery and global settings.

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::audit::{AuditActionCount, AuditLog, AuditLogQuery},
    repository::AuditRepository,
    services::{
        analytics_service::{
            AppSetting, DeletedRecordRow, PlatformDashboard, ProductAnalytics, RevenueTrendRow,
            SalesAnalytics, TopBusinessRow, UserAnalytics,
        },
        AuditAction, PermissionService,
    },
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::Paginated;

pub async fn platform_dashboard(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<PlatformDashboard>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    let dashboard = state.analytics_service.platform_dashboard().await?;

    Ok(Json(dashboard))
}

#[derive(Debug, Deserialize)]
pub struct RevenueTrendQuery {
    #[serde(default = "default_trend_months")]
    pub months: i64,
}

fn default_trend_months() -> i64 {
    12
}

pub async fn revenue_trend(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<RevenueTrendQuery>,
) -> Result<Json<Vec<RevenueTrendRow>>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    let rows = state.analytics_service.revenue_trend(query.months).await?;

    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct TopBusinessesQuery {
    #[serde(default = "default_top_limit")]
    pub limit: i64,
}

fn default_top_limit() -> i64 {
    10
}

pub async fn top_businesses(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<TopBusinessesQuery>,
) -> Result<Json<Vec<TopBusinessRow>>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    let rows = state.analytics_service.top_businesses(query.limit).await?;

    Ok(Json(rows))
}

pub async fn sales_analytics(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<RevenueTrendQuery>,
) -> Result<Json<SalesAnalytics>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    let analytics = state.analytics_service.sales_analytics(query.months).await?;

    Ok(Json(analytics))
}

pub async fn user_analytics(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<UserAnalytics>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    let analytics = state.analytics_service.user_analytics().await?;

    Ok(Json(analytics))
}

pub async fn product_analytics(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<ProductAnalytics>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    let analytics = state.analytics_service.product_analytics().await?;

    Ok(Json(analytics))
}

pub async fn list_audit_logs(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<Paginated<AuditLog>>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    let (items, total) = AuditRepository::new(state.db.clone()).list(&query).await?;

    Ok(Json(Paginated::new(items, total, query.page, query.limit)))
}

#[derive(Debug, Deserialize)]
pub struct ActionCountQuery {
    #[serde(default = "default_action_limit")]
    pub limit: i64,
}

fn default_action_limit() -> i64 {
    20
}

pub async fn audit_action_counts(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<ActionCountQuery>,
) -> Result<Json<Vec<AuditActionCount>>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    let counts = AuditRepository::new(state.db.clone())
        .action_counts(query.limit.clamp(1, 100))
        .await?;

    Ok(Json(counts))
}

#[derive(Debug, Deserialize)]
pub struct DeletedRecordsQuery {
    pub business_id: Option<Uuid>,
}

pub async fn deleted_records(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(resource): Path<String>,
    Query(query): Query<DeletedRecordsQuery>,
) -> Result<Json<Vec<DeletedRecordRow>>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    let rows = state
        .analytics_service
        .deleted_records(&resource, query.business_id)
        .await?;

    Ok(Json(rows))
}

pub async fn restore_record(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path((resource, id)): Path<(String, Uuid)>,
) -> Result<Json<serde_json::Value>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    if !state.analytics_service.restore_record(&resource, id).await? {
        return Err(AppError::not_found("Record"));
    }

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            None,
            AuditAction::RecordRestore,
            Some(id),
            Some(json!({ "resource": resource })),
            None,
        )
        .await;

    Ok(Json(json!({ "resource": resource, "id": id, "restored": true })))
}

/// Permanent removal of an already soft-deleted record
pub async fn purge_record(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path((resource, id)): Path<(String, Uuid)>,
) -> Result<Json<serde_json::Value>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    if !state.analytics_service.purge_record(&resource, id).await? {
        return Err(AppError::not_found("Record"));
    }

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            None,
            AuditAction::RecordPurge,
            Some(id),
            Some(json!({ "resource": resource })),
            None,
        )
        .await;

    Ok(Json(json!({ "resource": resource, "id": id, "purged": true })))
}

pub async fn list_settings(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<Vec<AppSetting>>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    let settings = state.analytics_service.settings().await?;

    Ok(Json(settings))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingRequest {
    pub value: String,
}

pub async fn update_setting(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(key): Path<String>,
    Json(req): Json<UpdateSettingRequest>,
) -> Result<Json<AppSetting>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    if key.trim().is_empty() || key.len() > 128 {
        return Err(AppError::BadRequest("Invalid setting key".to_string()));
    }

    let setting = state
        .analytics_service
        .update_setting(&key, &req.value, ctx.user_id)
        .await?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            None,
            AuditAction::SettingUpdate,
            None,
            Some(json!({ "key": key })),
            None,
        )
        .await;

    Ok(Json(setting))
}
