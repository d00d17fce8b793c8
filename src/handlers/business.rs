//! Business (tenant) management endpoints.
//! Mostly superadmin surface; tenant admins can view and update their
//! own business.

use crate::{
    auth::{middleware::AuthContext, password::PasswordHasher},
    error::AppError,
    middleware::AppState,
    models::{business::*, user::User},
    repository::{BusinessRepository, UserRepository},
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

pub async fn list_businesses(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<BusinessListQuery>,
) -> Result<Json<Paginated<BusinessOverview>>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    let (items, total) = BusinessRepository::new(state.db.clone())
        .list_overview(&query)
        .await?;

    Ok(Json(Paginated::new(items, total, query.page, query.limit)))
}

pub async fn get_business(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Business>, AppError> {
    if !ctx.is_superadmin() && ctx.business_id != Some(id) {
        return Err(AppError::Forbidden);
    }

    let business = BusinessRepository::new(state.db.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Business"))?;

    Ok(Json(business))
}

/// The caller's own tenant
pub async fn my_business(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<Business>, AppError> {
    let business_id = PermissionService::tenant_id(&ctx)?;
    let business = BusinessRepository::new(state.db.clone())
        .find_by_id(business_id)
        .await?
        .ok_or_else(|| AppError::not_found("Business"))?;

    Ok(Json(business))
}

/// Create a tenant together with its first admin account
pub async fn create_business(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(req): Json<CreateBusinessRequest>,
) -> Result<(StatusCode, Json<Business>), AppError> {
    PermissionService::require_superadmin(&ctx)?;
    req.validate()?;

    PasswordHasher::validate_password_policy(&req.admin_password, &state.config)?;
    let password_hash = PasswordHasher::new().hash(&req.admin_password)?;

    let business_code = BusinessRepository::generate_business_code();
    let monthly_fee = req
        .monthly_fee
        .unwrap_or(state.config.billing.default_monthly_fee);
    if monthly_fee < 0.0 {
        return Err(AppError::BadRequest("monthly_fee must not be negative".to_string()));
    }

    let mut tx = state.db.begin().await?;

    let business = sqlx::query_as::<_, Business>(
        r#"
        INSERT INTO businesses
            (name, business_code, owner_name, owner_email, owner_phone, address,
             subscription_plan, monthly_fee, grace_period_days)
        VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, 'basic'), $8, $9)
        RETURNING *
        "#,
    )
    .bind(&req.name)
    .bind(&business_code)
    .bind(&req.owner_name)
    .bind(&req.owner_email)
    .bind(&req.owner_phone)
    .bind(&req.address)
    .bind(&req.subscription_plan)
    .bind(monthly_fee)
    .bind(state.config.billing.default_grace_period_days as i32)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (business_id, username, password_hash, role)
        VALUES ($1, $2, $3, 'admin')
        RETURNING *
        "#,
    )
    .bind(business.id)
    .bind(&req.admin_username)
    .bind(&password_hash)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("Admin username is already taken".to_string())
        }
        _ => AppError::Database(e),
    })?;

    tx.commit().await?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            None,
            AuditAction::BusinessCreate,
            Some(business.id),
            Some(json!({ "name": business.name, "business_code": business.business_code })),
            None,
        )
        .await;

    Ok((StatusCode::CREATED, Json(business)))
}

pub async fn update_business(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBusinessRequest>,
) -> Result<Json<Business>, AppError> {
    req.validate()?;

    if ctx.is_superadmin() {
        // ok
    } else {
        PermissionService::require_admin(&ctx)?;
        if ctx.business_id != Some(id) {
            return Err(AppError::Forbidden);
        }
        // Plan and fee are billing terms, only the platform sets them
        if req.subscription_plan.is_some() || req.monthly_fee.is_some() {
            return Err(AppError::Forbidden);
        }
    }

    let business = BusinessRepository::new(state.db.clone())
        .update(id, &req)
        .await?
        .ok_or_else(|| AppError::not_found("Business"))?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            ctx.business_id,
            AuditAction::BusinessUpdate,
            Some(id),
            None,
            None,
        )
        .await;

    Ok(Json(business))
}

pub async fn set_business_status(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBusinessStatusRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    if !BusinessRepository::new(state.db.clone())
        .set_active(id, req.is_active)
        .await?
    {
        return Err(AppError::not_found("Business"));
    }

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            None,
            AuditAction::BusinessUpdate,
            Some(id),
            Some(json!({ "is_active": req.is_active, "reason": req.reason })),
            None,
        )
        .await;

    Ok(Json(json!({ "id": id, "is_active": req.is_active })))
}

pub async fn business_statistics(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<BusinessStatistics>, AppError> {
    if !ctx.is_superadmin() {
        PermissionService::require_admin(&ctx)?;
        if ctx.business_id != Some(id) {
            return Err(AppError::Forbidden);
        }
    }

    let repo = BusinessRepository::new(state.db.clone());
    repo.find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Business"))?;
    let stats = repo.statistics(id).await?;

    Ok(Json(stats))
}

/// Branding settings of the caller's own tenant, visible to every member
pub async fn get_branding(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<BrandingSettings>, AppError> {
    let business_id = PermissionService::tenant_id(&ctx)?;
    let settings = BusinessRepository::new(state.db.clone())
        .branding(business_id)
        .await?
        .ok_or_else(|| AppError::not_found("Business"))?;

    Ok(Json(settings))
}

pub async fn update_branding(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(req): Json<UpdateBrandingRequest>,
) -> Result<Json<BrandingSettings>, AppError> {
    PermissionService::require_admin(&ctx)?;
    req.validate()?;

    for (field, color) in req.colors() {
        if let Some(color) = color {
            if !is_valid_hex_color(color) {
                return Err(AppError::BadRequest(format!(
                    "{} must be a hex color like #2563EB",
                    field
                )));
            }
        }
    }
    if let Some(theme) = &req.theme {
        if !["light", "dark"].contains(&theme.as_str()) {
            return Err(AppError::BadRequest(format!("Invalid theme: {}", theme)));
        }
    }

    let business_id = PermissionService::tenant_id(&ctx)?;
    let settings = BusinessRepository::new(state.db.clone())
        .update_branding(business_id, &req)
        .await?
        .ok_or_else(|| AppError::not_found("Business"))?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            Some(business_id),
            AuditAction::BusinessUpdate,
            Some(business_id),
            Some(json!({ "branding": true })),
            None,
        )
        .await;

    Ok(Json(settings))
}

/// Recent audit activity for one tenant
pub async fn business_activity(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<crate::models::audit::AuditLog>>, AppError> {
    if !ctx.is_superadmin() {
        PermissionService::require_admin(&ctx)?;
        if ctx.business_id != Some(id) {
            return Err(AppError::Forbidden);
        }
    }

    let query = crate::models::audit::AuditLogQuery {
        user_id: None,
        business_id: Some(id),
        action: None,
        resource_type: None,
        start_date: None,
        end_date: None,
        page: 1,
        limit: 50,
    };
    let (entries, _) = crate::repository::AuditRepository::new(state.db.clone())
        .list(&query)
        .await?;

    Ok(Json(entries))
}

/// Per-tenant user count guard data for the superadmin board
pub async fn business_users(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<crate::models::user::UserResponse>>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    let users = UserRepository::new(state.db.clone())
        .list(Some(id), 500, 0)
        .await?;

    Ok(Json(users.into_iter().map(Into::into).collect()))
}
