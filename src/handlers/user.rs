//! User management endpoints

use crate::{
    auth::{middleware::AuthContext, password::PasswordHasher},
    error::AppError,
    middleware::AppState,
    models::user::*,
    repository::UserRepository,
    services::{AuditAction, PermissionService},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use super::Paginated;

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    50
}

pub async fn list_users(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Paginated<UserResponse>>, AppError> {
    PermissionService::require_manager(&ctx)?;

    let repo = UserRepository::new(state.db.clone());
    let offset = (query.page.max(1) - 1) * query.limit;
    let users = repo.list(ctx.business_id, query.limit, offset).await?;
    let total = repo.count(ctx.business_id).await?;

    let items = users.into_iter().map(UserResponse::from).collect();

    Ok(Json(Paginated::new(items, total, query.page, query.limit)))
}

pub async fn get_profile(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<UserResponse>, AppError> {
    let repo = UserRepository::new(state.db.clone());
    let user = repo
        .find_by_id(&ctx.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    Ok(Json(user.into()))
}

pub async fn update_profile(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    req.validate()?;

    let repo = UserRepository::new(state.db.clone());
    let hasher = PasswordHasher::new();

    // Password change requires proving the current one
    if let Some(new_password) = &req.new_password {
        let current = req
            .current_password
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("current_password is required".to_string()))?;

        let user = repo
            .find_by_id(&ctx.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;
        hasher.verify(current, &user.password_hash)?;

        PasswordHasher::validate_password_policy(new_password, &state.config)?;
        let hash = hasher.hash(new_password)?;
        repo.update_password(ctx.user_id, &hash).await?;

        // Password changed, old sessions are no longer valid
        state.auth_service.logout_all(ctx.user_id).await?;
    }

    let user = repo
        .update_profile(
            ctx.user_id,
            req.email.as_deref(),
            req.full_name.as_deref(),
            req.phone.as_deref(),
        )
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    Ok(Json(user.into()))
}

pub async fn create_user(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    PermissionService::require_admin(&ctx)?;

    req.validate()?;
    if !crate::models::user::is_valid_username(&req.username) {
        return Err(AppError::BadRequest(
            "Username may only contain letters, digits, '_', '.' and '-'".to_string(),
        ));
    }
    let role = Role::parse(&req.role)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid role: {}", req.role)))?;
    if !PermissionService::can_manage_role(&ctx, role) {
        return Err(AppError::Forbidden);
    }

    let business_id = PermissionService::scope_for(&ctx, req.business_id)?;
    PasswordHasher::validate_password_policy(&req.password, &state.config)?;

    let repo = UserRepository::new(state.db.clone());
    if repo.username_exists(Some(business_id), &req.username).await? {
        return Err(AppError::Conflict("Username is already taken".to_string()));
    }

    let hash = PasswordHasher::new().hash(&req.password)?;
    let user = repo.create(Some(business_id), &req, &hash).await?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            Some(business_id),
            AuditAction::UserCreate,
            Some(user.id),
            Some(json!({ "username": user.username, "role": user.role })),
            None,
        )
        .await;

    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn get_user(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    PermissionService::require_manager(&ctx)?;

    let repo = UserRepository::new(state.db.clone());
    let user = repo
        .find_by_id(&id)
        .await?
        .filter(|u| ctx.is_superadmin() || u.business_id == ctx.business_id)
        .ok_or_else(|| AppError::not_found("User"))?;

    Ok(Json(user.into()))
}

pub async fn update_user(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    PermissionService::require_admin(&ctx)?;
    req.validate()?;

    if let Some(role_str) = &req.role {
        let role = Role::parse(role_str)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid role: {}", role_str)))?;
        if !PermissionService::can_manage_role(&ctx, role) {
            return Err(AppError::Forbidden);
        }
    }

    let repo = UserRepository::new(state.db.clone());
    let target = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    if !PermissionService::can_manage_role(&ctx, target.role()) {
        return Err(AppError::Forbidden);
    }

    let user = repo
        .update(id, ctx.business_id, &req)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            ctx.business_id,
            AuditAction::UserUpdate,
            Some(id),
            None,
            None,
        )
        .await;

    Ok(Json(user.into()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    PermissionService::require_admin(&ctx)?;

    if id == ctx.user_id {
        return Err(AppError::BadRequest("You cannot delete your own account".to_string()));
    }

    let repo = UserRepository::new(state.db.clone());
    let target = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    if !PermissionService::can_manage_role(&ctx, target.role()) {
        return Err(AppError::Forbidden);
    }

    if !repo.soft_delete(id, ctx.business_id).await? {
        return Err(AppError::not_found("User"));
    }
    state.auth_service.logout_all(id).await?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            ctx.business_id,
            AuditAction::UserDelete,
            Some(id),
            None,
            None,
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn reset_password(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    PermissionService::require_admin(&ctx)?;
    PasswordHasher::validate_password_policy(&req.new_password, &state.config)?;

    let repo = UserRepository::new(state.db.clone());
    let target = repo
        .find_by_id(&id)
        .await?
        .filter(|u| ctx.is_superadmin() || u.business_id == ctx.business_id)
        .ok_or_else(|| AppError::not_found("User"))?;
    if !PermissionService::can_manage_role(&ctx, target.role()) {
        return Err(AppError::Forbidden);
    }

    let hash = PasswordHasher::new().hash(&req.new_password)?;
    repo.update_password(id, &hash).await?;
    state.auth_service.logout_all(id).await?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            ctx.business_id,
            AuditAction::UserPasswordReset,
            Some(id),
            None,
            None,
        )
        .await;

    Ok(Json(json!({ "message": "Password reset" })))
}

pub async fn check_username(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(req): Query<CheckUsernameRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    PermissionService::require_admin(&ctx)?;

    let repo = UserRepository::new(state.db.clone());
    let exists = repo.username_exists(ctx.business_id, &req.username).await?;

    Ok(Json(json!({ "username": req.username, "available": !exists })))
}
