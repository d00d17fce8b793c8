//! Category endpoints

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::category::*,
    repository::CategoryRepository,
    services::{AuditAction, PermissionService},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

pub async fn list_categories(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<Vec<Category>>, AppError> {
    let business_id = PermissionService::tenant_id(&ctx)?;
    let categories = CategoryRepository::new(state.db.clone()).list(business_id).await?;

    Ok(Json(categories))
}

pub async fn get_category(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Category>, AppError> {
    let business_id = PermissionService::tenant_id(&ctx)?;
    let category = CategoryRepository::new(state.db.clone())
        .find_by_id(id, business_id)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))?;

    Ok(Json(category))
}

pub async fn create_category(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    PermissionService::require_manager(&ctx)?;
    req.validate()?;

    let business_id = PermissionService::tenant_id(&ctx)?;
    let category = CategoryRepository::new(state.db.clone())
        .create(business_id, &req)
        .await?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            Some(business_id),
            AuditAction::CategoryCreate,
            Some(category.id),
            None,
            None,
        )
        .await;

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>, AppError> {
    PermissionService::require_manager(&ctx)?;
    req.validate()?;

    let business_id = PermissionService::tenant_id(&ctx)?;
    let category = CategoryRepository::new(state.db.clone())
        .update(id, business_id, &req)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            Some(business_id),
            AuditAction::CategoryUpdate,
            Some(id),
            None,
            None,
        )
        .await;

    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    PermissionService::require_manager(&ctx)?;

    let business_id = PermissionService::tenant_id(&ctx)?;
    let repo = CategoryRepository::new(state.db.clone());

    // A category with live products cannot be removed
    let product_count = repo.product_count(id, business_id).await?;
    if product_count > 0 {
        return Err(AppError::Conflict(format!(
            "Category still has {} products",
            product_count
        )));
    }

    if !repo.soft_delete(id, business_id).await? {
        return Err(AppError::not_found("Category"));
    }

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            Some(business_id),
            AuditAction::CategoryDelete,
            Some(id),
            None,
            None,
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}
