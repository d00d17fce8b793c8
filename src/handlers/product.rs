//! Product endpoints

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::product::*,
    repository::ProductRepository,
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

pub async fn list_products(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<Paginated<ProductWithCategory>>, AppError> {
    let business_id = PermissionService::tenant_id(&ctx)?;
    let (items, total) = ProductRepository::new(state.db.clone())
        .list(business_id, &query)
        .await?;

    Ok(Json(Paginated::new(items, total, query.page, query.limit)))
}

pub async fn get_product(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    let business_id = PermissionService::tenant_id(&ctx)?;
    let product = ProductRepository::new(state.db.clone())
        .find_by_id(id, business_id)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;

    Ok(Json(product))
}

pub async fn create_product(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    PermissionService::require_manager(&ctx)?;
    req.validate()?;

    let business_id = PermissionService::tenant_id(&ctx)?;
    let sku = match req.sku.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(sku) => sku.to_string(),
        None => ProductRepository::generate_sku(),
    };

    let product = ProductRepository::new(state.db.clone())
        .create(business_id, &req, &sku)
        .await?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            Some(business_id),
            AuditAction::ProductCreate,
            Some(product.id),
            Some(json!({ "name": product.name, "sku": product.sku })),
            None,
        )
        .await;

    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<Product>, AppError> {
    PermissionService::require_manager(&ctx)?;
    req.validate()?;

    let business_id = PermissionService::tenant_id(&ctx)?;
    let product = ProductRepository::new(state.db.clone())
        .update(id, business_id, &req)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            Some(business_id),
            AuditAction::ProductUpdate,
            Some(id),
            None,
            None,
        )
        .await;

    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    PermissionService::require_manager(&ctx)?;

    let business_id = PermissionService::tenant_id(&ctx)?;
    if !ProductRepository::new(state.db.clone())
        .soft_delete(id, business_id)
        .await?
    {
        return Err(AppError::not_found("Product"));
    }

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            Some(business_id),
            AuditAction::ProductDelete,
            Some(id),
            None,
            None,
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_product(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    PermissionService::require_admin(&ctx)?;

    let business_id = PermissionService::tenant_id(&ctx)?;
    if !ProductRepository::new(state.db.clone())
        .restore(id, business_id)
        .await?
    {
        return Err(AppError::not_found("Product"));
    }

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            Some(business_id),
            AuditAction::ProductRestore,
            Some(id),
            None,
            None,
        )
        .await;

    Ok(Json(json!({ "message": "Product restored" })))
}

pub async fn low_stock(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<Vec<ProductWithCategory>>, AppError> {
    let business_id = PermissionService::tenant_id(&ctx)?;
    let products = ProductRepository::new(state.db.clone())
        .low_stock(business_id)
        .await?;

    Ok(Json(products))
}
