//! Customer endpoints

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::customer::*,
    repository::CustomerRepository,
    services::{AuditAction, PermissionService},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

pub async fn list_customers(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<Vec<Customer>>, AppError> {
    let business_id = PermissionService::tenant_id(&ctx)?;
    let customers = CustomerRepository::new(state.db.clone()).list(business_id).await?;

    Ok(Json(customers))
}

pub async fn get_customer(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Customer>, AppError> {
    let business_id = PermissionService::tenant_id(&ctx)?;
    let customer = CustomerRepository::new(state.db.clone())
        .find_by_id(id, business_id)
        .await?
        .ok_or_else(|| AppError::not_found("Customer"))?;

    Ok(Json(customer))
}

pub async fn create_customer(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(req): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<Customer>), AppError> {
    req.validate()?;

    let business_id = PermissionService::tenant_id(&ctx)?;
    let customer = CustomerRepository::new(state.db.clone())
        .create(business_id, &req)
        .await?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            Some(business_id),
            AuditAction::CustomerCreate,
            Some(customer.id),
            None,
            None,
        )
        .await;

    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn update_customer(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCustomerRequest>,
) -> Result<Json<Customer>, AppError> {
    req.validate()?;

    let business_id = PermissionService::tenant_id(&ctx)?;
    let customer = CustomerRepository::new(state.db.clone())
        .update(id, business_id, &req)
        .await?
        .ok_or_else(|| AppError::not_found("Customer"))?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            Some(business_id),
            AuditAction::CustomerUpdate,
            Some(id),
            None,
            None,
        )
        .await;

    Ok(Json(customer))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    PermissionService::require_manager(&ctx)?;

    let business_id = PermissionService::tenant_id(&ctx)?;
    if !CustomerRepository::new(state.db.clone())
        .soft_delete(id, business_id)
        .await?
    {
        return Err(AppError::not_found("Customer"));
    }

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            Some(business_id),
            AuditAction::CustomerDelete,
            Some(id),
            None,
            None,
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Typeahead search by name or phone prefix
pub async fn search_customers(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<CustomerSearchQuery>,
) -> Result<Json<Vec<Customer>>, AppError> {
    let business_id = PermissionService::tenant_id(&ctx)?;

    let term = query.q.trim();
    if term.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let customers = CustomerRepository::new(state.db.clone())
        .search(business_id, term)
        .await?;

    Ok(Json(customers))
}

pub async fn adjust_loyalty_points(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<LoyaltyAdjustRequest>,
) -> Result<Json<Customer>, AppError> {
    PermissionService::require_manager(&ctx)?;

    let business_id = PermissionService::tenant_id(&ctx)?;
    let customer = CustomerRepository::new(state.db.clone())
        .adjust_loyalty_points(id, business_id, req.points)
        .await?
        .ok_or_else(|| AppError::not_found("Customer"))?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            Some(business_id),
            AuditAction::CustomerUpdate,
            Some(id),
            Some(serde_json::json!({ "loyalty_delta": req.points, "reason": req.reason })),
            None,
        )
        .await;

    Ok(Json(customer))
}
