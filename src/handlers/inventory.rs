//! Inventory endpoints: stock status, manual adjustments and movement
//! history.

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::inventory::*,
    repository::InventoryRepository,
    services::{AuditAction, PermissionService},
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::Row;
use uuid::Uuid;
use validator::Validate;

use super::Paginated;

pub async fn stock_status(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<Vec<StockStatusRow>>, AppError> {
    let business_id = PermissionService::tenant_id(&ctx)?;
    let rows = InventoryRepository::new(state.db.clone())
        .stock_status(business_id)
        .await?;

    Ok(Json(rows))
}

/// Manual stock adjustment. Runs in a transaction so the product row,
/// the movement record and the audit trail stay consistent; stock can
/// never go negative.
pub async fn adjust_stock(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(product_id): Path<Uuid>,
    Json(req): Json<StockAdjustRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    PermissionService::require_manager(&ctx)?;
    req.validate()?;

    if req.quantity_change == 0 {
        return Err(AppError::BadRequest("quantity_change must not be zero".to_string()));
    }

    let business_id = PermissionService::tenant_id(&ctx)?;

    let mut tx = state.db.begin().await?;

    let product = sqlx::query(
        r#"
        SELECT name, stock_quantity FROM products
        WHERE id = $1 AND business_id = $2 AND NOT is_deleted
        FOR UPDATE
        "#,
    )
    .bind(product_id)
    .bind(business_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found("Product"))?;

    let previous: i32 = product.get("stock_quantity");
    let new_quantity = previous + req.quantity_change;
    if new_quantity < 0 {
        return Err(AppError::Conflict(format!(
            "Adjustment would make stock negative ({} available)",
            previous
        )));
    }

    sqlx::query(
        "UPDATE products SET stock_quantity = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(product_id)
    .bind(new_quantity)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO inventory_transactions
            (business_id, product_id, user_id, transaction_type,
             quantity_change, previous_quantity, new_quantity, notes)
        VALUES ($1, $2, $3, 'adjustment', $4, $5, $6, $7)
        "#,
    )
    .bind(business_id)
    .bind(product_id)
    .bind(ctx.user_id)
    .bind(req.quantity_change)
    .bind(previous)
    .bind(new_quantity)
    .bind(&req.reason)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            Some(business_id),
            AuditAction::StockAdjust,
            Some(product_id),
            Some(json!({
                "quantity_change": req.quantity_change,
                "reason": req.reason,
            })),
            None,
        )
        .await;

    Ok(Json(json!({
        "product_id": product_id,
        "previous_quantity": previous,
        "new_quantity": new_quantity,
    })))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<Paginated<TransactionRow>>, AppError> {
    let business_id = PermissionService::tenant_id(&ctx)?;
    let (items, total) = InventoryRepository::new(state.db.clone())
        .list_transactions(business_id, &query)
        .await?;

    Ok(Json(Paginated::new(items, total, query.page, query.limit)))
}

#[derive(Debug, Deserialize)]
pub struct ValueReportQuery {
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
}

pub async fn value_report(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<ValueReportQuery>,
) -> Result<Json<InventoryValueReport>, AppError> {
    PermissionService::require_manager(&ctx)?;

    let business_id = PermissionService::tenant_id(&ctx)?;
    let report = InventoryRepository::new(state.db.clone())
        .value_report(business_id, query.start_date, query.end_date)
        .await?;

    Ok(Json(report))
}
