//! Damaged product endpoints.
//! Reporting damage removes the quantity from stock and records the
//! movement in the same transaction.

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::damaged::*,
    repository::DamagedRepository,
    services::{AuditAction, PermissionService},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use sqlx::Row;
use uuid::Uuid;
use validator::Validate;

pub async fn list_damaged(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<DamageListQuery>,
) -> Result<Json<Vec<DamagedProductRow>>, AppError> {
    let business_id = PermissionService::tenant_id(&ctx)?;
    let rows = DamagedRepository::new(state.db.clone())
        .list(business_id, &query)
        .await?;

    Ok(Json(rows))
}

pub async fn get_damaged(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<DamagedProduct>, AppError> {
    let business_id = PermissionService::tenant_id(&ctx)?;
    let damaged = DamagedRepository::new(state.db.clone())
        .find_by_id(id, business_id)
        .await?
        .ok_or_else(|| AppError::not_found("Damage report"))?;

    Ok(Json(damaged))
}

pub async fn report_damage(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(req): Json<ReportDamageRequest>,
) -> Result<(StatusCode, Json<DamagedProduct>), AppError> {
    req.validate()?;

    let business_id = PermissionService::tenant_id(&ctx)?;

    let mut tx = state.db.begin().await?;

    let product = sqlx::query(
        r#"
        SELECT name, cost_price, stock_quantity FROM products
        WHERE id = $1 AND business_id = $2 AND NOT is_deleted
        FOR UPDATE
        "#,
    )
    .bind(req.product_id)
    .bind(business_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found("Product"))?;

    let stock: i32 = product.get("stock_quantity");
    if stock < req.quantity {
        return Err(AppError::Conflict(format!(
            "Cannot write off {} units, only {} in stock",
            req.quantity, stock
        )));
    }

    let cost_price: f64 = product.get("cost_price");
    let estimated_loss = req
        .estimated_loss
        .unwrap_or(cost_price * req.quantity as f64);
    if estimated_loss < 0.0 {
        return Err(AppError::BadRequest("estimated_loss must not be negative".to_string()));
    }

    let damaged = sqlx::query_as::<_, DamagedProduct>(
        r#"
        INSERT INTO damaged_products
            (business_id, product_id, user_id, quantity, reason, estimated_loss)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(business_id)
    .bind(req.product_id)
    .bind(ctx.user_id)
    .bind(req.quantity)
    .bind(&req.reason)
    .bind(estimated_loss)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(req.product_id)
    .bind(req.quantity)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO inventory_transactions
            (business_id, product_id, user_id, transaction_type,
             quantity_change, previous_quantity, new_quantity, reference_id, notes)
        VALUES ($1, $2, $3, 'damage', $4, $5, $6, $7, $8)
        "#,
    )
    .bind(business_id)
    .bind(req.product_id)
    .bind(ctx.user_id)
    .bind(-req.quantity)
    .bind(stock)
    .bind(stock - req.quantity)
    .bind(damaged.id)
    .bind(&req.reason)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            Some(business_id),
            AuditAction::DamageReport,
            Some(damaged.id),
            Some(json!({
                "product_id": req.product_id,
                "quantity": req.quantity,
                "estimated_loss": estimated_loss,
            })),
            None,
        )
        .await;

    Ok((StatusCode::CREATED, Json(damaged)))
}

pub async fn update_damage(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateDamageRequest>,
) -> Result<Json<DamagedProduct>, AppError> {
    PermissionService::require_manager(&ctx)?;
    req.validate()?;

    if let Some(status) = &req.status {
        if !["reported", "written_off", "recovered"].contains(&status.as_str()) {
            return Err(AppError::BadRequest(format!("Invalid status: {}", status)));
        }
    }

    let business_id = PermissionService::tenant_id(&ctx)?;

    let mut tx = state.db.begin().await?;

    let current = sqlx::query_as::<_, DamagedProduct>(
        r#"
        SELECT * FROM damaged_products
        WHERE id = $1 AND business_id = $2 AND NOT is_deleted
        FOR UPDATE
        "#,
    )
    .bind(id)
    .bind(business_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found("Damage report"))?;

    // A changed quantity moves the difference in or out of stock
    if let Some(new_quantity) = req.quantity {
        let delta = new_quantity - current.quantity;
        if delta != 0 {
            let stock: i32 = sqlx::query_scalar(
                r#"
                SELECT stock_quantity FROM products
                WHERE id = $1 AND business_id = $2 AND NOT is_deleted
                FOR UPDATE
                "#,
            )
            .bind(current.product_id)
            .bind(business_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))?;

            if delta > 0 && stock < delta {
                return Err(AppError::Conflict(format!(
                    "Cannot write off {} more units, only {} in stock",
                    delta, stock
                )));
            }

            sqlx::query(
                "UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(current.product_id)
            .bind(delta)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO inventory_transactions
                    (business_id, product_id, user_id, transaction_type,
                     quantity_change, previous_quantity, new_quantity, reference_id, notes)
                VALUES ($1, $2, $3, 'damage', $4, $5, $6, $7, 'Damage report quantity changed')
                "#,
            )
            .bind(business_id)
            .bind(current.product_id)
            .bind(ctx.user_id)
            .bind(-delta)
            .bind(stock)
            .bind(stock - delta)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }
    }

    let damaged = sqlx::query_as::<_, DamagedProduct>(
        r#"
        UPDATE damaged_products
        SET
            quantity = COALESCE($3, quantity),
            reason = COALESCE($4, reason),
            estimated_loss = COALESCE($5, estimated_loss),
            status = COALESCE($6, status),
            updated_at = NOW()
        WHERE id = $1 AND business_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(business_id)
    .bind(req.quantity)
    .bind(&req.reason)
    .bind(req.estimated_loss)
    .bind(&req.status)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(damaged))
}

pub async fn delete_damage(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    PermissionService::require_manager(&ctx)?;

    let business_id = PermissionService::tenant_id(&ctx)?;

    let mut tx = state.db.begin().await?;

    let damaged = sqlx::query_as::<_, DamagedProduct>(
        r#"
        SELECT * FROM damaged_products
        WHERE id = $1 AND business_id = $2 AND NOT is_deleted
        FOR UPDATE
        "#,
    )
    .bind(id)
    .bind(business_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found("Damage report"))?;

    // Retracting the report returns the written-off units to stock
    let stock: Option<i32> = sqlx::query_scalar(
        r#"
        SELECT stock_quantity FROM products
        WHERE id = $1 AND business_id = $2 AND NOT is_deleted
        FOR UPDATE
        "#,
    )
    .bind(damaged.product_id)
    .bind(business_id)
    .fetch_optional(&mut *tx)
    .await?;

    if let Some(stock) = stock {
        sqlx::query(
            "UPDATE products SET stock_quantity = stock_quantity + $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(damaged.product_id)
        .bind(damaged.quantity)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO inventory_transactions
                (business_id, product_id, user_id, transaction_type,
                 quantity_change, previous_quantity, new_quantity, reference_id, notes)
            VALUES ($1, $2, $3, 'adjustment', $4, $5, $6, $7, 'Damage report retracted')
            "#,
        )
        .bind(business_id)
        .bind(damaged.product_id)
        .bind(ctx.user_id)
        .bind(damaged.quantity)
        .bind(stock)
        .bind(stock + damaged.quantity)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query(
        "UPDATE damaged_products SET is_deleted = TRUE, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn damage_summary(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<DamageSummary>, AppError> {
    PermissionService::require_manager(&ctx)?;

    let business_id = PermissionService::tenant_id(&ctx)?;
    let summary = DamagedRepository::new(state.db.clone())
        .summary(business_id)
        .await?;

    Ok(Json(summary))
}
