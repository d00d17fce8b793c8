//! Sale endpoints, including the credit-payment ledger and reports

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::sale::*,
    repository::SaleRepository,
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

pub async fn list_sales(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<SaleListQuery>,
) -> Result<Json<Paginated<SaleListRow>>, AppError> {
    let business_id = PermissionService::tenant_id(&ctx)?;
    let (items, total) = SaleRepository::new(state.db.clone())
        .list(business_id, &query)
        .await?;

    Ok(Json(Paginated::new(items, total, query.page, query.limit)))
}

pub async fn get_sale(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<SaleDetail>, AppError> {
    let business_id = PermissionService::tenant_id(&ctx)?;
    let detail = state
        .sale_service
        .detail(id, business_id)
        .await?
        .ok_or_else(|| AppError::not_found("Sale"))?;

    Ok(Json(detail))
}

pub async fn create_sale(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(req): Json<CreateSaleRequest>,
) -> Result<(StatusCode, Json<SaleDetail>), AppError> {
    req.validate()?;

    let business_id = PermissionService::tenant_id(&ctx)?;
    let detail = state
        .sale_service
        .create_sale(business_id, ctx.user_id, &req)
        .await?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            Some(business_id),
            AuditAction::SaleCreate,
            Some(detail.sale.id),
            Some(json!({
                "total_amount": detail.sale.total_amount,
                "payment_method": detail.sale.payment_method,
                "status": detail.sale.status,
            })),
            None,
        )
        .await;

    Ok((StatusCode::CREATED, Json(detail)))
}

/// Record a payment against an open credit sale
pub async fn record_payment(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<SalePaymentRequest>,
) -> Result<Json<SaleDetail>, AppError> {
    req.validate()?;

    let business_id = PermissionService::tenant_id(&ctx)?;
    let detail = state
        .sale_service
        .record_payment(id, business_id, ctx.user_id, &req)
        .await?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            Some(business_id),
            AuditAction::SalePayment,
            Some(id),
            Some(json!({ "amount": req.amount })),
            None,
        )
        .await;

    Ok(Json(detail))
}

pub async fn refund_sale(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<SaleDetail>, AppError> {
    PermissionService::require_manager(&ctx)?;

    let business_id = PermissionService::tenant_id(&ctx)?;
    let detail = state
        .sale_service
        .refund_sale(id, business_id, ctx.user_id)
        .await?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            Some(business_id),
            AuditAction::SaleRefund,
            Some(id),
            None,
            None,
        )
        .await;

    Ok(Json(detail))
}

pub async fn sales_report(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<SaleReportQuery>,
) -> Result<Json<SaleReport>, AppError> {
    PermissionService::require_manager(&ctx)?;

    let business_id = PermissionService::tenant_id(&ctx)?;
    let report = state.sale_service.report(business_id, &query).await?;

    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct TopProductsQuery {
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
    #[serde(default = "default_top_limit")]
    pub limit: i64,
}

fn default_top_limit() -> i64 {
    10
}

pub async fn top_products(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<TopProductsQuery>,
) -> Result<Json<Vec<TopProductRow>>, AppError> {
    PermissionService::require_manager(&ctx)?;

    let business_id = PermissionService::tenant_id(&ctx)?;
    let rows = SaleRepository::new(state.db.clone())
        .top_products(
            business_id,
            query.start_date,
            query.end_date,
            query.limit.clamp(1, 100),
        )
        .await?;

    Ok(Json(rows))
}

/// Open credit sales with running balances
pub async fn credit_report(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<Vec<CreditSaleRow>>, AppError> {
    let business_id = PermissionService::tenant_id(&ctx)?;
    let rows = SaleRepository::new(state.db.clone())
        .credit_report(business_id)
        .await?;

    Ok(Json(rows))
}
