//! Subscription billing endpoints.
//! The payment board, bill generation and the suspend/reactivate levers
//! are superadmin-only; tenants see their own bills and suspension
//! notices.

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::billing::*,
    repository::BillingRepository,
    services::{AuditAction, PermissionService},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use super::Paginated;

pub async fn payment_overview(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<PaymentStatusQuery>,
) -> Result<Json<Paginated<BusinessPaymentRow>>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    let (items, total) = BillingRepository::new(state.db.clone())
        .payment_overview(&query)
        .await?;

    Ok(Json(Paginated::new(items, total, query.page, query.limit)))
}

pub async fn payment_summary(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<PaymentSummary>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    let summary = BillingRepository::new(state.db.clone())
        .payment_summary()
        .await?;

    Ok(Json(summary))
}

pub async fn generate_bill(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(business_id): Path<Uuid>,
    Json(req): Json<GenerateBillRequest>,
) -> Result<(StatusCode, Json<MonthlyBill>), AppError> {
    PermissionService::require_superadmin(&ctx)?;

    let bill = state.billing_service.generate_bill(business_id, &req).await?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            None,
            AuditAction::BillGenerate,
            Some(bill.id),
            Some(json!({ "business_id": business_id, "billing_month": bill.billing_month })),
            None,
        )
        .await;

    Ok((StatusCode::CREATED, Json(bill)))
}

/// Batch generation for the current month across all billable tenants
pub async fn generate_monthly_bills(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<serde_json::Value>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    let created = state.billing_service.generate_monthly_bills().await?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            None,
            AuditAction::BillGenerate,
            None,
            Some(json!({ "bills_created": created })),
            None,
        )
        .await;

    Ok(Json(json!({ "bills_created": created })))
}

pub async fn list_bills(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(business_id): Path<Uuid>,
) -> Result<Json<Vec<MonthlyBill>>, AppError> {
    if !ctx.is_superadmin() {
        PermissionService::require_admin(&ctx)?;
        if ctx.business_id != Some(business_id) {
            return Err(AppError::Forbidden);
        }
    }

    let bills = BillingRepository::new(state.db.clone())
        .bills_for_business(business_id)
        .await?;

    Ok(Json(bills))
}

pub async fn pay_bill(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(bill_id): Path<Uuid>,
) -> Result<Json<MonthlyBill>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    let bill = state.billing_service.pay_bill(bill_id, ctx.user_id).await?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            None,
            AuditAction::BillPay,
            Some(bill.id),
            Some(json!({ "business_id": bill.business_id, "amount": bill.total_amount })),
            None,
        )
        .await;

    Ok(Json(bill))
}

pub async fn suspend_business(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(business_id): Path<Uuid>,
    Json(req): Json<SuspendRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    state
        .billing_service
        .suspend(business_id, req.reason.as_deref(), ctx.user_id)
        .await?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            None,
            AuditAction::BusinessSuspend,
            Some(business_id),
            Some(json!({ "reason": req.reason })),
            None,
        )
        .await;

    Ok(Json(json!({ "id": business_id, "payment_status": "suspended" })))
}

pub async fn reactivate_business(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(business_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    state.billing_service.reactivate(business_id, ctx.user_id).await?;

    state
        .audit_service
        .log(
            Some(ctx.user_id),
            None,
            AuditAction::BusinessReactivate,
            Some(business_id),
            None,
            None,
        )
        .await;

    Ok(Json(json!({ "id": business_id, "payment_status": "active" })))
}

pub async fn update_due_date(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(business_id): Path<Uuid>,
    Json(req): Json<UpdateDueDateRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    state.billing_service.update_due_date(business_id, &req).await?;

    Ok(Json(json!({
        "id": business_id,
        "next_payment_due_date": req.next_payment_due_date,
        "grace_period_days": req.grace_period_days,
    })))
}

pub async fn status_history(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(business_id): Path<Uuid>,
) -> Result<Json<Vec<PaymentStatusLogEntry>>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    let entries = BillingRepository::new(state.db.clone())
        .status_history(business_id)
        .await?;

    Ok(Json(entries))
}

/// Manual trigger for the overdue/grace/suspension sweep
pub async fn run_payment_sweep(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<SweepOutcome>, AppError> {
    PermissionService::require_superadmin(&ctx)?;

    let outcome = state.billing_service.run_payment_sweep().await?;

    Ok(Json(outcome))
}

/// Billing notices for the caller's own tenant
pub async fn my_suspension_notices(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<Vec<SuspensionNotification>>, AppError> {
    PermissionService::require_admin(&ctx)?;

    let business_id = PermissionService::tenant_id(&ctx)?;
    let notices = BillingRepository::new(state.db.clone())
        .suspension_notifications(business_id)
        .await?;

    Ok(Json(notices))
}

pub async fn mark_suspension_notice_read(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    PermissionService::require_admin(&ctx)?;

    let business_id = PermissionService::tenant_id(&ctx)?;
    if !BillingRepository::new(state.db.clone())
        .mark_suspension_notification_read(id, business_id)
        .await?
    {
        return Err(AppError::not_found("Notification"));
    }

    Ok(StatusCode::NO_CONTENT)
}
