//! Billing lifecycle integration tests: bill generation, payment and
//! the overdue/grace/suspension sweep.

use chrono::{Duration, NaiveDate, Utc};
use retail_system::{
    error::AppError,
    models::billing::{GenerateBillRequest, UpdateDueDateRequest},
    repository::BillingRepository,
    services::BillingService,
};
use serial_test::serial;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

mod common;
use common::{create_test_business, create_test_user, setup_test_db};

struct BillingFixture {
    pool: PgPool,
    service: BillingService,
    business_id: Uuid,
    superadmin_id: Uuid,
}

async fn setup() -> BillingFixture {
    let config = common::create_test_config();
    let pool = setup_test_db(&config).await;

    let business_id = create_test_business(&pool, "Billing Test Shop").await;
    let superadmin_id =
        create_test_user(&pool, None, "billingadmin", "StrongPass1", "superadmin").await;

    BillingFixture {
        service: BillingService::new(pool.clone(), Arc::new(config)),
        pool,
        business_id,
        superadmin_id,
    }
}

async fn payment_status(pool: &PgPool, business_id: Uuid) -> String {
    sqlx::query_scalar("SELECT payment_status FROM businesses WHERE id = $1")
        .bind(business_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
#[serial]
async fn test_generate_bill_once_per_month() {
    let fx = setup().await;

    let month = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    let req = GenerateBillRequest {
        billing_month: Some(month),
    };

    let bill = fx.service.generate_bill(fx.business_id, &req).await.unwrap();
    assert_eq!(bill.billing_month, month);
    assert_eq!(bill.base_fee, 50.0);
    assert_eq!(bill.status, "pending");
    // due day comes from config (5th of the billed month)
    assert_eq!(bill.due_date, NaiveDate::from_ymd_opt(2026, 3, 5).unwrap());

    let err = fx.service.generate_bill(fx.business_id, &req).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
#[serial]
async fn test_generate_monthly_bills_skips_suspended() {
    let fx = setup().await;
    let suspended = create_test_business(&fx.pool, "Suspended Shop").await;
    sqlx::query("UPDATE businesses SET payment_status = 'suspended' WHERE id = $1")
        .bind(suspended)
        .execute(&fx.pool)
        .await
        .unwrap();

    let created = fx.service.generate_monthly_bills().await.unwrap();
    assert_eq!(created, 1);

    // idempotent for the same month
    let again = fx.service.generate_monthly_bills().await.unwrap();
    assert_eq!(again, 0);
}

#[tokio::test]
#[serial]
async fn test_pay_bill_reactivates_suspended_business() {
    let fx = setup().await;

    let bill = fx
        .service
        .generate_bill(
            fx.business_id,
            &GenerateBillRequest {
                billing_month: None,
            },
        )
        .await
        .unwrap();

    fx.service
        .suspend(fx.business_id, Some("non-payment"), fx.superadmin_id)
        .await
        .unwrap();
    assert_eq!(payment_status(&fx.pool, fx.business_id).await, "suspended");

    let paid = fx.service.pay_bill(bill.id, fx.superadmin_id).await.unwrap();
    assert_eq!(paid.status, "paid");
    assert!(paid.paid_at.is_some());
    assert_eq!(payment_status(&fx.pool, fx.business_id).await, "active");

    // paying a settled bill is a conflict
    let err = fx.service.pay_bill(bill.id, fx.superadmin_id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let notices = BillingRepository::new(fx.pool.clone())
        .suspension_notifications(fx.business_id)
        .await
        .unwrap();
    assert!(notices
        .iter()
        .any(|n| n.notification_type == "reactivation_notice"));
}

#[tokio::test]
#[serial]
async fn test_suspend_logs_transition_and_notifies() {
    let fx = setup().await;

    fx.service
        .suspend(fx.business_id, Some("fraud review"), fx.superadmin_id)
        .await
        .unwrap();

    let repo = BillingRepository::new(fx.pool.clone());
    let history = repo.status_history(fx.business_id).await.unwrap();
    assert_eq!(history[0].status_from, "active");
    assert_eq!(history[0].status_to, "suspended");
    assert_eq!(history[0].triggered_by, "manual");
    assert_eq!(history[0].triggered_by_user_id, Some(fx.superadmin_id));

    let notices = repo.suspension_notifications(fx.business_id).await.unwrap();
    assert_eq!(notices[0].notification_type, "suspension_notice");

    // suspending twice is a conflict
    let err = fx
        .service
        .suspend(fx.business_id, None, fx.superadmin_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
#[serial]
async fn test_update_due_date_validates_grace_window() {
    let fx = setup().await;

    let err = fx
        .service
        .update_due_date(
            fx.business_id,
            &UpdateDueDateRequest {
                next_payment_due_date: None,
                grace_period_days: Some(120),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    fx.service
        .update_due_date(
            fx.business_id,
            &UpdateDueDateRequest {
                next_payment_due_date: Some(Utc::now().date_naive() + Duration::days(14)),
                grace_period_days: Some(10),
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
#[serial]
async fn test_sweep_moves_overdue_business_into_grace() {
    let fx = setup().await;

    let past_due = Utc::now().date_naive() - Duration::days(3);
    sqlx::query("UPDATE businesses SET next_payment_due_date = $2 WHERE id = $1")
        .bind(fx.business_id)
        .bind(past_due)
        .execute(&fx.pool)
        .await
        .unwrap();

    let outcome = fx.service.run_payment_sweep().await.unwrap();
    assert_eq!(outcome.businesses_moved_to_grace, 1);
    assert_eq!(outcome.businesses_suspended, 0);
    assert_eq!(payment_status(&fx.pool, fx.business_id).await, "grace_period");

    // grace window is due date plus the configured grace days
    let end: Option<NaiveDate> =
        sqlx::query_scalar("SELECT grace_period_end_date FROM businesses WHERE id = $1")
            .bind(fx.business_id)
            .fetch_one(&fx.pool)
            .await
            .unwrap();
    assert_eq!(end, Some(past_due + Duration::days(7)));

    let notices = BillingRepository::new(fx.pool.clone())
        .suspension_notifications(fx.business_id)
        .await
        .unwrap();
    assert!(notices.iter().any(|n| n.notification_type == "warning"));
}

#[tokio::test]
#[serial]
async fn test_sweep_suspends_business_past_grace() {
    let fx = setup().await;

    let today = Utc::now().date_naive();
    sqlx::query(
        r#"
        UPDATE businesses
        SET payment_status = 'grace_period',
            next_payment_due_date = $2,
            grace_period_end_date = $3
        WHERE id = $1
        "#,
    )
    .bind(fx.business_id)
    .bind(today - Duration::days(12))
    .bind(today - Duration::days(2))
    .execute(&fx.pool)
    .await
    .unwrap();

    let outcome = fx.service.run_payment_sweep().await.unwrap();
    assert_eq!(outcome.businesses_suspended, 1);
    assert_eq!(payment_status(&fx.pool, fx.business_id).await, "suspended");

    let history = BillingRepository::new(fx.pool.clone())
        .status_history(fx.business_id)
        .await
        .unwrap();
    assert_eq!(history[0].status_to, "suspended");
    assert_eq!(history[0].triggered_by, "automatic");
}

#[tokio::test]
#[serial]
async fn test_sweep_marks_pending_bills_overdue() {
    let fx = setup().await;

    let last_month = Utc::now().date_naive() - Duration::days(40);
    fx.service
        .generate_bill(
            fx.business_id,
            &GenerateBillRequest {
                billing_month: Some(last_month),
            },
        )
        .await
        .unwrap();

    let outcome = fx.service.run_payment_sweep().await.unwrap();
    assert_eq!(outcome.bills_marked_overdue, 1);

    let status: String =
        sqlx::query_scalar("SELECT status FROM monthly_bills WHERE business_id = $1")
            .bind(fx.business_id)
            .fetch_one(&fx.pool)
            .await
            .unwrap();
    assert_eq!(status, "overdue");
}
