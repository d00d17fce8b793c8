//! Superadmin platform API integration tests

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use serial_test::serial;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

mod common;
use common::{
    create_test_business, create_test_state, create_test_user, setup_test_db,
};

struct AdminApp {
    app: Router,
    pool: PgPool,
    business_id: Uuid,
}

async fn admin_app() -> AdminApp {
    let config = common::create_test_config();
    let pool = setup_test_db(&config).await;

    let business_id = create_test_business(&pool, "Analytics Mart").await;
    create_test_user(&pool, None, "platform", "StrongPass1", "superadmin").await;
    create_test_user(&pool, Some(business_id), "shopadmin", "StrongPass1", "admin").await;

    let state = create_test_state(pool.clone()).await;
    AdminApp {
        app: retail_system::routes::create_router(state),
        pool,
        business_id,
    }
}

async fn login(app: &Router, username: &str) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "identifier": username, "password": "StrongPass1" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    json["access_token"].as_str().unwrap().to_string()
}

async fn get_json(app: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn post_json(app: &Router, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn seed_sale(pool: &PgPool, business_id: Uuid, user: &str, amount: f64) {
    let user_id: Uuid =
        sqlx::query_scalar("SELECT id FROM users WHERE username = $1")
            .bind(user)
            .fetch_one(pool)
            .await
            .unwrap();

    sqlx::query(
        r#"
        INSERT INTO sales (business_id, user_id, total_amount, amount_paid, payment_method, status)
        VALUES ($1, $2, $3, $3, 'cash', 'paid')
        "#,
    )
    .bind(business_id)
    .bind(user_id)
    .bind(amount)
    .execute(pool)
    .await
    .unwrap();
}

#[tokio::test]
#[serial]
async fn test_admin_endpoints_reject_tenant_admin() {
    let fixture = admin_app().await;
    let token = login(&fixture.app, "shopadmin").await;

    for uri in [
        "/api/v1/admin/dashboard",
        "/api/v1/admin/analytics/sales",
        "/api/v1/admin/analytics/users",
        "/api/v1/admin/analytics/products",
        "/api/v1/admin/audit-logs",
    ] {
        let (status, _) = get_json(&fixture.app, uri, &token).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "expected 403 for {}", uri);
    }
}

#[tokio::test]
#[serial]
async fn test_platform_dashboard_counts() {
    let fixture = admin_app().await;
    seed_sale(&fixture.pool, fixture.business_id, "shopadmin", 120.0).await;

    let token = login(&fixture.app, "platform").await;
    let (status, json) = get_json(&fixture.app, "/api/v1/admin/dashboard", &token).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["businesses_total"], 1);
    assert_eq!(json["businesses_active"], 1);
    assert_eq!(json["total_users"], 2);
    assert_eq!(json["sales_last_30_days"], 1);
    assert!((json["sales_revenue_last_30_days"].as_f64().unwrap() - 120.0).abs() < 0.001);
}

#[tokio::test]
#[serial]
async fn test_sales_analytics_ranks_businesses() {
    let fixture = admin_app().await;
    seed_sale(&fixture.pool, fixture.business_id, "shopadmin", 80.0).await;
    seed_sale(&fixture.pool, fixture.business_id, "shopadmin", 20.0).await;

    let token = login(&fixture.app, "platform").await;
    let (status, json) =
        get_json(&fixture.app, "/api/v1/admin/analytics/sales?months=3", &token).await;

    assert_eq!(status, StatusCode::OK);

    let trend = json["trend"].as_array().unwrap();
    assert_eq!(trend.len(), 1);
    assert_eq!(trend[0]["sale_count"], 2);

    let ranking = json["ranking"].as_array().unwrap();
    assert_eq!(ranking[0]["name"], "Analytics Mart");
    assert!((ranking[0]["revenue"].as_f64().unwrap() - 100.0).abs() < 0.001);
}

#[tokio::test]
#[serial]
async fn test_user_analytics_role_distribution() {
    let fixture = admin_app().await;
    create_test_user(
        &fixture.pool,
        Some(fixture.business_id),
        "tillworker",
        "StrongPass1",
        "cashier",
    )
    .await;

    let token = login(&fixture.app, "platform").await;
    let (status, json) = get_json(&fixture.app, "/api/v1/admin/analytics/users", &token).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_users"], 3);
    assert_eq!(json["active_users"], 3);

    let roles: Vec<&str> = json["role_distribution"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["role"].as_str().unwrap())
        .collect();
    assert!(roles.contains(&"superadmin"));
    assert!(roles.contains(&"admin"));
    assert!(roles.contains(&"cashier"));
}

#[tokio::test]
#[serial]
async fn test_product_analytics_counts_low_stock() {
    let fixture = admin_app().await;
    common::create_test_product(&fixture.pool, fixture.business_id, "Full Shelf", 10.0, 50).await;
    let low = common::create_test_product(&fixture.pool, fixture.business_id, "Thin Shelf", 10.0, 1)
        .await;
    sqlx::query("UPDATE products SET min_stock_level = 5 WHERE id = $1")
        .bind(low)
        .execute(&fixture.pool)
        .await
        .unwrap();

    let token = login(&fixture.app, "platform").await;
    let (status, json) =
        get_json(&fixture.app, "/api/v1/admin/analytics/products", &token).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_products"], 2);
    assert_eq!(json["low_stock_products"], 1);
    assert_eq!(json["out_of_stock_products"], 0);
}

#[tokio::test]
#[serial]
async fn test_restore_and_purge_deleted_product() {
    let fixture = admin_app().await;
    let product =
        common::create_test_product(&fixture.pool, fixture.business_id, "Ghost Item", 5.0, 3).await;
    sqlx::query("UPDATE products SET is_deleted = TRUE WHERE id = $1")
        .bind(product)
        .execute(&fixture.pool)
        .await
        .unwrap();

    let token = login(&fixture.app, "platform").await;

    let (status, json) =
        get_json(&fixture.app, "/api/v1/admin/deleted/product", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["label"], "Ghost Item");

    let response = fixture
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/admin/deleted/product/{}/restore", product))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let restored: bool =
        sqlx::query_scalar("SELECT NOT is_deleted FROM products WHERE id = $1")
            .bind(product)
            .fetch_one(&fixture.pool)
            .await
            .unwrap();
    assert!(restored);

    // Purging requires the row to be soft-deleted again
    sqlx::query("UPDATE products SET is_deleted = TRUE WHERE id = $1")
        .bind(product)
        .execute(&fixture.pool)
        .await
        .unwrap();

    let response = fixture
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/admin/deleted/product/{}", product))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE id = $1")
        .bind(product)
        .fetch_one(&fixture.pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
#[serial]
async fn test_superadmin_creates_admin_for_named_business() {
    let fixture = admin_app().await;
    let token = login(&fixture.app, "platform").await;

    let (status, json) = post_json(
        &fixture.app,
        "/api/v1/users",
        &token,
        json!({
            "username": "secondadmin",
            "password": "StrongPass1",
            "role": "admin",
            "business_id": fixture.business_id,
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["role"], "admin");
    assert_eq!(json["business_id"], fixture.business_id.to_string());

    // A superadmin has no tenant of their own, so the target must be named
    let (status, _) = post_json(
        &fixture.app,
        "/api/v1/users",
        &token,
        json!({
            "username": "floatingadmin",
            "password": "StrongPass1",
            "role": "admin",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[serial]
async fn test_tenant_admin_cannot_create_admin() {
    let fixture = admin_app().await;
    let token = login(&fixture.app, "shopadmin").await;

    let (status, _) = post_json(
        &fixture.app,
        "/api/v1/users",
        &token,
        json!({
            "username": "peeradmin",
            "password": "StrongPass1",
            "role": "admin",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Cashiers stay within reach of a tenant admin
    let (status, json) = post_json(
        &fixture.app,
        "/api/v1/users",
        &token,
        json!({
            "username": "tillhand",
            "password": "StrongPass1",
            "role": "cashier",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["business_id"], fixture.business_id.to_string());
}

#[tokio::test]
#[serial]
async fn test_check_username_reads_query_string() {
    let fixture = admin_app().await;
    let token = login(&fixture.app, "shopadmin").await;

    let (status, json) = get_json(
        &fixture.app,
        "/api/v1/users/check-username?username=shopadmin",
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["available"], false);

    let (status, json) = get_json(
        &fixture.app,
        "/api/v1/users/check-username?username=nobodyyet",
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["available"], true);
}
