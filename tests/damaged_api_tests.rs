//! Damaged product API integration tests: reporting, revising and
//! retracting write-offs, with the stock ledger kept in step.

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
    create_test_business, create_test_product, create_test_state, create_test_user, setup_test_db,
};

struct DamageApp {
    app: Router,
    pool: PgPool,
    product_id: Uuid,
}

async fn damage_app() -> DamageApp {
    let config = common::create_test_config();
    let pool = setup_test_db(&config).await;

    let business_id = create_test_business(&pool, "Damage Test Shop").await;
    create_test_user(&pool, Some(business_id), "stockkeeper", "StrongPass1", "admin").await;
    let product_id = create_test_product(&pool, business_id, "Fragile Vase", 30.0, 10).await;

    let state = create_test_state(pool.clone()).await;
    DamageApp {
        app: retail_system::routes::create_router(state),
        pool,
        product_id,
    }
}

async fn login(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "identifier": "stockkeeper", "password": "StrongPass1" }).to_string(),
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

async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    token: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn stock_of(pool: &PgPool, product_id: Uuid) -> i32 {
    sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn ledger_changes(pool: &PgPool, reference_id: &str) -> Vec<i32> {
    sqlx::query_scalar(
        r#"
        SELECT quantity_change FROM inventory_transactions
        WHERE reference_id = $1::uuid
        ORDER BY created_at
        "#,
    )
    .bind(reference_id)
    .fetch_all(pool)
    .await
    .unwrap()
}

async fn report(app: &Router, token: &str, product_id: Uuid, quantity: i32) -> Value {
    let (status, json) = send_json(
        app,
        "POST",
        "/api/v1/damaged",
        token,
        Some(json!({
            "product_id": product_id,
            "quantity": quantity,
            "reason": "dropped during restock",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json
}

#[tokio::test]
#[serial]
async fn test_report_damage_decrements_stock_and_writes_ledger() {
    let fx = damage_app().await;
    let token = login(&fx.app).await;

    let damaged = report(&fx.app, &token, fx.product_id, 4).await;

    assert_eq!(damaged["quantity"], 4);
    assert_eq!(damaged["status"], "reported");
    assert_eq!(stock_of(&fx.pool, fx.product_id).await, 6);

    let changes = ledger_changes(&fx.pool, damaged["id"].as_str().unwrap()).await;
    assert_eq!(changes, vec![-4]);
}

#[tokio::test]
#[serial]
async fn test_update_damage_quantity_adjusts_stock() {
    let fx = damage_app().await;
    let token = login(&fx.app).await;

    let damaged = report(&fx.app, &token, fx.product_id, 4).await;
    let id = damaged["id"].as_str().unwrap().to_string();
    assert_eq!(stock_of(&fx.pool, fx.product_id).await, 6);

    // Raising the write-off takes two more units out of stock
    let (status, json) = send_json(
        &fx.app,
        "PUT",
        &format!("/api/v1/damaged/{}", id),
        &token,
        Some(json!({ "quantity": 6 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["quantity"], 6);
    assert_eq!(stock_of(&fx.pool, fx.product_id).await, 4);

    // Lowering it puts the difference back
    let (status, json) = send_json(
        &fx.app,
        "PUT",
        &format!("/api/v1/damaged/{}", id),
        &token,
        Some(json!({ "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["quantity"], 1);
    assert_eq!(stock_of(&fx.pool, fx.product_id).await, 9);

    let changes = ledger_changes(&fx.pool, &id).await;
    assert_eq!(changes, vec![-4, -2, 5]);
}

#[tokio::test]
#[serial]
async fn test_update_damage_rejects_quantity_beyond_stock() {
    let fx = damage_app().await;
    let token = login(&fx.app).await;

    let damaged = report(&fx.app, &token, fx.product_id, 4).await;
    let id = damaged["id"].as_str().unwrap().to_string();

    // Only 6 units remain, so the write-off cannot grow by 7
    let (status, _) = send_json(
        &fx.app,
        "PUT",
        &format!("/api/v1/damaged/{}", id),
        &token,
        Some(json!({ "quantity": 11 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(stock_of(&fx.pool, fx.product_id).await, 6);
}

#[tokio::test]
#[serial]
async fn test_update_damage_status_only_leaves_stock_alone() {
    let fx = damage_app().await;
    let token = login(&fx.app).await;

    let damaged = report(&fx.app, &token, fx.product_id, 3).await;
    let id = damaged["id"].as_str().unwrap().to_string();

    let (status, json) = send_json(
        &fx.app,
        "PUT",
        &format!("/api/v1/damaged/{}", id),
        &token,
        Some(json!({ "status": "written_off" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "written_off");
    assert_eq!(stock_of(&fx.pool, fx.product_id).await, 7);

    let changes = ledger_changes(&fx.pool, &id).await;
    assert_eq!(changes, vec![-3]);
}

#[tokio::test]
#[serial]
async fn test_delete_damage_restores_stock() {
    let fx = damage_app().await;
    let token = login(&fx.app).await;

    let damaged = report(&fx.app, &token, fx.product_id, 4).await;
    let id = damaged["id"].as_str().unwrap().to_string();
    assert_eq!(stock_of(&fx.pool, fx.product_id).await, 6);

    let (status, _) = send_json(
        &fx.app,
        "DELETE",
        &format!("/api/v1/damaged/{}", id),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(stock_of(&fx.pool, fx.product_id).await, 10);

    let changes = ledger_changes(&fx.pool, &id).await;
    assert_eq!(changes, vec![-4, 4]);

    // Retracting twice is a 404
    let (status, _) = send_json(
        &fx.app,
        "DELETE",
        &format!("/api/v1/damaged/{}", id),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
