//! Health and metrics endpoint integration tests

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serial_test::serial;
use tower::ServiceExt;

mod common;
use common::{create_test_state, setup_test_db};

#[tokio::test]
#[serial]
async fn test_health_endpoint() {
    let config = common::create_test_config();
    let pool = setup_test_db(&config).await;
    let state = create_test_state(pool).await;

    let app = retail_system::routes::create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
#[serial]
async fn test_readiness_endpoint() {
    let config = common::create_test_config();
    let pool = setup_test_db(&config).await;
    let state = create_test_state(pool).await;

    let app = retail_system::routes::create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/ready")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(json["status"], "ready");
    assert_eq!(json["database"], "healthy");
}

#[tokio::test]
#[serial]
async fn test_metrics_endpoint() {
    let config = common::create_test_config();
    let pool = setup_test_db(&config).await;
    let state = create_test_state(pool).await;

    let app = retail_system::routes::create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert!(json["db_pool"]["size"].is_number());
}

#[tokio::test]
#[serial]
async fn test_unknown_route_is_404() {
    let config = common::create_test_config();
    let pool = setup_test_db(&config).await;
    let state = create_test_state(pool).await;

    let app = retail_system::routes::create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
