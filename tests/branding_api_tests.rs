//! Branding settings API integration tests

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use serial_test::serial;
use tower::ServiceExt;

mod common;
use common::{create_test_business, create_test_state, create_test_user, setup_test_db};

async fn branding_app() -> Router {
    let config = common::create_test_config();
    let pool = setup_test_db(&config).await;

    let business_id = create_test_business(&pool, "Branded Shop").await;
    create_test_user(&pool, Some(business_id), "brandadmin", "StrongPass1", "admin").await;
    create_test_user(&pool, Some(business_id), "brandcashier", "StrongPass1", "cashier").await;

    let state = create_test_state(pool).await;
    retail_system::routes::create_router(state)
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

async fn get_branding(app: &Router, token: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/business/branding")
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

async fn put_branding(app: &Router, token: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/v1/business/branding")
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

#[tokio::test]
#[serial]
async fn test_branding_defaults_visible_to_any_member() {
    let app = branding_app().await;
    let token = login(&app, "brandcashier").await;

    let (status, json) = get_branding(&app, &token).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["theme"], "light");
    assert_eq!(json["branding_enabled"], true);
    assert_eq!(json["currency"], "USD");
    assert_eq!(json["timezone"], "UTC");
    assert!(json["primary_color"].as_str().unwrap().starts_with('#'));
    assert!(json["tagline"].is_null());
}

#[tokio::test]
#[serial]
async fn test_admin_updates_branding_partially() {
    let app = branding_app().await;
    let token = login(&app, "brandadmin").await;

    let (status, json) = put_branding(
        &app,
        &token,
        json!({
            "primary_color": "#AB12CD",
            "theme": "dark",
            "tagline": "Everything under one roof",
            "social_media": { "instagram": "@brandedshop" },
            "currency": "EUR",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["primary_color"], "#AB12CD");
    assert_eq!(json["theme"], "dark");
    assert_eq!(json["tagline"], "Everything under one roof");
    assert_eq!(json["social_media"]["instagram"], "@brandedshop");
    assert_eq!(json["currency"], "EUR");
    // untouched fields keep their defaults
    assert_eq!(json["timezone"], "UTC");
    assert_eq!(json["branding_enabled"], true);

    // changes persist for other members
    let cashier_token = login(&app, "brandcashier").await;
    let (status, json) = get_branding(&app, &cashier_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["theme"], "dark");
}

#[tokio::test]
#[serial]
async fn test_branding_update_rejects_bad_values() {
    let app = branding_app().await;
    let token = login(&app, "brandadmin").await;

    let (status, _) = put_branding(&app, &token, json!({ "primary_color": "blue" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = put_branding(&app, &token, json!({ "theme": "neon" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[serial]
async fn test_cashier_cannot_update_branding() {
    let app = branding_app().await;
    let token = login(&app, "brandcashier").await;

    let (status, _) = put_branding(&app, &token, json!({ "theme": "dark" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
