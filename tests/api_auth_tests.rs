//! Authentication API integration tests

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
use common::{create_test_state, setup_test_db};

async fn test_app() -> Router {
    let config = common::create_test_config();
    let pool = setup_test_db(&config).await;
    let state = create_test_state(pool).await;
    retail_system::routes::create_router(state)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
#[serial]
async fn test_register_creates_business_admin() {
    let app = test_app().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/register",
            json!({
                "username": "shopowner",
                "password": "StrongPass1",
                "business_name": "Corner Shop",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["username"], "shopowner");
    assert_eq!(json["role"], "admin");
    assert!(json["business_id"].is_string());
    assert!(json.get("password_hash").is_none());
}

#[tokio::test]
#[serial]
async fn test_register_superadmin_with_code() {
    let app = test_app().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/register",
            json!({
                "username": "platform",
                "password": "StrongPass1",
                "superadmin_code": "test-superadmin-code",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["role"], "superadmin");
    assert!(json["business_id"].is_null());
}

#[tokio::test]
#[serial]
async fn test_register_wrong_superadmin_code_is_rejected() {
    let app = test_app().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/register",
            json!({
                "username": "intruder",
                "password": "StrongPass1",
                "superadmin_code": "wrong-code",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[serial]
async fn test_register_duplicate_username_conflicts() {
    let app = test_app().await;

    let req = || {
        json_request(
            "POST",
            "/api/v1/auth/register",
            json!({
                "username": "twice",
                "password": "StrongPass1",
                "business_name": "First Shop",
            }),
        )
    };

    let first = app.clone().oneshot(req()).await.unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app.oneshot(req()).await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[serial]
async fn test_register_weak_password_is_rejected() {
    let app = test_app().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/register",
            json!({
                "username": "weakling",
                "password": "short",
                "business_name": "Shop",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[serial]
async fn test_login_returns_token_pair() {
    let app = test_app().await;

    let register = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/register",
            json!({
                "username": "cashlogin",
                "password": "StrongPass1",
                "business_name": "Login Shop",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(register.status(), StatusCode::CREATED);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            json!({ "identifier": "cashlogin", "password": "StrongPass1" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["access_token"].is_string());
    assert!(json["refresh_token"].is_string());
    assert_eq!(json["user"]["username"], "cashlogin");
    assert!(json["business"]["name"].is_string());
}

#[tokio::test]
#[serial]
async fn test_login_wrong_password_is_unauthorized() {
    let app = test_app().await;

    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/register",
            json!({
                "username": "wrongpw",
                "password": "StrongPass1",
                "business_name": "Shop",
            }),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            json!({ "identifier": "wrongpw", "password": "NotThePass1" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[serial]
async fn test_refresh_rotates_tokens() {
    let app = test_app().await;

    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/register",
            json!({
                "username": "rotator",
                "password": "StrongPass1",
                "business_name": "Shop",
            }),
        ))
        .await
        .unwrap();

    let login = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            json!({ "identifier": "rotator", "password": "StrongPass1" }),
        ))
        .await
        .unwrap();
    let login_json = body_json(login).await;
    let refresh_token = login_json["refresh_token"].as_str().unwrap().to_string();

    let refresh = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/refresh",
            json!({ "refresh_token": refresh_token }),
        ))
        .await
        .unwrap();
    assert_eq!(refresh.status(), StatusCode::OK);

    let refresh_json = body_json(refresh).await;
    assert!(refresh_json["access_token"].is_string());
    assert_ne!(refresh_json["refresh_token"], login_json["refresh_token"]);

    // the old refresh token is revoked after rotation
    let reuse = app
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/refresh",
            json!({ "refresh_token": login_json["refresh_token"] }),
        ))
        .await
        .unwrap();
    assert_eq!(reuse.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[serial]
async fn test_protected_route_requires_token() {
    let app = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/products")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[serial]
async fn test_error_body_echoes_request_id_header() {
    let app = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/products")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let header_id = response
        .headers()
        .get("x-request-id")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    let json = body_json(response).await;
    assert_eq!(json["error"]["request_id"], header_id);
}

#[tokio::test]
#[serial]
async fn test_protected_route_accepts_bearer_token() {
    let app = test_app().await;

    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/register",
            json!({
                "username": "bearer",
                "password": "StrongPass1",
                "business_name": "Shop",
            }),
        ))
        .await
        .unwrap();

    let login = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            json!({ "identifier": "bearer", "password": "StrongPass1" }),
        ))
        .await
        .unwrap();
    let token = body_json(login).await["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/products")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
