//! Authentication endpoints

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::{client_ip, AppState},
    models::auth::*,
    models::user::UserResponse,
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::json;
use validator::Validate;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    req.validate()?;

    let user = state.auth_service.register(&req).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let ip = client_ip(&headers, state.config.security.trust_proxy);
    let user_agent = headers.get("user-agent").and_then(|v| v.to_str().ok());

    let response = state.auth_service.login(&req, &ip, user_agent).await?;

    Ok(Json(response))
}

pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let ip = client_ip(&headers, state.config.security.trust_proxy);
    let user_agent = headers.get("user-agent").and_then(|v| v.to_str().ok());

    let response = state.auth_service.refresh(&req, &ip, user_agent).await?;

    Ok(Json(response))
}

pub async fn logout(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(req): Json<LogoutRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.auth_service.logout(ctx.user_id, &req).await?;

    Ok(Json(json!({ "message": "Logged out" })))
}

pub async fn logout_all(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<serde_json::Value>, AppError> {
    let revoked = state.auth_service.logout_all(ctx.user_id).await?;

    Ok(Json(json!({ "message": "Logged out everywhere", "sessions_revoked": revoked })))
}
