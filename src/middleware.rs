//! HTTP middleware: shared application state, request tracking and the
//! optional IP allowlist.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    auth::jwt::JwtService,
    config::AppConfig,
    error::AppError,
    services::{
        AnalyticsService, AuditService, AuthService, BillingService, NotificationService,
        SaleService,
    },
};

/// Shared application state. Services are wrapped in Arc so cloning the
/// state per request is a pointer copy.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: PgPool,
    pub jwt_service: Arc<JwtService>,
    pub auth_service: Arc<AuthService>,
    pub sale_service: Arc<SaleService>,
    pub billing_service: Arc<BillingService>,
    pub notification_service: Arc<NotificationService>,
    pub analytics_service: Arc<AnalyticsService>,
    pub audit_service: Arc<AuditService>,
}

impl AppState {
    pub fn new(config: AppConfig, db: PgPool) -> Result<Self, AppError> {
        let config = Arc::new(config);
        let jwt_service = Arc::new(JwtService::from_config(&config)?);

        Ok(Self {
            auth_service: Arc::new(AuthService::new(
                db.clone(),
                jwt_service.clone(),
                config.clone(),
            )),
            sale_service: Arc::new(SaleService::new(db.clone())),
            billing_service: Arc::new(BillingService::new(db.clone(), config.clone())),
            notification_service: Arc::new(NotificationService::new(db.clone())),
            analytics_service: Arc::new(AnalyticsService::new(db.clone())),
            audit_service: Arc::new(AuditService::new(db.clone())),
            jwt_service,
            config,
            db,
        })
    }
}

tokio::task_local! {
    /// Request id of the in-flight request, readable by error rendering
    pub static REQUEST_ID: String;
}

/// Request tracking middleware. Assigns a trace/request id pair, records
/// latency metrics and echoes both ids back in the response headers.
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().to_string();
    let uri = req.uri().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    let scope_id = request_id.clone();
    REQUEST_ID.scope(scope_id, async move {
        let start = Instant::now();

        let response = next.run(req).await;

        let elapsed = start.elapsed();
        let status = response.status().as_u16();

        // Metrics labels must be 'static
        let method_label = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            "PATCH" => "PATCH",
            _ => "OTHER",
        };
        let status_label = match status {
            200 => "200",
            201 => "201",
            204 => "204",
            400 => "400",
            401 => "401",
            403 => "403",
            404 => "404",
            409 => "409",
            500 => "500",
            _ => "other",
        };

        metrics::counter!("http_requests_total", "method" => method_label, "status" => status_label)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            method = %method,
            uri = %uri,
            status = status,
            elapsed_ms = elapsed.as_millis(),
            "Request completed"
        );

        let mut response = response;
        if let Ok(value) = trace_id.parse() {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = request_id.parse() {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span))
    .await
}

fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Optional IP allowlist, checked before authentication
pub async fn ip_whitelist_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(allowed_ips) = &state.config.security.allowed_ips {
        let ip = client_ip(req.headers(), state.config.security.trust_proxy);

        if !allowed_ips.contains(&ip) {
            tracing::warn!(client_ip = %ip, "IP not in allowlist");
            return Err(AppError::Forbidden);
        }
    }

    Ok(next.run(req).await)
}

/// Best-effort client address. Proxy headers are only honored when the
/// deployment says to trust them.
pub fn client_ip(headers: &HeaderMap, trust_proxy: bool) -> String {
    if trust_proxy {
        if let Some(forwarded_for) = headers.get("x-forwarded-for") {
            if let Ok(forwarded_str) = forwarded_for.to_str() {
                if let Some(first_ip) = forwarded_str.split(',').next() {
                    let first_ip = first_ip.trim();
                    if !first_ip.is_empty() {
                        return first_ip.to_string();
                    }
                }
            }
        }

        if let Some(real_ip) = headers.get("x-real-ip") {
            if let Ok(ip_str) = real_ip.to_str() {
                return ip_str.to_string();
            }
        }
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_or_generate_trace_id() {
        let mut headers = HeaderMap::new();
        headers.insert("x-trace-id", "test-trace-123".parse().unwrap());

        let trace_id = extract_or_generate_trace_id(&headers);
        assert_eq!(trace_id, "test-trace-123");

        let headers = HeaderMap::new();
        let trace_id = extract_or_generate_trace_id(&headers);
        assert!(!trace_id.is_empty());
        assert_ne!(trace_id, "test-trace-123");
    }

    #[test]
    fn test_client_ip_honors_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "10.1.2.3, 172.16.0.1".parse().unwrap());

        assert_eq!(client_ip(&headers, true), "10.1.2.3");
        assert_eq!(client_ip(&headers, false), "unknown");
    }

    #[test]
    fn test_client_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "10.9.8.7".parse().unwrap());

        assert_eq!(client_ip(&headers, true), "10.9.8.7");
    }
}
