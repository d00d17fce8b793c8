//! Route registration.
//! Builds the API surface and wires the middleware stack.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::{handlers, middleware::AppState};

/// Request bodies above this are rejected outright
const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    // Health probes stay outside the auth stack
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready));

    let auth_routes = Router::new()
        .route("/api/v1/auth/register", post(handlers::auth::register))
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .route("/api/v1/auth/refresh", post(handlers::auth::refresh));

    let authenticated_routes = Router::new()
        // session
        .route("/api/v1/auth/logout", post(handlers::auth::logout))
        .route("/api/v1/auth/logout-all", post(handlers::auth::logout_all))

        // profile and user management
        .route(
            "/api/v1/users/me",
            get(handlers::user::get_profile).put(handlers::user::update_profile),
        )
        .route(
            "/api/v1/users",
            get(handlers::user::list_users).post(handlers::user::create_user),
        )
        .route(
            "/api/v1/users/check-username",
            get(handlers::user::check_username),
        )
        .route(
            "/api/v1/users/{id}",
            get(handlers::user::get_user)
                .put(handlers::user::update_user)
                .delete(handlers::user::delete_user),
        )
        .route(
            "/api/v1/users/{id}/reset-password",
            post(handlers::user::reset_password),
        )

        // categories
        .route(
            "/api/v1/categories",
            get(handlers::category::list_categories).post(handlers::category::create_category),
        )
        .route(
            "/api/v1/categories/{id}",
            get(handlers::category::get_category)
                .put(handlers::category::update_category)
                .delete(handlers::category::delete_category),
        )

        // products
        .route(
            "/api/v1/products",
            get(handlers::product::list_products).post(handlers::product::create_product),
        )
        .route("/api/v1/products/low-stock", get(handlers::product::low_stock))
        .route(
            "/api/v1/products/{id}",
            get(handlers::product::get_product)
                .put(handlers::product::update_product)
                .delete(handlers::product::delete_product),
        )
        .route(
            "/api/v1/products/{id}/restore",
            post(handlers::product::restore_product),
        )

        // customers
        .route(
            "/api/v1/customers",
            get(handlers::customer::list_customers).post(handlers::customer::create_customer),
        )
        .route(
            "/api/v1/customers/search",
            get(handlers::customer::search_customers),
        )
        .route(
            "/api/v1/customers/{id}",
            get(handlers::customer::get_customer)
                .put(handlers::customer::update_customer)
                .delete(handlers::customer::delete_customer),
        )
        .route(
            "/api/v1/customers/{id}/loyalty",
            post(handlers::customer::adjust_loyalty_points),
        )

        // sales and the credit ledger
        .route(
            "/api/v1/sales",
            get(handlers::sale::list_sales).post(handlers::sale::create_sale),
        )
        .route("/api/v1/sales/report", get(handlers::sale::sales_report))
        .route("/api/v1/sales/top-products", get(handlers::sale::top_products))
        .route("/api/v1/sales/credit", get(handlers::sale::credit_report))
        .route("/api/v1/sales/{id}", get(handlers::sale::get_sale))
        .route("/api/v1/sales/{id}/payments", post(handlers::sale::record_payment))
        .route("/api/v1/sales/{id}/refund", post(handlers::sale::refund_sale))

        // inventory
        .route("/api/v1/inventory/status", get(handlers::inventory::stock_status))
        .route(
            "/api/v1/inventory/transactions",
            get(handlers::inventory::list_transactions),
        )
        .route("/api/v1/inventory/value", get(handlers::inventory::value_report))
        .route(
            "/api/v1/inventory/{product_id}/adjust",
            post(handlers::inventory::adjust_stock),
        )

        // damaged products
        .route(
            "/api/v1/damaged",
            get(handlers::damaged::list_damaged).post(handlers::damaged::report_damage),
        )
        .route("/api/v1/damaged/summary", get(handlers::damaged::damage_summary))
        .route(
            "/api/v1/damaged/{id}",
            get(handlers::damaged::get_damaged)
                .put(handlers::damaged::update_damage)
                .delete(handlers::damaged::delete_damage),
        )

        // notifications
        .route(
            "/api/v1/notifications",
            get(handlers::notification::inbox).post(handlers::notification::send_notification),
        )
        .route(
            "/api/v1/notifications/unread-count",
            get(handlers::notification::unread_count),
        )
        .route(
            "/api/v1/notifications/stats",
            get(handlers::notification::notification_stats),
        )
        .route(
            "/api/v1/notifications/read-all",
            post(handlers::notification::mark_all_read),
        )
        .route(
            "/api/v1/notifications/{id}",
            get(handlers::notification::get_thread)
                .delete(handlers::notification::delete_notification),
        )
        .route(
            "/api/v1/notifications/{id}/read",
            post(handlers::notification::mark_read),
        )

        // tenant self-service
        .route("/api/v1/business", get(handlers::business::my_business))
        .route(
            "/api/v1/business/branding",
            get(handlers::business::get_branding).put(handlers::business::update_branding),
        )
        .route(
            "/api/v1/business/suspension-notices",
            get(handlers::business_payment::my_suspension_notices),
        )
        .route(
            "/api/v1/business/suspension-notices/{id}/read",
            post(handlers::business_payment::mark_suspension_notice_read),
        )

        // business management (superadmin)
        .route(
            "/api/v1/businesses",
            get(handlers::business::list_businesses).post(handlers::business::create_business),
        )
        .route(
            "/api/v1/businesses/{id}",
            get(handlers::business::get_business).put(handlers::business::update_business),
        )
        .route(
            "/api/v1/businesses/{id}/status",
            put(handlers::business::set_business_status),
        )
        .route(
            "/api/v1/businesses/{id}/statistics",
            get(handlers::business::business_statistics),
        )
        .route(
            "/api/v1/businesses/{id}/users",
            get(handlers::business::business_users),
        )
        .route(
            "/api/v1/businesses/{id}/activity",
            get(handlers::business::business_activity),
        )
        .route(
            "/api/v1/businesses/{id}/bills",
            get(handlers::business_payment::list_bills)
                .post(handlers::business_payment::generate_bill),
        )
        .route(
            "/api/v1/businesses/{id}/suspend",
            post(handlers::business_payment::suspend_business),
        )
        .route(
            "/api/v1/businesses/{id}/reactivate",
            post(handlers::business_payment::reactivate_business),
        )
        .route(
            "/api/v1/businesses/{id}/due-date",
            put(handlers::business_payment::update_due_date),
        )
        .route(
            "/api/v1/businesses/{id}/payment-history",
            get(handlers::business_payment::status_history),
        )

        // billing board (superadmin)
        .route(
            "/api/v1/billing/overview",
            get(handlers::business_payment::payment_overview),
        )
        .route(
            "/api/v1/billing/summary",
            get(handlers::business_payment::payment_summary),
        )
        .route(
            "/api/v1/billing/generate",
            post(handlers::business_payment::generate_monthly_bills),
        )
        .route(
            "/api/v1/billing/bills/{id}/pay",
            post(handlers::business_payment::pay_bill),
        )
        .route(
            "/api/v1/billing/sweep",
            post(handlers::business_payment::run_payment_sweep),
        )

        // platform administration (superadmin)
        .route("/api/v1/admin/dashboard", get(handlers::admin::platform_dashboard))
        .route("/api/v1/admin/revenue-trend", get(handlers::admin::revenue_trend))
        .route("/api/v1/admin/top-businesses", get(handlers::admin::top_businesses))
        .route(
            "/api/v1/admin/analytics/sales",
            get(handlers::admin::sales_analytics),
        )
        .route(
            "/api/v1/admin/analytics/users",
            get(handlers::admin::user_analytics),
        )
        .route(
            "/api/v1/admin/analytics/products",
            get(handlers::admin::product_analytics),
        )
        .route("/api/v1/admin/audit-logs", get(handlers::admin::list_audit_logs))
        .route(
            "/api/v1/admin/audit-logs/actions",
            get(handlers::admin::audit_action_counts),
        )
        .route(
            "/api/v1/admin/deleted/{resource}",
            get(handlers::admin::deleted_records),
        )
        .route(
            "/api/v1/admin/deleted/{resource}/{id}/restore",
            post(handlers::admin::restore_record),
        )
        .route(
            "/api/v1/admin/deleted/{resource}/{id}",
            axum::routing::delete(handlers::admin::purge_record),
        )
        .route("/api/v1/admin/settings", get(handlers::admin::list_settings))
        .route("/api/v1/admin/settings/{key}", put(handlers::admin::update_setting))
        .layer(axum::middleware::from_fn_with_state(
            state.jwt_service.clone(),
            crate::auth::middleware::jwt_auth_middleware,
        ));

    let metrics_routes = Router::new().route("/metrics", get(handlers::metrics::metrics));

    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(authenticated_routes)
        .merge(metrics_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::ip_whitelist_middleware,
        ))
        .layer(axum::middleware::from_fn(
            crate::middleware::request_tracking_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
