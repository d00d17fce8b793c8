//! Business logic layer.
//! Services own the multi-statement flows that must run inside a
//! transaction; single-table reads and writes go straight through the
//! repositories.

pub mod analytics_service;
pub mod audit_service;
pub mod auth_service;
pub mod billing_service;
pub mod notification_service;
pub mod permission_service;
pub mod sale_service;

pub use analytics_service::AnalyticsService;
pub use audit_service::{AuditAction, AuditService};
pub use auth_service::AuthService;
pub use billing_service::BillingService;
pub use notification_service::NotificationService;
pub use permission_service::PermissionService;
pub use sale_service::SaleService;
