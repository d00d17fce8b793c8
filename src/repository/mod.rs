//! Database access layer.
//! One repository per aggregate; all queries are parameterized and scoped by
//! business_id where the table is tenant-owned.

pub mod audit_repo;
pub mod auth_repo;
pub mod billing_repo;
pub mod business_repo;
pub mod category_repo;
pub mod customer_repo;
pub mod damaged_repo;
pub mod inventory_repo;
pub mod notification_repo;
pub mod product_repo;
pub mod sale_repo;
pub mod user_repo;

pub use audit_repo::AuditRepository;
pub use auth_repo::AuthRepository;
pub use billing_repo::BillingRepository;
pub use business_repo::BusinessRepository;
pub use category_repo::CategoryRepository;
pub use customer_repo::CustomerRepository;
pub use damaged_repo::DamagedRepository;
pub use inventory_repo::InventoryRepository;
pub use notification_repo::NotificationRepository;
pub use product_repo::ProductRepository;
pub use sale_repo::SaleRepository;
pub use user_repo::UserRepository;
