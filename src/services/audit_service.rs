//! Audit trail.
//! Every privileged mutation records who did what to which resource.
//! Failures to write the trail are logged and swallowed so auditing
//! never breaks the operation itself.

use crate::repository::AuditRepository;
use sqlx::PgPool;
use uuid::Uuid;

/// Auditable actions, serialized as dotted names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    UserCreate,
    UserUpdate,
    UserDelete,
    UserPasswordReset,
    ProductCreate,
    ProductUpdate,
    ProductDelete,
    ProductRestore,
    CategoryCreate,
    CategoryUpdate,
    CategoryDelete,
    CustomerCreate,
    CustomerUpdate,
    CustomerDelete,
    SaleCreate,
    SalePayment,
    SaleRefund,
    StockAdjust,
    DamageReport,
    BusinessCreate,
    BusinessUpdate,
    BusinessSuspend,
    BusinessReactivate,
    BillGenerate,
    BillPay,
    NotificationSend,
    SettingUpdate,
    RecordRestore,
    RecordPurge,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UserCreate => "user.create",
            AuditAction::UserUpdate => "user.update",
            AuditAction::UserDelete => "user.delete",
            AuditAction::UserPasswordReset => "user.password_reset",
            AuditAction::ProductCreate => "product.create",
            AuditAction::ProductUpdate => "product.update",
            AuditAction::ProductDelete => "product.delete",
            AuditAction::ProductRestore => "product.restore",
            AuditAction::CategoryCreate => "category.create",
            AuditAction::CategoryUpdate => "category.update",
            AuditAction::CategoryDelete => "category.delete",
            AuditAction::CustomerCreate => "customer.create",
            AuditAction::CustomerUpdate => "customer.update",
            AuditAction::CustomerDelete => "customer.delete",
            AuditAction::SaleCreate => "sale.create",
            AuditAction::SalePayment => "sale.payment",
            AuditAction::SaleRefund => "sale.refund",
            AuditAction::StockAdjust => "inventory.adjust",
            AuditAction::DamageReport => "inventory.damage",
            AuditAction::BusinessCreate => "business.create",
            AuditAction::BusinessUpdate => "business.update",
            AuditAction::BusinessSuspend => "business.suspend",
            AuditAction::BusinessReactivate => "business.reactivate",
            AuditAction::BillGenerate => "billing.generate",
            AuditAction::BillPay => "billing.pay",
            AuditAction::NotificationSend => "notification.send",
            AuditAction::SettingUpdate => "settings.update",
            AuditAction::RecordRestore => "admin.restore",
            AuditAction::RecordPurge => "admin.purge",
        }
    }

    /// Resource type the action applies to
    pub fn resource_type(&self) -> &'static str {
        match self {
            AuditAction::UserCreate
            | AuditAction::UserUpdate
            | AuditAction::UserDelete
            | AuditAction::UserPasswordReset => "user",
            AuditAction::ProductCreate
            | AuditAction::ProductUpdate
            | AuditAction::ProductDelete
            | AuditAction::ProductRestore => "product",
            AuditAction::CategoryCreate
            | AuditAction::CategoryUpdate
            | AuditAction::CategoryDelete => "category",
            AuditAction::CustomerCreate
            | AuditAction::CustomerUpdate
            | AuditAction::CustomerDelete => "customer",
            AuditAction::SaleCreate | AuditAction::SalePayment | AuditAction::SaleRefund => "sale",
            AuditAction::StockAdjust | AuditAction::DamageReport => "inventory",
            AuditAction::BusinessCreate
            | AuditAction::BusinessUpdate
            | AuditAction::BusinessSuspend
            | AuditAction::BusinessReactivate => "business",
            AuditAction::BillGenerate | AuditAction::BillPay => "bill",
            AuditAction::NotificationSend => "notification",
            AuditAction::SettingUpdate => "setting",
            AuditAction::RecordRestore | AuditAction::RecordPurge => "record",
        }
    }
}

pub struct AuditService {
    repo: AuditRepository,
}

impl AuditService {
    pub fn new(db: PgPool) -> Self {
        Self {
            repo: AuditRepository::new(db),
        }
    }

    pub async fn log(
        &self,
        user_id: Option<Uuid>,
        business_id: Option<Uuid>,
        action: AuditAction,
        resource_id: Option<Uuid>,
        details: Option<serde_json::Value>,
        ip_address: Option<&str>,
    ) {
        if let Err(e) = self
            .repo
            .insert(
                user_id,
                business_id,
                action.as_str(),
                action.resource_type(),
                resource_id,
                details,
                ip_address,
            )
            .await
        {
            tracing::warn!(action = action.as_str(), error = ?e, "Failed to write audit log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_are_dotted() {
        for action in [
            AuditAction::UserCreate,
            AuditAction::SaleCreate,
            AuditAction::BusinessSuspend,
            AuditAction::RecordPurge,
        ] {
            assert!(action.as_str().contains('.'));
        }
    }

    #[test]
    fn test_resource_type_matches_prefix() {
        assert_eq!(AuditAction::SalePayment.resource_type(), "sale");
        assert_eq!(AuditAction::ProductRestore.resource_type(), "product");
        assert_eq!(AuditAction::BillGenerate.resource_type(), "bill");
    }
}
