//! Authorization checks.
//! Roles are strictly ordered: superadmin > admin > manager > cashier.
//! Tenant scoping is enforced here as well; a non-superadmin can only
//! act inside their own business.

use crate::{auth::middleware::AuthContext, error::AppError, models::user::Role};
use uuid::Uuid;

pub struct PermissionService;

impl PermissionService {
    /// Privilege rank, higher means more privileged
    fn rank(role: Role) -> u8 {
        match role {
            Role::Superadmin => 3,
            Role::Admin => 2,
            Role::Manager => 1,
            Role::Cashier => 0,
        }
    }

    /// Caller must hold at least the given role
    pub fn require_role(ctx: &AuthContext, minimum: Role) -> Result<(), AppError> {
        if Self::rank(ctx.role) >= Self::rank(minimum) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn require_superadmin(ctx: &AuthContext) -> Result<(), AppError> {
        Self::require_role(ctx, Role::Superadmin)
    }

    pub fn require_admin(ctx: &AuthContext) -> Result<(), AppError> {
        Self::require_role(ctx, Role::Admin)
    }

    pub fn require_manager(ctx: &AuthContext) -> Result<(), AppError> {
        Self::require_role(ctx, Role::Manager)
    }

    /// The tenant the caller operates in. Superadmins have no implicit
    /// tenant and must name one explicitly where needed.
    pub fn tenant_id(ctx: &AuthContext) -> Result<Uuid, AppError> {
        ctx.business_id.ok_or(AppError::Forbidden)
    }

    /// Tenant scope for an operation a superadmin may run against any
    /// business: their explicit choice wins, everyone else is pinned to
    /// their own tenant.
    pub fn scope_for(ctx: &AuthContext, requested: Option<Uuid>) -> Result<Uuid, AppError> {
        if ctx.is_superadmin() {
            requested.ok_or_else(|| {
                AppError::BadRequest("business_id is required for superadmin requests".to_string())
            })
        } else {
            Self::tenant_id(ctx)
        }
    }

    /// Whether the caller may manage a user holding `target` role.
    /// Admins manage managers and cashiers; only superadmins touch admins.
    pub fn can_manage_role(ctx: &AuthContext, target: Role) -> bool {
        match target {
            Role::Superadmin => false,
            Role::Admin => ctx.is_superadmin(),
            Role::Manager | Role::Cashier => Self::rank(ctx.role) >= Self::rank(Role::Admin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(role: Role, business_id: Option<Uuid>) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            username: "test".to_string(),
            role,
            business_id,
        }
    }

    #[test]
    fn test_role_ordering() {
        let admin = ctx(Role::Admin, Some(Uuid::new_v4()));
        assert!(PermissionService::require_manager(&admin).is_ok());
        assert!(PermissionService::require_admin(&admin).is_ok());
        assert!(PermissionService::require_superadmin(&admin).is_err());

        let cashier = ctx(Role::Cashier, Some(Uuid::new_v4()));
        assert!(PermissionService::require_manager(&cashier).is_err());
    }

    #[test]
    fn test_tenant_id_requires_business() {
        let superadmin = ctx(Role::Superadmin, None);
        assert!(PermissionService::tenant_id(&superadmin).is_err());

        let business_id = Uuid::new_v4();
        let admin = ctx(Role::Admin, Some(business_id));
        assert_eq!(PermissionService::tenant_id(&admin).unwrap(), business_id);
    }

    #[test]
    fn test_scope_pins_tenant_users() {
        let own = Uuid::new_v4();
        let other = Uuid::new_v4();

        let admin = ctx(Role::Admin, Some(own));
        assert_eq!(PermissionService::scope_for(&admin, Some(other)).unwrap(), own);

        let superadmin = ctx(Role::Superadmin, None);
        assert_eq!(
            PermissionService::scope_for(&superadmin, Some(other)).unwrap(),
            other
        );
        assert!(PermissionService::scope_for(&superadmin, None).is_err());
    }

    #[test]
    fn test_admin_cannot_manage_admins() {
        let admin = ctx(Role::Admin, Some(Uuid::new_v4()));
        assert!(PermissionService::can_manage_role(&admin, Role::Cashier));
        assert!(PermissionService::can_manage_role(&admin, Role::Manager));
        assert!(!PermissionService::can_manage_role(&admin, Role::Admin));

        let superadmin = ctx(Role::Superadmin, None);
        assert!(PermissionService::can_manage_role(&superadmin, Role::Admin));
        assert!(!PermissionService::can_manage_role(&superadmin, Role::Superadmin));
    }
}
