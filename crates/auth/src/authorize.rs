use std::collections::HashSet;

use thiserror::Error;

use ehm_core::UserId;

use crate::permissions::permissions_for;
use crate::{Permission, Role};

/// A fully resolved principal for authorization decisions.
///
/// Construction is decoupled from storage and transport: the API derives it
/// from the authenticated user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: UserId,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

impl Principal {
    pub fn from_roles(principal_id: UserId, roles: Vec<Role>) -> Self {
        let permissions = permissions_for(&roles);
        Self {
            principal_id,
            roles,
            permissions,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorize a principal for one permission.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let perms: HashSet<&str> = principal.permissions.iter().map(|p| p.as_str()).collect();

    if perms.contains("*") || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_passes_everything() {
        let p = Principal::from_roles(UserId::new(), vec![Role::admin()]);
        assert!(authorize(&p, &Permission::new(Permission::USERS_MANAGE)).is_ok());
    }

    #[test]
    fn viewer_cannot_write() {
        let p = Principal::from_roles(UserId::new(), vec![Role::viewer()]);
        assert!(authorize(&p, &Permission::new(Permission::CUSTOMERS_READ)).is_ok());
        assert_eq!(
            authorize(&p, &Permission::new(Permission::CUSTOMERS_WRITE)),
            Err(AuthzError::Forbidden("customers.write".to_string()))
        );
    }
}
