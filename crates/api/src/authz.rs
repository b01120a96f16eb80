//! Permission check at the handler boundary, before any store access.

use ehm_auth::{authorize, Permission};

use crate::app::errors::ServiceError;
use crate::context::PrincipalContext;

pub fn require(principal: &PrincipalContext, permission: &'static str) -> Result<(), ServiceError> {
    authorize(&principal.principal(), &Permission::new(permission))
        .map_err(|e| ServiceError::Forbidden(e.to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ehm_auth::{NewUser, UserAccount};

    use super::*;

    fn account(role: &str) -> UserAccount {
        NewUser {
            name: Some("U".into()),
            email: Some("u@x.com".into()),
            password: Some("secret1".into()),
            role: Some(role.into()),
            is_active: None,
        }
        .into_account(Utc::now())
        .unwrap()
    }

    #[test]
    fn viewer_reads_but_cannot_write() {
        let ctx = PrincipalContext::from_account(&account("viewer"));
        assert!(require(&ctx, Permission::CUSTOMERS_READ).is_ok());
        assert!(matches!(
            require(&ctx, Permission::CUSTOMERS_WRITE),
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[test]
    fn only_admin_manages_users() {
        let agent = PrincipalContext::from_account(&account("agent"));
        let admin = PrincipalContext::from_account(&account("admin"));
        assert!(require(&agent, Permission::INVOICES_WRITE).is_ok());
        assert!(require(&agent, Permission::USERS_MANAGE).is_err());
        assert!(require(&admin, Permission::USERS_MANAGE).is_ok());
    }
}
