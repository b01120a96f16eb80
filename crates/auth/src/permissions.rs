use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "customers.read").
/// The wildcard `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const CUSTOMERS_READ: &'static str = "customers.read";
    pub const CUSTOMERS_WRITE: &'static str = "customers.write";
    pub const SUPPLIERS_READ: &'static str = "suppliers.read";
    pub const SUPPLIERS_WRITE: &'static str = "suppliers.write";
    pub const RESERVATIONS_READ: &'static str = "reservations.read";
    pub const RESERVATIONS_WRITE: &'static str = "reservations.write";
    pub const INVOICES_READ: &'static str = "invoices.read";
    pub const INVOICES_WRITE: &'static str = "invoices.write";
    pub const LEDGERS_READ: &'static str = "ledgers.read";
    pub const LEDGERS_WRITE: &'static str = "ledgers.write";
    pub const REPORTS_READ: &'static str = "reports.read";
    pub const USERS_MANAGE: &'static str = "users.manage";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

const READ: &[&str] = &[
    Permission::CUSTOMERS_READ,
    Permission::SUPPLIERS_READ,
    Permission::RESERVATIONS_READ,
    Permission::INVOICES_READ,
    Permission::LEDGERS_READ,
    Permission::REPORTS_READ,
];

const WRITE: &[&str] = &[
    Permission::CUSTOMERS_WRITE,
    Permission::SUPPLIERS_WRITE,
    Permission::RESERVATIONS_WRITE,
    Permission::INVOICES_WRITE,
    Permission::LEDGERS_WRITE,
];

/// Static role → permission policy.
///
/// `admin` gets the wildcard, `agent` runs the day-to-day desk (everything but
/// user management), `viewer` can only read. Unknown roles get nothing.
pub fn permissions_for(roles: &[Role]) -> Vec<Permission> {
    if roles.iter().any(Role::is_admin) {
        return vec![Permission::new("*")];
    }

    let mut perms: Vec<Permission> = Vec::new();
    for role in roles {
        let granted: Vec<&'static str> = match role.as_str() {
            Role::AGENT => READ.iter().chain(WRITE).copied().collect(),
            Role::VIEWER => READ.to_vec(),
            _ => Vec::new(),
        };
        for p in granted {
            if !perms.iter().any(|q| q.as_str() == p) {
                perms.push(Permission::new(p));
            }
        }
    }
    perms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_gets_wildcard() {
        let perms = permissions_for(&[Role::admin()]);
        assert_eq!(perms.len(), 1);
        assert!(perms[0].is_wildcard());
    }

    #[test]
    fn agent_cannot_manage_users() {
        let perms = permissions_for(&[Role::agent()]);
        assert!(perms.iter().any(|p| p.as_str() == Permission::RESERVATIONS_WRITE));
        assert!(!perms.iter().any(|p| p.as_str() == Permission::USERS_MANAGE));
    }

    #[test]
    fn viewer_is_read_only() {
        let perms = permissions_for(&[Role::viewer()]);
        assert!(perms.iter().all(|p| p.as_str().ends_with(".read")));
    }

    #[test]
    fn unknown_role_gets_nothing() {
        assert!(permissions_for(&[Role::new("intern")]).is_empty());
    }

    #[test]
    fn overlapping_roles_do_not_duplicate() {
        let perms = permissions_for(&[Role::agent(), Role::viewer()]);
        let reads = perms
            .iter()
            .filter(|p| p.as_str() == Permission::CUSTOMERS_READ)
            .count();
        assert_eq!(reads, 1);
    }
}
