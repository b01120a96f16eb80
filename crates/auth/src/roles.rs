use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier used for RBAC.
///
/// Roles are opaque strings at this layer; [`crate::permissions::permissions_for`]
/// maps the known ones to permissions and grants nothing to the rest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: &'static str = "admin";
    pub const AGENT: &'static str = "agent";
    pub const VIEWER: &'static str = "viewer";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn admin() -> Self {
        Self::new(Self::ADMIN)
    }

    pub fn agent() -> Self {
        Self::new(Self::AGENT)
    }

    pub fn viewer() -> Self {
        Self::new(Self::VIEWER)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        self.as_str() == Self::ADMIN
    }

    /// Whether this is one of the roles the portal assigns permissions to.
    pub fn is_known(&self) -> bool {
        matches!(self.as_str(), Self::ADMIN | Self::AGENT | Self::VIEWER)
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::agent()
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
