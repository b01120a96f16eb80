use ehm_auth::{Principal, Role, UserAccount};
use ehm_core::UserId;

/// Authenticated user for a request, resolved from the bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    name: String,
    email: String,
    role: Role,
}

impl PrincipalContext {
    /// Built from the stored account, so role changes apply on the next request.
    pub fn from_account(user: &UserAccount) -> Self {
        Self {
            user_id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn principal(&self) -> Principal {
        Principal::from_roles(self.user_id, vec![self.role.clone()])
    }
}
