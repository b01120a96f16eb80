//! User accounts: login, the startup admin, and admin-only management.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use ehm_auth::{
    verify_password, hash_password, Hs256Jwt, JwtClaims, NewUser, Role, UserAccount, UserError,
    UserPatch, UserView,
};
use ehm_core::contact::{looks_like_email, normalize_email};
use ehm_core::{FieldError, UserId};
use ehm_infra::store::{Page, RecordFilter};
use ehm_infra::AdminSeed;

use super::AppServices;
use crate::app::errors::{Resource, ServiceError};

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Signs session tokens for successful logins.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    jwt: Hs256Jwt,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(jwt: Hs256Jwt, ttl: Duration) -> Self {
        Self { jwt, ttl }
    }

    pub fn issue(&self, user: &UserAccount) -> Result<String, ServiceError> {
        let claims = JwtClaims::new(user.id, vec![user.role.clone()], Utc::now(), self.ttl);
        self.jwt
            .issue(&claims)
            .map_err(|e| ServiceError::server("signing token", e))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserView,
}

fn user_error(action: &'static str) -> impl FnOnce(UserError) -> ServiceError {
    move |err| match err {
        UserError::Invalid(e) => e.into(),
        UserError::Password(e) => ServiceError::server(action, e),
    }
}

impl AppServices {
    async fn user_by_email(&self, email: &str, action: &'static str) -> Result<Option<UserAccount>, ServiceError> {
        self.users
            .find_one(&RecordFilter::new().eq("email", email))
            .await
            .map_err(ServiceError::store(Resource::User, action))
    }

    /// Check credentials and issue a token.
    ///
    /// Unknown email, wrong password and inactive account all answer with the
    /// same 401.
    pub async fn login(
        &self,
        input: LoginRequest,
        issuer: &TokenIssuer,
    ) -> Result<LoginResponse, ServiceError> {
        let mut errors = Vec::new();
        let email = input.email.as_deref().and_then(normalize_email);
        if !email.as_deref().is_some_and(looks_like_email) {
            errors.push(FieldError::new("email", "Please include a valid email"));
        }
        if input.password.is_none() {
            errors.push(FieldError::new("password", "Password is required"));
        }
        let (Some(email), Some(password), true) = (email, input.password, errors.is_empty()) else {
            return Err(ServiceError::Validation(errors));
        };

        let denied = || ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string());
        let user = self
            .user_by_email(&email, "logging in")
            .await?
            .ok_or_else(denied)?;
        let matches = verify_password(&password, &user.password_hash)
            .map_err(|e| ServiceError::server("logging in", e))?;
        if !matches || !user.is_active {
            warn!(user_id = %user.id, "rejected login");
            return Err(denied());
        }

        let token = issuer.issue(&user)?;
        info!(user_id = %user.id, "user logged in");
        Ok(LoginResponse {
            token,
            user: user.view(),
        })
    }

    pub async fn get_user(&self, id: UserId) -> Result<UserAccount, ServiceError> {
        self.users
            .get(id)
            .await
            .map_err(ServiceError::store(Resource::User, "fetching user"))?
            .ok_or(ServiceError::NotFound(Resource::User))
    }

    pub async fn list_users(&self) -> Result<Vec<UserView>, ServiceError> {
        let users = self
            .users
            .find(&RecordFilter::new(), Page::all())
            .await
            .map_err(ServiceError::store(Resource::User, "fetching users"))?;
        Ok(users.iter().map(UserAccount::view).collect())
    }

    pub async fn create_user(&self, input: NewUser) -> Result<UserView, ServiceError> {
        let account = input
            .into_account(Utc::now())
            .map_err(user_error("creating user"))?;
        if self.user_by_email(&account.email, "creating user").await?.is_some() {
            return Err(ServiceError::Conflict(
                Resource::User.duplicate_message(ehm_infra::UniqueKey::Email),
            ));
        }
        let account = self
            .users
            .insert(account)
            .await
            .map_err(ServiceError::store(Resource::User, "creating user"))?;
        info!(user_id = %account.id, role = %account.role, "user created");
        Ok(account.view())
    }

    pub async fn update_user(&self, id: UserId, patch: UserPatch) -> Result<UserView, ServiceError> {
        let err = || ServiceError::store(Resource::User, "updating user");
        let mut account = self
            .users
            .get(id)
            .await
            .map_err(err())?
            .ok_or(ServiceError::NotFound(Resource::User))?;

        if let Some(password) = patch.apply(&mut account, Utc::now())? {
            account.password_hash =
                hash_password(&password).map_err(|e| ServiceError::server("updating user", e))?;
        }
        let account = self.users.update(account).await.map_err(err())?;
        Ok(account.view())
    }

    /// Delete a user other than `actor`.
    pub async fn delete_user(&self, id: UserId, actor: UserId) -> Result<(), ServiceError> {
        if id == actor {
            return Err(ServiceError::BadRequest(
                "You cannot delete your own account".to_string(),
            ));
        }
        let removed = self
            .users
            .delete(id)
            .await
            .map_err(ServiceError::store(Resource::User, "deleting user"))?;
        if !removed {
            return Err(ServiceError::NotFound(Resource::User));
        }
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    /// Create the initial admin when no admin account exists yet.
    ///
    /// Returns whether an account was created.
    pub async fn ensure_admin(&self, seed: &AdminSeed) -> Result<bool, ServiceError> {
        let admins = RecordFilter::new().eq("role", Role::ADMIN);
        let existing = self
            .users
            .count(&admins)
            .await
            .map_err(ServiceError::store(Resource::User, "creating initial admin"))?;
        if existing > 0 {
            return Ok(false);
        }

        let input = NewUser {
            name: Some(seed.name.clone()),
            email: Some(seed.email.clone()),
            password: Some(seed.password.clone()),
            role: Some(Role::ADMIN.to_string()),
            is_active: Some(true),
        };
        let view = self.create_user(input).await?;
        info!(email = %view.email, "initial admin created");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use ehm_auth::JwtValidator;
    use ehm_infra::PortalConfig;

    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(Hs256Jwt::new("test-secret"), Duration::hours(1))
    }

    async fn seeded() -> AppServices {
        let svc = AppServices::in_memory();
        assert!(svc.ensure_admin(&PortalConfig::for_tests("s").admin).await.unwrap());
        svc
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    #[tokio::test]
    async fn admin_bootstrap_is_idempotent() {
        let svc = seeded().await;
        assert!(!svc.ensure_admin(&PortalConfig::for_tests("s").admin).await.unwrap());
        assert_eq!(svc.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn login_issues_a_token_for_the_user() {
        let svc = seeded().await;
        let issuer = issuer();
        let out = svc
            .login(login("ADMIN@egyptholiday.com", "admin123"), &issuer)
            .await
            .unwrap();
        assert_eq!(out.user.role, Role::admin());

        let claims = Hs256Jwt::new("test-secret").validate(&out.token, Utc::now()).unwrap();
        assert_eq!(claims.sub, out.user.id);
    }

    #[tokio::test]
    async fn bad_credentials_are_indistinguishable() {
        let svc = seeded().await;
        let issuer = issuer();
        for req in [
            login("admin@egyptholiday.com", "wrong-pass"),
            login("nobody@egyptholiday.com", "admin123"),
        ] {
            let err = svc.login(req, &issuer).await.unwrap_err();
            assert!(matches!(err, ServiceError::Unauthorized(m) if m == INVALID_CREDENTIALS));
        }
    }

    #[tokio::test]
    async fn inactive_users_cannot_log_in() {
        let svc = seeded().await;
        let user = svc
            .create_user(NewUser {
                name: Some("Agent".into()),
                email: Some("agent@x.com".into()),
                password: Some("secret1".into()),
                ..NewUser::default()
            })
            .await
            .unwrap();
        svc.update_user(
            user.id,
            UserPatch {
                is_active: Some(false),
                ..UserPatch::default()
            },
        )
        .await
        .unwrap();
        assert!(svc.login(login("agent@x.com", "secret1"), &issuer()).await.is_err());
    }

    #[tokio::test]
    async fn login_validates_shape() {
        let svc = seeded().await;
        let err = svc.login(LoginRequest::default(), &issuer()).await.unwrap_err();
        let ServiceError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields.len(), 2);
    }

    #[tokio::test]
    async fn duplicate_email_and_self_delete_are_rejected() {
        let svc = seeded().await;
        let err = svc
            .create_user(NewUser {
                name: Some("Other".into()),
                email: Some("Admin@EgyptHoliday.com".into()),
                password: Some("secret1".into()),
                ..NewUser::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let admin = svc.list_users().await.unwrap().remove(0);
        assert!(svc.delete_user(admin.id, admin.id).await.is_err());
    }

    #[tokio::test]
    async fn password_change_takes_effect() {
        let svc = seeded().await;
        let admin = svc.list_users().await.unwrap().remove(0);
        svc.update_user(
            admin.id,
            UserPatch {
                password: Some("n3w-pass".into()),
                ..UserPatch::default()
            },
        )
        .await
        .unwrap();
        assert!(svc.login(login("admin@egyptholiday.com", "admin123"), &issuer()).await.is_err());
        assert!(svc.login(login("admin@egyptholiday.com", "n3w-pass"), &issuer()).await.is_ok());
    }
}
