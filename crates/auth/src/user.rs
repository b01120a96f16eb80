//! Portal user accounts.
//!
//! Storage lives elsewhere; this module only owns the record shape, input
//! validation and the public (hash-free) view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ehm_core::contact::{looks_like_email, normalize_email};
use ehm_core::{DomainError, DomainResult, Entity, UserId, Violations};

use crate::password::{hash_password, PasswordError};
use crate::Role;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserError {
    #[error(transparent)]
    Invalid(#[from] DomainError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// A stored user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for UserAccount {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl UserAccount {
    pub fn view(&self) -> UserView {
        UserView {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// What the API returns for a user: everything but the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create input for a user. All fields optional so validation can report each one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

fn check_role(violations: &mut Violations, role: Option<&str>) -> Option<Role> {
    let raw = role.map(str::trim).filter(|r| !r.is_empty())?;
    let role = Role::new(raw.to_lowercase());
    if role.is_known() {
        Some(role)
    } else {
        violations.push("role", "role must be one of: admin, agent, viewer");
        None
    }
}

fn check_password(violations: &mut Violations, password: Option<&str>) {
    if password.is_some_and(|p| p.len() < MIN_PASSWORD_LEN) {
        violations.push(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        );
    }
}

impl NewUser {
    pub fn into_account(self, now: DateTime<Utc>) -> Result<UserAccount, UserError> {
        let mut v = Violations::new();
        v.require("name", self.name.as_deref(), "Name is required");
        let email = self.email.as_deref().and_then(normalize_email);
        match email.as_deref() {
            None => v.push("email", "Email is required"),
            Some(e) if !looks_like_email(e) => v.push("email", "Please provide a valid email"),
            Some(_) => {}
        }
        v.require("password", self.password.as_deref(), "Password is required");
        check_password(&mut v, self.password.as_deref());
        let role = check_role(&mut v, self.role.as_deref());
        v.into_result()?;

        let hash = hash_password(self.password.as_deref().unwrap_or_default())?;

        Ok(UserAccount {
            id: UserId::new(),
            name: self.name.unwrap_or_default().trim().to_string(),
            email: email.unwrap_or_default(),
            password_hash: hash,
            role: role.unwrap_or_default(),
            is_active: self.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update for a user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

impl UserPatch {
    /// Apply onto `user`. Returns the plain password to hash when one was supplied.
    pub fn apply(self, user: &mut UserAccount, now: DateTime<Utc>) -> DomainResult<Option<String>> {
        let mut v = Violations::new();
        if self.name.is_some() {
            v.require("name", self.name.as_deref(), "Name cannot be empty");
        }
        let email = self.email.as_deref().map(normalize_email);
        if let Some(e) = &email {
            if !e.as_deref().is_some_and(looks_like_email) {
                v.push("email", "Please provide a valid email");
            }
        }
        check_password(&mut v, self.password.as_deref());
        let role = check_role(&mut v, self.role.as_deref());
        v.into_result()?;

        if let Some(name) = self.name {
            user.name = name.trim().to_string();
        }
        if let Some(Some(email)) = email {
            user.email = email;
        }
        if let Some(role) = role {
            user.role = role;
        }
        if let Some(active) = self.is_active {
            user.is_active = active;
        }
        user.updated_at = now;
        Ok(self.password)
    }
}
