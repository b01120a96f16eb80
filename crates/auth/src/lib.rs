//! `ehm-auth`: authentication and authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows how to
//! sign and check tokens, hash passwords and decide permissions, but not where
//! users live.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod user;

pub use authorize::{authorize, AuthzError, Principal};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256Jwt, JwtValidator, TokenError};
pub use password::{hash_password, verify_password, PasswordError};
pub use permissions::Permission;
pub use roles::Role;
pub use user::{NewUser, UserAccount, UserError, UserPatch, UserView};
