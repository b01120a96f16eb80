//! `ehm-core`: domain building blocks for the portal.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the error model, business-code formatting and contact
//! normalization.

pub mod choice;
pub mod code;
pub mod contact;
pub mod date;
pub mod entity;
pub mod error;
pub mod id;
pub mod text;

pub use code::{CodePrefix, FallbackPolicy};
pub use contact::ContactKeys;
pub use entity::Entity;
pub use error::{parse_choice, DomainError, DomainResult, FieldError, Violations};
pub use id::{RecordId, UserId};
