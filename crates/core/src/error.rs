//! Domain error model.

use serde::Serialize;
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// A single rejected input field, reported back to the caller as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Storage and transport failures belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// One or more input fields failed validation.
    #[error("validation failed: {}", summarize(.0))]
    InvalidFields(Vec<FieldError>),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A uniqueness rule was violated (duplicate contact, duplicate code).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFields(vec![FieldError::new(field, message)])
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Accumulates field violations so a caller sees every problem at once.
#[derive(Debug, Default)]
pub struct Violations(Vec<FieldError>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    /// Require a non-blank string.
    pub fn require(&mut self, field: &str, value: Option<&str>, message: &str) {
        if value.map(str::trim).unwrap_or_default().is_empty() {
            self.push(field, message);
        }
    }

    /// Require a finite, non-negative amount (if present).
    pub fn non_negative(&mut self, field: &str, value: Option<f64>) {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                self.push(field, format!("{field} must be a non-negative number"));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> DomainResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(DomainError::InvalidFields(self.0))
        }
    }
}

/// Parse an optional enum-like string field, recording a violation on failure.
pub fn parse_choice<T: core::str::FromStr>(
    violations: &mut Violations,
    field: &str,
    value: Option<&str>,
    allowed: &str,
) -> Option<T> {
    let raw = value.map(str::trim).filter(|s| !s.is_empty())?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            violations.push(field, format!("{field} must be one of: {allowed}"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_all_violations() {
        let mut v = Violations::new();
        v.require("name", None, "Name is required");
        v.require("city", Some("   "), "City is required");
        v.require("country", Some("Egypt"), "Country is required");
        v.non_negative("amount", Some(-1.0));
        v.non_negative("taxAmount", Some(f64::NAN));

        let err = v.into_result().unwrap_err();
        let DomainError::InvalidFields(fields) = err else {
            panic!("expected field errors");
        };
        let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, vec!["name", "city", "amount", "taxAmount"]);
    }

    #[test]
    fn empty_violations_are_ok() {
        assert!(Violations::new().into_result().is_ok());
    }

    #[test]
    fn parse_choice_records_unknown_values() {
        #[derive(Debug, PartialEq)]
        struct Yes;
        impl core::str::FromStr for Yes {
            type Err = ();
            fn from_str(s: &str) -> Result<Self, ()> {
                if s == "yes" { Ok(Yes) } else { Err(()) }
            }
        }

        let mut v = Violations::new();
        assert_eq!(parse_choice::<Yes>(&mut v, "answer", Some("yes"), "yes"), Some(Yes));
        assert_eq!(parse_choice::<Yes>(&mut v, "answer", None, "yes"), None);
        assert!(v.is_empty());
        assert_eq!(parse_choice::<Yes>(&mut v, "answer", Some("no"), "yes"), None);
        assert!(!v.is_empty());
    }
}
