//! Human-readable business codes (`RES000001`, `SUP000045`, `INV000007`).
//!
//! This module holds the pure formatting rules. Drawing the sequence number
//! from storage lives in `ehm-infra`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum number of digits in the numeric part of a code.
pub const CODE_WIDTH: usize = 6;

/// What to do when a sequence number cannot be obtained from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Abort the creation and surface the storage failure.
    Propagate,
    /// Derive a code from the current time instead.
    Timestamp,
}

/// Entity families that receive a generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodePrefix {
    Reservation,
    Supplier,
    Invoice,
}

impl CodePrefix {
    pub const fn as_str(self) -> &'static str {
        match self {
            CodePrefix::Reservation => "RES",
            CodePrefix::Supplier => "SUP",
            CodePrefix::Invoice => "INV",
        }
    }

    /// Collection whose documents carry codes with this prefix.
    pub const fn collection(self) -> &'static str {
        match self {
            CodePrefix::Reservation => "reservations",
            CodePrefix::Supplier => "suppliers",
            CodePrefix::Invoice => "invoices",
        }
    }

    /// Only reservations fall back to a time-derived code.
    pub fn fallback_policy(self) -> FallbackPolicy {
        match self {
            CodePrefix::Reservation => FallbackPolicy::Timestamp,
            CodePrefix::Supplier | CodePrefix::Invoice => FallbackPolicy::Propagate,
        }
    }
}

impl core::fmt::Display for CodePrefix {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format `prefix + zeroPad(sequence, 6)`. Wider sequences are kept whole.
pub fn format_code(prefix: CodePrefix, sequence: u64) -> String {
    format!("{}{:0width$}", prefix.as_str(), sequence, width = CODE_WIDTH)
}

/// Code for the next document given how many already exist in the collection.
pub fn allocate(prefix: CodePrefix, existing_count: u64) -> String {
    format_code(prefix, existing_count.saturating_add(1))
}

/// Time-derived code: the prefix followed by the last six digits of the epoch
/// milliseconds at `now`.
pub fn fallback_code(prefix: CodePrefix, now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().unsigned_abs();
    format_code(prefix, millis % 1_000_000)
}

/// Whether `code` is `prefix` followed by at least six ASCII digits.
pub fn is_well_formed(prefix: CodePrefix, code: &str) -> bool {
    code.strip_prefix(prefix.as_str())
        .is_some_and(|digits| digits.len() >= CODE_WIDTH && digits.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn first_code_in_empty_collection() {
        assert_eq!(allocate(CodePrefix::Reservation, 0), "RES000001");
        assert_eq!(allocate(CodePrefix::Supplier, 44), "SUP000045");
        assert_eq!(allocate(CodePrefix::Invoice, 6), "INV000007");
    }

    #[test]
    fn wide_sequences_are_not_truncated() {
        assert_eq!(format_code(CodePrefix::Invoice, 1_234_567), "INV1234567");
    }

    #[test]
    fn fallback_uses_last_six_millisecond_digits() {
        let now = Utc.timestamp_millis_opt(1_700_000_123_456).unwrap();
        assert_eq!(fallback_code(CodePrefix::Reservation, now), "RES123456");

        let small = Utc.timestamp_millis_opt(1_700_000_000_042).unwrap();
        assert_eq!(fallback_code(CodePrefix::Reservation, small), "RES000042");
    }

    #[test]
    fn only_reservations_fall_back() {
        assert_eq!(CodePrefix::Reservation.fallback_policy(), FallbackPolicy::Timestamp);
        assert_eq!(CodePrefix::Supplier.fallback_policy(), FallbackPolicy::Propagate);
        assert_eq!(CodePrefix::Invoice.fallback_policy(), FallbackPolicy::Propagate);
    }

    #[test]
    fn well_formed_checks_prefix_and_digits() {
        assert!(is_well_formed(CodePrefix::Supplier, "SUP000001"));
        assert!(!is_well_formed(CodePrefix::Supplier, "RES000001"));
        assert!(!is_well_formed(CodePrefix::Supplier, "SUP00001"));
        assert!(!is_well_formed(CodePrefix::Supplier, "SUP00000A"));
    }

    proptest! {
        #[test]
        fn sequential_allocation_is_ordered_and_well_formed(count in 0u64..999_998) {
            let a = allocate(CodePrefix::Reservation, count);
            let b = allocate(CodePrefix::Reservation, count + 1);
            prop_assert!(is_well_formed(CodePrefix::Reservation, &a));
            prop_assert_eq!(a.len(), 9);
            prop_assert!(a < b);
        }

        #[test]
        fn fallback_is_always_six_digits(millis in 0i64..4_102_444_800_000) {
            let now = Utc.timestamp_millis_opt(millis).unwrap();
            let code = fallback_code(CodePrefix::Reservation, now);
            prop_assert!(is_well_formed(CodePrefix::Reservation, &code));
            prop_assert_eq!(code.len(), 9);
        }
    }
}
