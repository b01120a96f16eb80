//! Composable record filters.
//!
//! Filters address records by their serialized (camelCase JSON) field names so
//! the same filter runs against the in-memory store and the Postgres JSONB store.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

/// One filter condition. A record matches a [`RecordFilter`] when it matches
/// every clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Field equals the JSON value exactly.
    Eq(String, JsonValue),
    /// Field equals one of the JSON values.
    In(String, Vec<JsonValue>),
    /// String field contains the needle, ignoring case.
    Contains(String, String),
    /// At least one nested clause matches.
    AnyOf(Vec<Clause>),
    /// Creation time inside the inclusive bounds.
    CreatedBetween(Option<DateTime<Utc>>, Option<DateTime<Utc>>),
}

impl Clause {
    pub fn matches(&self, body: &JsonValue, created_at: DateTime<Utc>) -> bool {
        match self {
            Clause::Eq(field, value) => body.get(field) == Some(value),
            Clause::In(field, values) => body.get(field).is_some_and(|v| values.contains(v)),
            Clause::Contains(field, needle) => body
                .get(field)
                .and_then(JsonValue::as_str)
                .is_some_and(|s| s.to_lowercase().contains(&needle.to_lowercase())),
            Clause::AnyOf(clauses) => clauses.iter().any(|c| c.matches(body, created_at)),
            Clause::CreatedBetween(from, to) => {
                from.is_none_or(|from| created_at >= from) && to.is_none_or(|to| created_at <= to)
            }
        }
    }
}

/// Conjunction of clauses; the empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    clauses: Vec<Clause>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn and(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn eq(self, field: &str, value: impl Into<JsonValue>) -> Self {
        self.and(Clause::Eq(field.to_string(), value.into()))
    }

    /// Adds an exact-match clause when `value` is present.
    pub fn eq_opt(self, field: &str, value: Option<impl Into<JsonValue>>) -> Self {
        match value {
            Some(v) => self.eq(field, v),
            None => self,
        }
    }

    pub fn is_in(self, field: &str, values: Vec<JsonValue>) -> Self {
        self.and(Clause::In(field.to_string(), values))
    }

    /// Adds a case-insensitive substring clause when `needle` is non-blank.
    pub fn contains(self, field: &str, needle: Option<&str>) -> Self {
        match needle.map(str::trim).filter(|n| !n.is_empty()) {
            Some(n) => self.and(Clause::Contains(field.to_string(), n.to_string())),
            None => self,
        }
    }

    /// Adds an OR-group; an empty group is skipped.
    pub fn any_of(self, clauses: Vec<Clause>) -> Self {
        if clauses.is_empty() {
            self
        } else {
            self.and(Clause::AnyOf(clauses))
        }
    }

    pub fn created_between(self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        if from.is_none() && to.is_none() {
            self
        } else {
            self.and(Clause::CreatedBetween(from, to))
        }
    }

    pub fn matches(&self, body: &JsonValue, created_at: DateTime<Utc>) -> bool {
        self.clauses.iter().all(|c| c.matches(body, created_at))
    }
}

/// Case-insensitive substring clauses for one needle over several fields.
pub fn search_fields(fields: &[&str], needle: &str) -> Vec<Clause> {
    let needle = needle.trim();
    if needle.is_empty() {
        return Vec::new();
    }
    fields
        .iter()
        .map(|f| Clause::Contains((*f).to_string(), needle.to_string()))
        .collect()
}

/// Offset/limit window over a newest-first listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub limit: Option<u64>,
}

impl Page {
    pub fn all() -> Self {
        Self {
            offset: 0,
            limit: None,
        }
    }

    pub fn first(limit: u64) -> Self {
        Self {
            offset: 0,
            limit: Some(limit),
        }
    }

    /// 1-based page number of `limit` records.
    pub fn numbered(page: u64, limit: u64) -> Self {
        Self {
            offset: page.saturating_sub(1).saturating_mul(limit),
            limit: Some(limit),
        }
    }
}

/// How [`crate::store::RecordStore::group`] buckets records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKey {
    /// The string value of a field (missing or null collapses into a `None` key).
    Field(String),
    /// `YYYY-MM` of the creation time, UTC.
    CreatedMonth,
}

/// One bucket of an aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub key: Option<String>,
    pub count: u64,
    pub total: f64,
    pub average: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn body() -> JsonValue {
        json!({
            "customerName": "Ahmed Ali",
            "email": "ahmed@example.com",
            "customerType": "Individual",
            "country": "Egypt",
        })
    }

    #[test]
    fn empty_filter_matches_all() {
        assert!(RecordFilter::new().matches(&body(), Utc::now()));
    }

    #[test]
    fn eq_and_contains() {
        let now = Utc::now();
        let f = RecordFilter::new()
            .eq("customerType", "Individual")
            .contains("country", Some("EGY"));
        assert!(f.matches(&body(), now));

        let f = RecordFilter::new().eq("customerType", "Corporate");
        assert!(!f.matches(&body(), now));
    }

    #[test]
    fn blank_needles_are_ignored() {
        let f = RecordFilter::new().contains("country", Some("  ")).any_of(Vec::new());
        assert!(f.clauses().is_empty());
    }

    #[test]
    fn any_of_search() {
        let f = RecordFilter::new().any_of(search_fields(&["customerName", "email"], "EXAMPLE"));
        assert!(f.matches(&body(), Utc::now()));
        let f = RecordFilter::new().any_of(search_fields(&["customerName"], "example"));
        assert!(!f.matches(&body(), Utc::now()));
    }

    #[test]
    fn membership_and_missing_fields() {
        let f = RecordFilter::new().is_in("status", vec![json!("confirmed"), json!("completed")]);
        assert!(!f.matches(&body(), Utc::now()));
        assert!(f.matches(&json!({"status": "completed"}), Utc::now()));
    }

    #[test]
    fn created_bounds_are_inclusive() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let f = RecordFilter::new().created_between(Some(at), Some(at));
        assert!(f.matches(&body(), at));
        assert!(!f.matches(&body(), at + Duration::seconds(1)));
        assert!(RecordFilter::new().created_between(None, None).clauses().is_empty());
    }

    #[test]
    fn numbered_pages() {
        assert_eq!(Page::numbered(1, 10).offset, 0);
        assert_eq!(Page::numbered(3, 10).offset, 20);
        assert_eq!(Page::numbered(0, 10).offset, 0);
    }
}
