//! Contact normalization used by duplicate detection.

/// JSON field that holds a record's email.
pub const EMAIL_FIELD: &str = "email";
/// JSON field that holds a record's primary phone number.
pub const PHONE_FIELD: &str = "telephone";

/// Normalized email/phone pair of a record. `None` never collides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ContactKeys {
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ContactKeys {
    pub fn new(email: Option<&str>, phone: Option<&str>) -> Self {
        Self {
            email: email.and_then(normalize_email),
            phone: phone.and_then(normalize_phone),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.phone.is_none()
    }

    /// True when either key is present in both and equal.
    pub fn collides_with(&self, other: &ContactKeys) -> bool {
        let email = matches!((&self.email, &other.email), (Some(a), Some(b)) if a == b);
        let phone = matches!((&self.phone, &other.phone), (Some(a), Some(b)) if a == b);
        email || phone
    }
}

/// Trim and lower-case; blank input yields `None`.
pub fn normalize_email(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

/// Trim; blank input yields `None`.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Loose shape check used by login and user management.
pub fn looks_like_email(raw: &str) -> bool {
    let Some((local, domain)) = raw.trim().split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}
