//! Free-text input cleanup.

/// Trim; blank becomes `None`.
pub fn clean(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Trimmed value of a field already checked with `Violations::require`.
pub fn required(value: Option<String>) -> String {
    clean(value).unwrap_or_default()
}
