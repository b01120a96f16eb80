//! Pre-insert duplicate detection on normalized email/phone.

use serde_json::Value as JsonValue;
use uuid::Uuid;

use ehm_core::contact::{EMAIL_FIELD, PHONE_FIELD};
use ehm_core::ContactKeys;

use crate::store::{Clause, Document, RecordFilter, RecordStore, StoreError, UniqueKey};

/// Which key of `candidate` is already used by another record, if any.
///
/// Blank keys never match. `exclude` skips the record being updated. The
/// store's own unique keys back this check up against concurrent writers.
pub async fn find_duplicate<D: Document>(
    store: &dyn RecordStore<D>,
    candidate: &ContactKeys,
    exclude: Option<Uuid>,
) -> Result<Option<UniqueKey>, StoreError> {
    let mut any = Vec::new();
    if let Some(email) = &candidate.email {
        any.push(Clause::Eq(EMAIL_FIELD.to_string(), JsonValue::from(email.as_str())));
    }
    if let Some(phone) = &candidate.phone {
        any.push(Clause::Eq(PHONE_FIELD.to_string(), JsonValue::from(phone.as_str())));
    }
    if any.is_empty() {
        return Ok(None);
    }

    let matches = store
        .find(&RecordFilter::new().any_of(any), crate::store::Page::first(2))
        .await?;

    Ok(matches
        .into_iter()
        .filter(|doc| Some(doc.key()) != exclude)
        .find_map(|doc| {
            let theirs = doc.contact_keys();
            if candidate.email.is_some() && candidate.email == theirs.email {
                Some(UniqueKey::Email)
            } else if candidate.phone.is_some() && candidate.phone == theirs.phone {
                Some(UniqueKey::Phone)
            } else {
                None
            }
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRecordStore;
    use chrono::Utc;
    use ehm_parties::{Customer, NewCustomer};

    fn customer(email: &str, phone: &str) -> Customer {
        NewCustomer {
            customer_name: Some("Test".into()),
            telephone: Some(phone.into()),
            email: Some(email.into()),
            country: Some("Egypt".into()),
            ..NewCustomer::default()
        }
        .into_customer(None, Utc::now())
        .unwrap()
    }

    #[tokio::test]
    async fn email_match_ignores_case() {
        let store = InMemoryRecordStore::<Customer>::new();
        store.insert(customer("a@x.com", "111")).await.unwrap();

        let hit = find_duplicate(&store, &ContactKeys::new(Some("A@X.COM"), Some("999")), None)
            .await
            .unwrap();
        assert_eq!(hit, Some(UniqueKey::Email));
    }

    #[tokio::test]
    async fn phone_match_is_trimmed() {
        let store = InMemoryRecordStore::<Customer>::new();
        store.insert(customer("a@x.com", "111")).await.unwrap();

        let hit = find_duplicate(&store, &ContactKeys::new(None, Some(" 111 ")), None)
            .await
            .unwrap();
        assert_eq!(hit, Some(UniqueKey::Phone));
    }

    #[tokio::test]
    async fn blank_keys_never_match() {
        let store = InMemoryRecordStore::<Customer>::new();
        store.insert(customer("a@x.com", "111")).await.unwrap();

        let hit = find_duplicate(&store, &ContactKeys::new(Some("  "), None), None)
            .await
            .unwrap();
        assert_eq!(hit, None);
    }

    #[tokio::test]
    async fn the_record_itself_is_excluded() {
        let store = InMemoryRecordStore::<Customer>::new();
        let existing = store.insert(customer("a@x.com", "111")).await.unwrap();

        let hit = find_duplicate(&store, &existing.contact_keys(), Some(existing.key()))
            .await
            .unwrap();
        assert_eq!(hit, None);
    }
}
