//! Document store boundary.
//!
//! Every portal collection (customers, suppliers, reservations, ...) is stored
//! as JSON documents behind [`RecordStore`]. Implementations:
//! - [`InMemoryRecordStore`]: tests/dev
//! - [`PostgresRecordStore`]: one JSONB `documents` table shared by all collections
//!
//! Both enforce the same unique keys (generated code, normalized email and
//! phone) so a write that races past a service-level pre-check is still
//! rejected with [`StoreError::Duplicate`].

pub mod documents;
pub mod filter;
pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use ehm_core::{ContactKeys, Entity};

pub use filter::{search_fields, Clause, GroupKey, GroupRow, Page, RecordFilter};
pub use in_memory::InMemoryRecordStore;
pub use postgres::PostgresRecordStore;

/// Which unique key a write collided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniqueKey {
    Code,
    Email,
    Phone,
}

impl core::fmt::Display for UniqueKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            UniqueKey::Code => "code",
            UniqueKey::Email => "email",
            UniqueKey::Phone => "phone",
        })
    }
}

/// Store operation error.
///
/// Infrastructure errors, as opposed to domain validation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate {0}")]
    Duplicate(UniqueKey),

    #[error("record not found")]
    NotFound,

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        StoreError::Serialization(value.to_string())
    }
}

/// A record that can live in a [`RecordStore`].
pub trait Document:
    Entity<Id: Into<Uuid> + From<Uuid>> + Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
    /// Collection (and sequence) name.
    const COLLECTION: &'static str;

    /// Generated or user-supplied code that must be unique in the collection.
    fn code(&self) -> Option<&str> {
        None
    }

    /// Contact keys that must be unique in the collection.
    fn contact_keys(&self) -> ContactKeys {
        ContactKeys::default()
    }

    fn key(&self) -> Uuid {
        self.id().into()
    }
}

/// Async, collection-scoped document store.
#[async_trait::async_trait]
pub trait RecordStore<D: Document>: Send + Sync {
    async fn count(&self, filter: &RecordFilter) -> Result<u64, StoreError>;

    /// Matching records, newest first.
    async fn find(&self, filter: &RecordFilter, page: Page) -> Result<Vec<D>, StoreError>;

    async fn find_one(&self, filter: &RecordFilter) -> Result<Option<D>, StoreError> {
        Ok(self.find(filter, Page::first(1)).await?.into_iter().next())
    }

    async fn get(&self, id: D::Id) -> Result<Option<D>, StoreError>;

    /// Insert a new record; unique keys are checked atomically with the write.
    async fn insert(&self, doc: D) -> Result<D, StoreError>;

    /// Replace an existing record; unique keys are re-checked against the others.
    async fn update(&self, doc: D) -> Result<D, StoreError>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: D::Id) -> Result<bool, StoreError>;

    /// Bucket matching records, counting them and summing `sum_field` (if any).
    async fn group(
        &self,
        filter: &RecordFilter,
        key: GroupKey,
        sum_field: Option<&str>,
    ) -> Result<Vec<GroupRow>, StoreError>;
}

#[async_trait::async_trait]
impl<D, S> RecordStore<D> for Arc<S>
where
    D: Document,
    S: RecordStore<D> + ?Sized,
{
    async fn count(&self, filter: &RecordFilter) -> Result<u64, StoreError> {
        (**self).count(filter).await
    }

    async fn find(&self, filter: &RecordFilter, page: Page) -> Result<Vec<D>, StoreError> {
        (**self).find(filter, page).await
    }

    async fn find_one(&self, filter: &RecordFilter) -> Result<Option<D>, StoreError> {
        (**self).find_one(filter).await
    }

    async fn get(&self, id: D::Id) -> Result<Option<D>, StoreError> {
        (**self).get(id).await
    }

    async fn insert(&self, doc: D) -> Result<D, StoreError> {
        (**self).insert(doc).await
    }

    async fn update(&self, doc: D) -> Result<D, StoreError> {
        (**self).update(doc).await
    }

    async fn delete(&self, id: D::Id) -> Result<bool, StoreError> {
        (**self).delete(id).await
    }

    async fn group(
        &self,
        filter: &RecordFilter,
        key: GroupKey,
        sum_field: Option<&str>,
    ) -> Result<Vec<GroupRow>, StoreError> {
        (**self).group(filter, key, sum_field).await
    }
}
