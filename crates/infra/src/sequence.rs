//! Atomic per-collection counters backing generated codes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sqlx::{PgPool, Row};
use tracing::instrument;

use crate::store::StoreError;

/// Hands out strictly increasing values per name; no value is returned twice.
#[async_trait::async_trait]
pub trait SequenceStore: Send + Sync {
    async fn next_value(&self, name: &str) -> Result<u64, StoreError>;
}

/// Mutex-guarded counters. A fresh store starts every sequence at 1.
#[derive(Debug, Default)]
pub struct InMemorySequenceStore {
    counters: Mutex<HashMap<String, u64>>,
}

impl InMemorySequenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue `name` after `last` (e.g. when records already exist).
    pub fn with_last(self, name: &str, last: u64) -> Self {
        if let Ok(mut counters) = self.counters.lock() {
            counters.insert(name.to_string(), last);
        }
        self
    }
}

#[async_trait::async_trait]
impl SequenceStore for InMemorySequenceStore {
    async fn next_value(&self, name: &str) -> Result<u64, StoreError> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| StoreError::Backend("sequence lock poisoned".to_string()))?;
        let value = counters.entry(name.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }
}

/// `code_sequences` row per name, bumped with a single upsert.
///
/// The first call for a name seeds the counter from the number of documents
/// already in that collection, so existing data sets continue where a
/// count-based numbering would have.
#[derive(Debug, Clone)]
pub struct PostgresSequenceStore {
    pool: Arc<PgPool>,
}

impl PostgresSequenceStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait::async_trait]
impl SequenceStore for PostgresSequenceStore {
    #[instrument(skip(self), err)]
    async fn next_value(&self, name: &str) -> Result<u64, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO code_sequences (name, value)
            VALUES ($1, (SELECT COUNT(*) FROM documents WHERE collection = $1) + 1)
            ON CONFLICT (name) DO UPDATE SET value = code_sequences.value + 1
            RETURNING value
            "#,
        )
        .bind(name)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| StoreError::Backend(format!("sequence {name}: {e}")))?;

        let value: i64 = row
            .try_get("value")
            .map_err(|e| StoreError::Backend(format!("sequence {name}: {e}")))?;
        u64::try_from(value).map_err(|_| StoreError::Backend(format!("sequence {name} is negative")))
    }
}
