use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::filter::{GroupKey, GroupRow, Page, RecordFilter};
use super::{Document, RecordStore, StoreError, UniqueKey};

struct Stored<D> {
    doc: D,
    body: JsonValue,
}

/// In-memory document store for tests/dev.
///
/// Unique keys are checked under the same write lock as the insert/update,
/// so concurrent writers cannot both persist a colliding record.
pub struct InMemoryRecordStore<D> {
    inner: RwLock<HashMap<Uuid, Stored<D>>>,
}

impl<D> InMemoryRecordStore<D> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<D> Default for InMemoryRecordStore<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> core::fmt::Debug for InMemoryRecordStore<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryRecordStore").finish_non_exhaustive()
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("in-memory store lock poisoned".to_string())
}

/// First unique key `doc` shares with any record other than itself.
fn collision<D: Document>(map: &HashMap<Uuid, Stored<D>>, doc: &D) -> Option<UniqueKey> {
    let key = doc.key();
    let code = doc.code();
    let contact = doc.contact_keys();

    for (id, other) in map {
        if *id == key {
            continue;
        }
        if code.is_some() && other.doc.code() == code {
            return Some(UniqueKey::Code);
        }
        let theirs = other.doc.contact_keys();
        if contact.email.is_some() && contact.email == theirs.email {
            return Some(UniqueKey::Email);
        }
        if contact.phone.is_some() && contact.phone == theirs.phone {
            return Some(UniqueKey::Phone);
        }
    }
    None
}

fn newest_first<D: Document>(a: &&Stored<D>, b: &&Stored<D>) -> core::cmp::Ordering {
    b.doc
        .created_at()
        .cmp(&a.doc.created_at())
        .then_with(|| b.doc.key().cmp(&a.doc.key()))
}

fn month_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}

fn group_key(body: &JsonValue, created_at: DateTime<Utc>, key: &GroupKey) -> Option<String> {
    match key {
        GroupKey::Field(field) => match body.get(field) {
            Some(JsonValue::String(s)) => Some(s.clone()),
            Some(JsonValue::Null) | None => None,
            Some(other) => Some(other.to_string()),
        },
        GroupKey::CreatedMonth => Some(month_key(created_at)),
    }
}

#[async_trait::async_trait]
impl<D: Document> RecordStore<D> for InMemoryRecordStore<D> {
    async fn count(&self, filter: &RecordFilter) -> Result<u64, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map
            .values()
            .filter(|s| filter.matches(&s.body, s.doc.created_at()))
            .count() as u64)
    }

    async fn find(&self, filter: &RecordFilter, page: Page) -> Result<Vec<D>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        let mut matching: Vec<&Stored<D>> = map
            .values()
            .filter(|s| filter.matches(&s.body, s.doc.created_at()))
            .collect();
        matching.sort_by(newest_first);

        let skip = usize::try_from(page.offset).unwrap_or(usize::MAX);
        let take = page
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        Ok(matching
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|s| s.doc.clone())
            .collect())
    }

    async fn get(&self, id: D::Id) -> Result<Option<D>, StoreError> {
        let id: Uuid = id.into();
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).map(|s| s.doc.clone()))
    }

    async fn insert(&self, doc: D) -> Result<D, StoreError> {
        let body = serde_json::to_value(&doc)?;
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        if map.contains_key(&doc.key()) {
            return Err(StoreError::Backend(format!("record {} already exists", doc.key())));
        }
        if let Some(key) = collision(&map, &doc) {
            return Err(StoreError::Duplicate(key));
        }
        map.insert(doc.key(), Stored { doc: doc.clone(), body });
        Ok(doc)
    }

    async fn update(&self, doc: D) -> Result<D, StoreError> {
        let body = serde_json::to_value(&doc)?;
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        if !map.contains_key(&doc.key()) {
            return Err(StoreError::NotFound);
        }
        if let Some(key) = collision(&map, &doc) {
            return Err(StoreError::Duplicate(key));
        }
        map.insert(doc.key(), Stored { doc: doc.clone(), body });
        Ok(doc)
    }

    async fn delete(&self, id: D::Id) -> Result<bool, StoreError> {
        let id: Uuid = id.into();
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        Ok(map.remove(&id).is_some())
    }

    async fn group(
        &self,
        filter: &RecordFilter,
        key: GroupKey,
        sum_field: Option<&str>,
    ) -> Result<Vec<GroupRow>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        let mut buckets: BTreeMap<Option<String>, (u64, f64)> = BTreeMap::new();

        for stored in map.values() {
            let created_at = stored.doc.created_at();
            if !filter.matches(&stored.body, created_at) {
                continue;
            }
            let amount = sum_field
                .and_then(|f| stored.body.get(f))
                .and_then(JsonValue::as_f64)
                .unwrap_or(0.0);
            let bucket = buckets
                .entry(group_key(&stored.body, created_at, &key))
                .or_insert((0, 0.0));
            bucket.0 += 1;
            bucket.1 += amount;
        }

        Ok(buckets
            .into_iter()
            .map(|(key, (count, total))| GroupRow {
                key,
                count,
                total,
                average: if count == 0 { 0.0 } else { total / count as f64 },
            })
            .collect())
    }
}
