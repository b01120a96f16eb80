//! Postgres-backed document store.
//!
//! All collections share one `documents` table (see `schema.sql`):
//! `(collection, id)` primary key, a JSONB `body`, and the extracted unique
//! keys `code`, `email_key`, `phone_key` with partial unique indexes.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Duplicate(key)` from the violated index |
//! | Database (other) | any other | `Backend` |
//! | PoolClosed / other | N/A | `Backend` |

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::instrument;
use uuid::Uuid;

use super::filter::{Clause, GroupKey, GroupRow, Page, RecordFilter};
use super::{Document, RecordStore, StoreError, UniqueKey};

/// Postgres document store for one collection.
pub struct PostgresRecordStore<D> {
    pool: Arc<PgPool>,
    _doc: PhantomData<fn() -> D>,
}

impl<D> PostgresRecordStore<D> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
            _doc: PhantomData,
        }
    }
}

impl<D> Clone for PostgresRecordStore<D> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _doc: PhantomData,
        }
    }
}

/// Escape `%`, `_` and `\` so the needle matches literally inside `ILIKE`.
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn push_clause(qb: &mut QueryBuilder<'_, Postgres>, clause: &Clause) {
    match clause {
        Clause::Eq(field, value) => {
            qb.push("(body -> ")
                .push_bind(field.clone())
                .push(") = ")
                .push_bind(value.clone())
                .push("::jsonb");
        }
        Clause::In(field, values) => {
            if values.is_empty() {
                qb.push("FALSE");
                return;
            }
            qb.push("(");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push("(body -> ")
                    .push_bind(field.clone())
                    .push(") = ")
                    .push_bind(value.clone())
                    .push("::jsonb");
            }
            qb.push(")");
        }
        Clause::Contains(field, needle) => {
            qb.push("(body ->> ")
                .push_bind(field.clone())
                .push(") ILIKE ")
                .push_bind(like_pattern(needle));
        }
        Clause::AnyOf(clauses) => {
            if clauses.is_empty() {
                qb.push("TRUE");
                return;
            }
            qb.push("(");
            for (i, c) in clauses.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                push_clause(qb, c);
            }
            qb.push(")");
        }
        Clause::CreatedBetween(from, to) => {
            qb.push("(TRUE");
            if let Some(from) = from {
                qb.push(" AND created_at >= ").push_bind(*from);
            }
            if let Some(to) = to {
                qb.push(" AND created_at <= ").push_bind(*to);
            }
            qb.push(")");
        }
    }
}

fn push_where(qb: &mut QueryBuilder<'_, Postgres>, collection: &str, filter: &RecordFilter) {
    qb.push(" WHERE collection = ").push_bind(collection.to_string());
    for clause in filter.clauses() {
        qb.push(" AND ");
        push_clause(qb, clause);
    }
}

/// Unique index behind a 23505 violation; `None` for anything that is not
/// one of the three business keys (the primary key included).
fn unique_key_for(constraint: Option<&str>) -> Option<UniqueKey> {
    match constraint? {
        "documents_code_key" => Some(UniqueKey::Code),
        "documents_email_key" => Some(UniqueKey::Email),
        "documents_phone_key" => Some(UniqueKey::Phone),
        _ => None,
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                if let Some(key) = unique_key_for(db_err.constraint()) {
                    return StoreError::Duplicate(key);
                }
            }
            StoreError::Backend(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

fn decode<D: Document>(row: &sqlx::postgres::PgRow) -> Result<D, StoreError> {
    let body: JsonValue = row
        .try_get("body")
        .map_err(|e| StoreError::Serialization(format!("failed to read body: {e}")))?;
    Ok(serde_json::from_value(body)?)
}

#[async_trait::async_trait]
impl<D: Document> RecordStore<D> for PostgresRecordStore<D> {
    #[instrument(skip(self, filter), fields(collection = D::COLLECTION), err)]
    async fn count(&self, filter: &RecordFilter) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS total FROM documents");
        push_where(&mut qb, D::COLLECTION, filter);

        let row = qb
            .build()
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count", e))?;
        let total: i64 = row
            .try_get("total")
            .map_err(|e| StoreError::Backend(format!("failed to read count: {e}")))?;
        Ok(total.max(0) as u64)
    }

    #[instrument(skip(self, filter), fields(collection = D::COLLECTION), err)]
    async fn find(&self, filter: &RecordFilter, page: Page) -> Result<Vec<D>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT body FROM documents");
        push_where(&mut qb, D::COLLECTION, filter);
        qb.push(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = page.limit {
            qb.push(" LIMIT ").push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if page.offset > 0 {
            qb.push(" OFFSET ").push_bind(i64::try_from(page.offset).unwrap_or(i64::MAX));
        }

        let rows = qb
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find", e))?;
        rows.iter().map(decode).collect()
    }

    #[instrument(skip(self, id), fields(collection = D::COLLECTION), err)]
    async fn get(&self, id: D::Id) -> Result<Option<D>, StoreError> {
        let id: Uuid = id.into();
        let row = sqlx::query("SELECT body FROM documents WHERE collection = $1 AND id = $2")
            .bind(D::COLLECTION)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;
        row.as_ref().map(decode).transpose()
    }

    #[instrument(skip(self, doc), fields(collection = D::COLLECTION, id = %doc.key()), err)]
    async fn insert(&self, doc: D) -> Result<D, StoreError> {
        let body = serde_json::to_value(&doc)?;
        let contact = doc.contact_keys();
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, code, email_key, phone_key, body, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, now())
            "#,
        )
        .bind(D::COLLECTION)
        .bind(doc.key())
        .bind(doc.code())
        .bind(contact.email)
        .bind(contact.phone)
        .bind(body)
        .bind(doc.created_at())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert", e))?;
        Ok(doc)
    }

    #[instrument(skip(self, doc), fields(collection = D::COLLECTION, id = %doc.key()), err)]
    async fn update(&self, doc: D) -> Result<D, StoreError> {
        let body = serde_json::to_value(&doc)?;
        let contact = doc.contact_keys();
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET code = $3, email_key = $4, phone_key = $5, body = $6, updated_at = now()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(D::COLLECTION)
        .bind(doc.key())
        .bind(doc.code())
        .bind(contact.email)
        .bind(contact.phone)
        .bind(body)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(doc)
    }

    #[instrument(skip(self, id), fields(collection = D::COLLECTION), err)]
    async fn delete(&self, id: D::Id) -> Result<bool, StoreError> {
        let id: Uuid = id.into();
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(D::COLLECTION)
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, filter), fields(collection = D::COLLECTION), err)]
    async fn group(
        &self,
        filter: &RecordFilter,
        key: GroupKey,
        sum_field: Option<&str>,
    ) -> Result<Vec<GroupRow>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        match &key {
            GroupKey::Field(field) => {
                qb.push("(body ->> ").push_bind(field.clone()).push(")");
            }
            GroupKey::CreatedMonth => {
                qb.push("to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM')");
            }
        }
        qb.push(" AS bucket, COUNT(*) AS n, ");
        match sum_field {
            Some(field) => {
                qb.push("COALESCE(SUM((body ->> ")
                    .push_bind(field.to_string())
                    .push(")::float8), 0)::float8");
            }
            None => {
                qb.push("0::float8");
            }
        }
        qb.push(" AS total FROM documents");
        push_where(&mut qb, D::COLLECTION, filter);
        qb.push(" GROUP BY 1");

        let rows = qb
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("group", e))?;

        rows.iter()
            .map(|row| {
                let read = |e: sqlx::Error| StoreError::Backend(format!("failed to read group row: {e}"));
                let key: Option<String> = row.try_get("bucket").map_err(read)?;
                let count: i64 = row.try_get("n").map_err(read)?;
                let total: f64 = row.try_get("total").map_err(read)?;
                let count = count.max(0) as u64;
                Ok(GroupRow {
                    key,
                    count,
                    total,
                    average: if count == 0 { 0.0 } else { total / count as f64 },
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("cairo"), "%cairo%");
    }

    #[test]
    fn constraint_names_map_to_keys() {
        assert_eq!(unique_key_for(Some("documents_email_key")), Some(UniqueKey::Email));
        assert_eq!(unique_key_for(Some("documents_phone_key")), Some(UniqueKey::Phone));
        assert_eq!(unique_key_for(Some("documents_code_key")), Some(UniqueKey::Code));
    }

    #[test]
    fn other_constraints_are_not_business_keys() {
        assert_eq!(unique_key_for(Some("documents_pkey")), None);
        assert_eq!(unique_key_for(Some("code_sequences_pkey")), None);
        assert_eq!(unique_key_for(None), None);
    }

    #[test]
    fn where_clause_binds_field_names() {
        let filter = RecordFilter::new()
            .eq("status", "pending")
            .contains("destination", Some("luxor"));
        let mut qb = QueryBuilder::<Postgres>::new("SELECT body FROM documents");
        push_where(&mut qb, "reservations", &filter);
        assert_eq!(
            qb.sql(),
            "SELECT body FROM documents WHERE collection = $1 AND (body -> $2) = $3::jsonb AND (body ->> $4) ILIKE $5"
        );
    }
}
