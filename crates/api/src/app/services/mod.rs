//! Service wiring: stores, code allocation and the per-entity operations
//! the route handlers call.
//!
//! The default wiring is in-memory. Set `USE_PERSISTENT_STORES=true` and
//! `DATABASE_URL` to back every collection with Postgres.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use ehm_accounting::LedgerAccount;
use ehm_auth::UserAccount;
use ehm_bookings::Reservation;
use ehm_core::date::{parse_date, parse_date_end};
use ehm_core::RecordId;
use ehm_infra::store::GroupRow;
use ehm_infra::{
    db, CodeAllocator, InMemoryRecordStore, InMemorySequenceStore, PortalConfig,
    PostgresRecordStore, PostgresSequenceStore, RecordStore,
};
use ehm_invoicing::Invoice;
use ehm_parties::{Customer, Supplier};

use crate::app::errors::{Resource, ServiceError};

pub mod customers;
pub mod invoices;
pub mod ledgers;
pub mod reports;
pub mod reservations;
pub mod suppliers;
pub mod users;

/// Which storage backend the services run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    InMemory,
    Postgres,
}

impl Backend {
    /// Status string reported by the health endpoint.
    pub fn status(self) -> &'static str {
        match self {
            Backend::InMemory => "In-memory",
            Backend::Postgres => "Connected",
        }
    }
}

/// Application services (shared across requests).
pub struct AppServices {
    pub customers: Arc<dyn RecordStore<Customer>>,
    pub suppliers: Arc<dyn RecordStore<Supplier>>,
    pub reservations: Arc<dyn RecordStore<Reservation>>,
    pub invoices: Arc<dyn RecordStore<Invoice>>,
    pub ledgers: Arc<dyn RecordStore<LedgerAccount>>,
    pub users: Arc<dyn RecordStore<UserAccount>>,
    pub codes: CodeAllocator,
    pub backend: Backend,
}

impl AppServices {
    pub fn in_memory() -> Self {
        Self {
            customers: Arc::new(InMemoryRecordStore::new()),
            suppliers: Arc::new(InMemoryRecordStore::new()),
            reservations: Arc::new(InMemoryRecordStore::new()),
            invoices: Arc::new(InMemoryRecordStore::new()),
            ledgers: Arc::new(InMemoryRecordStore::new()),
            users: Arc::new(InMemoryRecordStore::new()),
            codes: CodeAllocator::new(Arc::new(InMemorySequenceStore::new())),
            backend: Backend::InMemory,
        }
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            customers: Arc::new(PostgresRecordStore::new(pool.clone())),
            suppliers: Arc::new(PostgresRecordStore::new(pool.clone())),
            reservations: Arc::new(PostgresRecordStore::new(pool.clone())),
            invoices: Arc::new(PostgresRecordStore::new(pool.clone())),
            ledgers: Arc::new(PostgresRecordStore::new(pool.clone())),
            users: Arc::new(PostgresRecordStore::new(pool.clone())),
            codes: CodeAllocator::new(Arc::new(PostgresSequenceStore::new(pool))),
            backend: Backend::Postgres,
        }
    }
}

/// Build services from configuration.
pub async fn build_services(config: &PortalConfig) -> anyhow::Result<AppServices> {
    match &config.database_url {
        Some(url) => {
            let pool = db::connect(url).await?;
            info!("using Postgres stores");
            Ok(AppServices::postgres(pool))
        }
        None => {
            info!("using in-memory stores");
            Ok(AppServices::in_memory())
        }
    }
}

/// Parse a path id, reporting a malformed one as a 400.
pub fn parse_id(resource: Resource, raw: &str) -> Result<RecordId, ServiceError> {
    raw.parse()
        .map_err(|_| ServiceError::BadRequest(format!("Invalid {} id", resource.label().to_lowercase())))
}

/// Parse optional date-range bounds from query parameters.
///
/// A bare `YYYY-MM-DD` upper bound covers that whole day.
pub fn date_range(
    from: (&str, Option<&str>),
    to: (&str, Option<&str>),
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), ServiceError> {
    let start = match from.1 {
        None => None,
        Some(raw) => Some(
            parse_date(raw).ok_or_else(|| ServiceError::BadRequest(format!("Invalid {}", from.0)))?,
        ),
    };
    let end = match to.1 {
        None => None,
        Some(raw) => Some(
            parse_date_end(raw).ok_or_else(|| ServiceError::BadRequest(format!("Invalid {}", to.0)))?,
        ),
    };
    Ok((start, end))
}

/// One `{key, count}` bucket of a statistics breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountRow {
    pub key: Option<String>,
    pub count: u64,
}

/// Buckets sorted by count descending (key ascending on ties), optionally truncated.
pub fn by_count(rows: Vec<GroupRow>, limit: Option<usize>) -> Vec<CountRow> {
    let mut rows: Vec<CountRow> = rows
        .into_iter()
        .map(|r| CountRow {
            key: r.key,
            count: r.count,
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
    rows
}
