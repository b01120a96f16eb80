//! Infrastructure layer: document stores, code sequences, config, DB wiring
//! and the supplier workbook codec.

pub mod code_allocator;
pub mod config;
pub mod db;
pub mod duplicate_guard;
pub mod sequence;
pub mod spreadsheet;
pub mod store;

pub use code_allocator::CodeAllocator;
pub use config::{AdminSeed, ConfigError, LogFormat, PortalConfig};
pub use duplicate_guard::find_duplicate;
pub use sequence::{InMemorySequenceStore, PostgresSequenceStore, SequenceStore};
pub use store::{
    Document, InMemoryRecordStore, PostgresRecordStore, RecordStore, StoreError, UniqueKey,
};
