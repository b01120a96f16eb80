//! Sequential business-code allocation (`RES000001`, `SUP000001`, ...).

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use ehm_core::code::{fallback_code, format_code};
use ehm_core::{CodePrefix, FallbackPolicy};

use crate::sequence::SequenceStore;
use crate::store::StoreError;

/// Draws the next code for a prefix from the sequence store.
///
/// Codes are assigned once at creation, before the record is persisted.
#[derive(Clone)]
pub struct CodeAllocator {
    sequences: Arc<dyn SequenceStore>,
}

impl CodeAllocator {
    pub fn new(sequences: Arc<dyn SequenceStore>) -> Self {
        Self { sequences }
    }

    /// Next code, or the prefix's fallback when the sequence cannot be read.
    ///
    /// Reservations fall back to a time-derived code; suppliers and invoices
    /// surface the error.
    pub async fn next_code(&self, prefix: CodePrefix) -> Result<String, StoreError> {
        match self.sequences.next_value(prefix.collection()).await {
            Ok(sequence) => Ok(format_code(prefix, sequence)),
            Err(err) => match prefix.fallback_policy() {
                FallbackPolicy::Timestamp => {
                    let code = fallback_code(prefix, Utc::now());
                    warn!(prefix = %prefix, error = %err, code = %code, "code sequence unavailable; using time-based code");
                    Ok(code)
                }
                FallbackPolicy::Propagate => Err(err),
            },
        }
    }
}

impl core::fmt::Debug for CodeAllocator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CodeAllocator").finish_non_exhaustive()
    }
}
