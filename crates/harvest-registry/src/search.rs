//! Listing and search over stored batches.

use harvest_core::{BatchRecord, Fingerprint, Timestamp};
use serde::{Deserialize, Serialize};

use crate::lifecycle::RecordState;

/// One row of a batch listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: String,
    pub product: Option<String>,
    pub village_name: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub farmer_count: usize,
    pub batch_hash: Option<Fingerprint>,
    pub blockchain_tx_hash: Option<String>,
    pub blockchain_timestamp: Option<Timestamp>,
    pub created_at: Option<Timestamp>,
    pub record_state: RecordState,
}

impl BatchSummary {
    /// Summarize a stored record. Returns `None` for a record with no
    /// `batch_id`, which cannot be addressed anyway.
    pub fn from_record(record: &BatchRecord) -> Option<Self> {
        let owned = |s: Option<&str>| s.map(str::to_string);
        Some(Self {
            batch_id: record.batch_id()?.to_string(),
            product: owned(record.product()),
            village_name: owned(record.village_name()),
            district: owned(record.district()),
            state: owned(record.state()),
            farmer_count: record.farmer_count(),
            batch_hash: record.batch_hash(),
            blockchain_tx_hash: owned(record.blockchain_tx_hash()),
            blockchain_timestamp: record.blockchain_timestamp(),
            created_at: record.created_at(),
            record_state: RecordState::of(record),
        })
    }

    /// Case-insensitive substring match on id, product and village
    /// name, district and state. `needle` must already be lowercase.
    fn matches(&self, needle: &str) -> bool {
        std::iter::once(Some(self.batch_id.as_str()))
            .chain([
                self.product.as_deref(),
                self.village_name.as_deref(),
                self.district.as_deref(),
                self.state.as_deref(),
            ])
            .flatten()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

/// Summaries of `records`, newest `created_at` first. Records without a
/// creation time sort last; ties break on batch id.
pub fn summarize(records: &[BatchRecord]) -> Vec<BatchSummary> {
    let mut rows: Vec<BatchSummary> = records.iter().filter_map(BatchSummary::from_record).collect();
    rows.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.batch_id.cmp(&b.batch_id))
    });
    rows
}

/// Rows from `rows` matching `query`. A blank query matches nothing.
pub fn filter(rows: Vec<BatchSummary>, query: &str) -> Vec<BatchSummary> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    rows.into_iter().filter(|r| r.matches(&needle)).collect()
}
