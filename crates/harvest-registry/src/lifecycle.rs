//! # Record Lifecycle
//!
//! ```text
//! UNREGISTERED ──▶ REGISTERED_LOCAL ──▶ ANCHORED
//! ```
//!
//! The state is not stored separately; it is read off the record's
//! provenance fields. A record with a `batch_hash` is registered locally;
//! one that also has a `blockchain_tx_hash` is anchored.
//!
//! Transitions only move forward one step. Editing non-provenance fields of
//! an anchored record is not prevented here; verification reports it as
//! `TAMPERED`.

use harvest_core::BatchRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordState {
    /// Stored without a fingerprint.
    Unregistered,
    /// Fingerprint computed and stored, not yet on the ledger.
    RegisteredLocal,
    /// Fingerprint confirmed on the ledger.
    Anchored,
}

impl RecordState {
    /// Derive the state from a stored record.
    pub fn of(record: &BatchRecord) -> Self {
        match (record.batch_hash(), record.blockchain_tx_hash()) {
            (Some(_), Some(_)) => Self::Anchored,
            (Some(_), None) => Self::RegisteredLocal,
            (None, _) => Self::Unregistered,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unregistered => "UNREGISTERED",
            Self::RegisteredLocal => "REGISTERED_LOCAL",
            Self::Anchored => "ANCHORED",
        }
    }

    /// The only state reachable from this one.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Unregistered => Some(Self::RegisteredLocal),
            Self::RegisteredLocal => Some(Self::Anchored),
            Self::Anchored => None,
        }
    }

    /// Check that moving from `self` to `to` is a single forward step.
    pub fn transition(self, to: RecordState) -> Result<RecordState, LifecycleError> {
        if self.next() == Some(to) {
            Ok(to)
        } else {
            Err(LifecycleError::InvalidTransition { from: self, to })
        }
    }
}

impl std::fmt::Display for RecordState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("invalid record transition: {from} -> {to}")]
    InvalidTransition { from: RecordState, to: RecordState },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: serde_json::Value) -> BatchRecord {
        BatchRecord::from_value(v).unwrap()
    }

    #[test]
    fn state_from_provenance() {
        let fp = harvest_core::fingerprint(&json!({"a": 1})).unwrap().to_string();
        assert_eq!(RecordState::of(&record(json!({"batch_id": "B1"}))), RecordState::Unregistered);
        assert_eq!(
            RecordState::of(&record(json!({"batch_id": "B1", "batch_hash": fp}))),
            RecordState::RegisteredLocal
        );
        assert_eq!(
            RecordState::of(&record(json!({
                "batch_id": "B1", "batch_hash": fp, "blockchain_tx_hash": "0x01"
            }))),
            RecordState::Anchored
        );
    }

    #[test]
    fn null_or_malformed_provenance_does_not_count() {
        assert_eq!(
            RecordState::of(&record(json!({
                "batch_hash": null, "blockchain_tx_hash": null
            }))),
            RecordState::Unregistered
        );
        assert_eq!(
            RecordState::of(&record(json!({"batch_hash": "0xnothex"}))),
            RecordState::Unregistered
        );
        let fp = harvest_core::fingerprint(&json!({"a": 1})).unwrap().to_string();
        assert_eq!(
            RecordState::of(&record(json!({"batch_hash": fp, "blockchain_tx_hash": ""}))),
            RecordState::RegisteredLocal
        );
    }

    #[test]
    fn forward_steps_allowed() {
        assert_eq!(
            RecordState::Unregistered.transition(RecordState::RegisteredLocal),
            Ok(RecordState::RegisteredLocal)
        );
        assert_eq!(
            RecordState::RegisteredLocal.transition(RecordState::Anchored),
            Ok(RecordState::Anchored)
        );
    }

    #[test]
    fn skipping_and_backwards_rejected() {
        assert!(RecordState::Unregistered.transition(RecordState::Anchored).is_err());
        assert!(RecordState::Anchored.transition(RecordState::RegisteredLocal).is_err());
        assert!(RecordState::Anchored.transition(RecordState::Anchored).is_err());
        assert_eq!(RecordState::Anchored.next(), None);
    }

    #[test]
    fn error_names_both_states() {
        let err = RecordState::Anchored
            .transition(RecordState::Unregistered)
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid record transition: ANCHORED -> UNREGISTERED");
    }
}
