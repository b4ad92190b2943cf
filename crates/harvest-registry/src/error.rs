use harvest_core::{BatchId, CanonicalizationError, Fingerprint, ValidationError};
use harvest_ledger::LedgerError;
use thiserror::Error;

use crate::lifecycle::LifecycleError;

/// Errors from a [`RecordStore`](crate::RecordStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// A record already exists under this identifier.
    #[error("record {0} already exists")]
    Conflict(BatchId),

    /// Filesystem error.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored document could not be read back as a record.
    #[error("stored record {id} is unreadable: {reason}")]
    Corrupt {
        /// Key of the unreadable document.
        id: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// Backend-specific failure (database driver, connection pool).
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Errors from registry workflows.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Creation input failed validation. Nothing was stored.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The record could not be canonicalized.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    /// A batch with this identifier already exists.
    #[error("batch {0} already exists")]
    AlreadyExists(BatchId),

    /// No batch with this identifier.
    #[error("batch {0} not found")]
    NotFound(BatchId),

    /// The record is not in a state that allows the operation.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// The stored record no longer matches the fingerprint written when it
    /// was registered locally, so anchoring it would anchor an edit.
    #[error("batch {id} changed since local registration: stored {stored}, computed {computed}")]
    FingerprintMismatch {
        id: BatchId,
        stored: Fingerprint,
        computed: Fingerprint,
    },

    /// An operation needs a ledger and none is configured.
    #[error("no ledger is configured")]
    LedgerNotConfigured,

    /// The ledger refused or failed the operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The record store failed.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for RegistryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(id) => Self::AlreadyExists(id),
            other => Self::Store(other),
        }
    }
}
