//! # harvest-registry: Batch Registration Workflows
//!
//! Orchestrates the lifecycle of a batch record:
//!
//! ```text
//! input ─▶ validate ─▶ fingerprint ─▶ store ─▶ anchor ─▶ verify
//! ```
//!
//! Storage and the ledger are both trait objects supplied by the caller.
//! A ledger failure during creation never loses the stored record; the
//! batch stays `REGISTERED_LOCAL` and can be anchored later with
//! [`BatchRegistry::anchor_existing`].
//!
//! ## Metrics
//!
//! Counters are emitted through the `metrics` facade and are no-ops until
//! the host installs a recorder:
//!
//! - `harvest_verifications_total{outcome}`
//! - `harvest_anchor_failures_total`

pub mod error;
pub mod lifecycle;
pub mod registration;
pub mod search;
pub mod store;

pub use error::{RegistryError, StoreError};
pub use lifecycle::{LifecycleError, RecordState};
pub use registration::{
    BatchRegistry, Readiness, RegistrationOutcome, LEDGER_FAILED_WARNING,
    LEDGER_NOT_CONFIGURED_WARNING, RECONCILED_TRANSACTION_REF,
};
pub use search::{filter, summarize, BatchSummary};
pub use store::{FileRecordStore, MemoryRecordStore, RecordStore};
