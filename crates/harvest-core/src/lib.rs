//! # harvest-core: Canonical Hashing for Batch Records
//!
//! This crate defines how a batch record becomes a fingerprint and how a
//! stored record is checked against an anchored one. It performs no I/O.
//! Every other crate in the workspace depends on `harvest-core`; it depends
//! on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** All fingerprint computation flows
//!    through `CanonicalBytes::new()`, which strips provenance fields,
//!    drops empty values and serializes with JCS. No raw
//!    `serde_json::to_vec()` feeds a fingerprint.
//!
//! 2. **`sha256_fingerprint()` accepts only `&CanonicalBytes`.** A
//!    fingerprint over non-canonical bytes cannot be written.
//!
//! 3. **Newtype identifiers.** `BatchId` and `LedgerAddress` validate at
//!    construction.
//!
//! 4. **Verification is pure.** `verify()` takes the ledger's answer as a
//!    value and returns one of four outcomes; a ledger outage is an
//!    outcome, not an error.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `harvest-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod record;
pub mod temporal;
pub mod verify;

pub use canonical::{profiles_diverge, CanonicalBytes, CanonicalProfile, PROVENANCE_FIELDS};
pub use digest::{fingerprint, sha256_fingerprint, Fingerprint};
pub use error::{CanonicalizationError, HarvestError, ValidationError};
pub use identity::{BatchId, LedgerAddress, MAX_BATCH_ID_LEN};
pub use record::{
    BatchRecord, CropRotation, FarmerInput, Media, NewBatch, PostHarvestInfo, Range,
    SeasonCalendar, SoilOrganicCarbon, VillageInput, YieldProfile,
};
pub use temporal::Timestamp;
pub use verify::{verify, AnchorLookup, VerificationOutcome, VerificationReport};
