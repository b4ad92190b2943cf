//! # Error Types
//!
//! Error hierarchy for the core crate. All errors use `thiserror` for
//! derive-based `Display` and `Error` implementations.
//!
//! - Validation errors name the offending field and the rule it broke.
//! - Canonicalization errors only arise when a Rust value cannot be
//!   represented as a JSON tree at all; every JSON tree canonicalizes.

use thiserror::Error;

/// Top-level error type for the core crate.
#[derive(Error, Debug)]
pub enum HarvestError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Input failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// The value could not be converted into a JSON tree or written as JCS.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Rejected input: malformed identifiers, fingerprints, or records missing
/// mandatory identity fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A mandatory field is absent or blank.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A collection that must have at least one entry is empty.
    #[error("{0} must contain at least one entry")]
    EmptyCollection(&'static str),

    /// A batch identifier failed the key-safety rules.
    #[error("invalid batch id {value:?}: {reason}")]
    InvalidBatchId {
        /// The rejected identifier.
        value: String,
        /// Which rule it broke.
        reason: &'static str,
    },

    /// A fingerprint string is not `0x` followed by 64 hex characters.
    #[error("invalid fingerprint {0:?}: expected 0x followed by 64 hex characters")]
    InvalidFingerprint(String),

    /// A ledger account or contract address is not `0x` + 40 hex characters.
    #[error("invalid ledger address {0:?}: expected 0x followed by 40 hex characters")]
    InvalidAddress(String),

    /// A timestamp could not be parsed.
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        /// The rejected input.
        value: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// The document is not a JSON object at the top level.
    #[error("batch record must be a JSON object")]
    NotAnObject,
}
