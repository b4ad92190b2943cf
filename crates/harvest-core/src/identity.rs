//! # Identifier Newtypes
//!
//! Newtype wrappers for the identifiers that cross the store and ledger
//! boundaries. A `BatchId` is the key in the record store and the argument
//! to every ledger call; a `LedgerAddress` is a contract or account address.
//!
//! Both are validated at construction, so code holding one never has to
//! re-check it.

use serde::{Deserialize, Serialize};

use crate::digest::sha256_hex_of;
use crate::error::ValidationError;

/// Maximum length of a batch identifier, in characters.
pub const MAX_BATCH_ID_LEN: usize = 128;

/// Characters that document-store keys cannot contain.
const RESERVED_KEY_CHARS: [char; 6] = ['/', '.', '#', '$', '[', ']'];

/// Caller-supplied unique batch identifier.
///
/// Opaque to the fingerprinting pipeline. Must be non-empty, at most
/// [`MAX_BATCH_ID_LEN`] characters, and free of control characters and of
/// `/ . # $ [ ]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BatchId(String);

impl BatchId {
    /// Validate and wrap a batch identifier.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let reject = |reason: &'static str| ValidationError::InvalidBatchId {
            value: value.clone(),
            reason,
        };
        if value.trim().is_empty() {
            return Err(reject("must not be empty"));
        }
        if value.chars().count() > MAX_BATCH_ID_LEN {
            return Err(reject("must not exceed 128 characters"));
        }
        if value.chars().any(|c| c.is_control()) {
            return Err(reject("contains a control character"));
        }
        if value.chars().any(|c| RESERVED_KEY_CHARS.contains(&c)) {
            return Err(reject("contains a reserved character (/ . # $ [ ])"));
        }
        Ok(Self(value))
    }

    /// Derive a readable identifier from batch metadata.
    ///
    /// `BATCH-` followed by the first 12 hex characters, uppercased, of
    /// SHA-256 over `{product}-{village}-{timestamp_ms}`.
    pub fn generate(product: &str, village_name: &str, timestamp_ms: i64) -> Self {
        let digest = sha256_hex_of(format!("{product}-{village_name}-{timestamp_ms}").as_bytes());
        Self(format!("BATCH-{}", digest[..12].to_uppercase()))
    }

    /// Whether the identifier has the shape produced by [`BatchId::generate`].
    pub fn is_generated_format(&self) -> bool {
        self.0
            .strip_prefix("BATCH-")
            .map(|rest| {
                rest.len() == 12
                    && rest
                        .chars()
                        .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
            })
            .unwrap_or(false)
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BatchId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BatchId> for String {
    fn from(id: BatchId) -> Self {
        id.0
    }
}

impl AsRef<str> for BatchId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An EVM account or contract address: `0x` + 40 hex characters.
///
/// Stored lowercased so that equality is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LedgerAddress(String);

impl LedgerAddress {
    /// The zero address.
    pub fn zero() -> Self {
        Self(format!("0x{}", "0".repeat(40)))
    }

    /// Validate and wrap an address.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let hex = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .ok_or_else(|| ValidationError::InvalidAddress(value.to_string()))?;
        if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::InvalidAddress(value.to_string()));
        }
        Ok(Self(format!("0x{}", hex.to_ascii_lowercase())))
    }

    /// Borrow the lowercase `0x…` form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 20 address bytes as lowercase hex, no prefix.
    pub fn hex_body(&self) -> &str {
        &self.0[2..]
    }
}

impl std::fmt::Display for LedgerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LedgerAddress {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LedgerAddress> for String {
    fn from(addr: LedgerAddress) -> Self {
        addr.0
    }
}
