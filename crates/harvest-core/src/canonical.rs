//! # Canonical Serialization: Stripped, Sorted, JCS Bytes
//!
//! This module defines `CanonicalBytes`, the sole construction path for bytes
//! that feed a batch fingerprint.
//!
//! ## Canonical Form Invariant
//!
//! Two logically equal batch records produce byte-identical canonical output,
//! regardless of mapping key insertion order and regardless of whether an
//! optional field is `null`, `""`, an array or object that becomes empty after
//! filtering, or simply absent. Every fingerprint ever anchored depends on
//! this holding.
//!
//! ## Pipeline
//!
//! 1. **Strip provenance**: the top-level fields in [`PROVENANCE_FIELDS`] are
//!    written after fingerprinting and are removed by name before anything else.
//! 2. **Eliminate empties**: `null` and `""` are removed from their parent.
//!    Arrays drop empty elements; objects drop empty members. An array or
//!    object left with nothing is itself empty and is removed from *its*
//!    parent, so `[]` and `{}` never reach the output.
//! 3. **Pass scalars through**: `0`, `false`, and whitespace-only strings
//!    are content, not emptiness.
//! 4. **Serialize with JCS** (RFC 8785) via `serde_jcs`: sorted keys, compact
//!    separators, ECMAScript number formatting. The number format is the one
//!    `JSON.stringify` produces, so registrations made by other encoders
//!    re-hash bit-exactly.
//!
//! Integers beyond 2^53 are read the way `JSON.parse` reads them, as the
//! nearest IEEE-754 double, so `12345678901234567890` hashes as
//! `12345678901234567000`.
//!
//! A root that normalizes to nothing serializes as `null`.
//!
//! ## Legacy Profile
//!
//! [`CanonicalProfile::KeyOrderOnly`] reproduces an older client-side encoder
//! that sorted keys but neither stripped empties nor removed provenance. It
//! is never used to register or verify; [`profiles_diverge`] exists so that
//! records whose two encodings disagree can be flagged.

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::error::CanonicalizationError;

/// Top-level fields excluded from the fingerprint.
pub const PROVENANCE_FIELDS: [&str; 6] = [
    "batch_hash",
    "blockchain_tx_hash",
    "blockchain_timestamp",
    "blockchain_registrar",
    "created_at",
    "updated_at",
];

/// Which canonicalization rules to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CanonicalProfile {
    /// Provenance stripped, empties eliminated, keys sorted. Used for every
    /// registration and verification.
    #[default]
    Strict,
    /// Keys sorted only; nothing removed.
    KeyOrderOnly,
}

impl CanonicalProfile {
    /// Stable identifier used on the command line and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::KeyOrderOnly => "key-order-only",
        }
    }
}

impl std::fmt::Display for CanonicalProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CanonicalProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Self::Strict),
            "key-order-only" => Ok(Self::KeyOrderOnly),
            other => Err(format!(
                "unknown canonical profile {other:?} (expected strict or key-order-only)"
            )),
        }
    }
}

/// Bytes produced exclusively by the canonicalization pipeline.
///
/// # Invariants
///
/// - The inner buffer is private; construction goes through
///   [`CanonicalBytes::new()`] or [`CanonicalBytes::with_profile()`].
/// - Output is valid UTF-8 JSON with sorted keys and no insignificant
///   whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable batch record with the strict profile.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::SerializationFailed` if the value cannot
    /// be represented as JSON (e.g. a map with non-string keys).
    pub fn new(record: &impl Serialize) -> Result<Self, CanonicalizationError> {
        Self::with_profile(record, CanonicalProfile::Strict)
    }

    /// Canonicalize with an explicit profile.
    pub fn with_profile(
        record: &impl Serialize,
        profile: CanonicalProfile,
    ) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(record)?;
        let prepared = match profile {
            CanonicalProfile::Strict => normalize(strip_provenance(value)),
            CanonicalProfile::KeyOrderOnly => Some(value),
        };
        let prepared = prepared.map(to_double_precision).unwrap_or(Value::Null);
        let bytes = serialize_canonical(&prepared)?;
        Ok(Self(bytes))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The canonical text. Always valid UTF-8 by construction.
    pub fn as_str(&self) -> &str {
        // serde_jcs writes into a String, so the buffer is UTF-8.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Remove provenance fields from a top-level object. Nested objects are
/// untouched: a farmer entry with its own `created_at` is content.
pub fn strip_provenance(value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            for field in PROVENANCE_FIELDS {
                map.remove(field);
            }
            Value::Object(map)
        }
        other => other,
    }
}

/// Recursively eliminate empty values. `None` means the value is empty and
/// must be removed from its parent.
pub fn normalize(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(items) => {
            let kept: Vec<Value> = items.into_iter().filter_map(normalize).collect();
            if kept.is_empty() {
                None
            } else {
                Some(Value::Array(kept))
            }
        }
        Value::Object(map) => {
            let kept: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| normalize(v).map(|v| (k, v)))
                .collect();
            if kept.is_empty() {
                None
            } else {
                Some(Value::Object(kept))
            }
        }
        scalar => Some(scalar),
    }
}

/// Largest integer a double holds exactly.
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Round integers outside the double-exact range to the nearest double.
fn to_double_precision(value: Value) -> Value {
    match value {
        Value::Number(n) => {
            let exceeds = match (n.as_u64(), n.as_i64()) {
                (Some(u), _) => u > MAX_SAFE_INTEGER,
                (None, Some(i)) => i.unsigned_abs() > MAX_SAFE_INTEGER,
                (None, None) => false,
            };
            match n.as_f64().and_then(Number::from_f64) {
                Some(rounded) if exceeds => Value::Number(rounded),
                _ => Value::Number(n),
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(to_double_precision).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, to_double_precision(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Whether the strict and key-order-only encodings of a record differ.
///
/// A `true` result means a verifier built on the legacy encoder would report
/// this record as tampered even though it is intact.
pub fn profiles_diverge(record: &impl Serialize) -> Result<bool, CanonicalizationError> {
    let strict = CanonicalBytes::with_profile(record, CanonicalProfile::Strict)?;
    let legacy = CanonicalBytes::with_profile(record, CanonicalProfile::KeyOrderOnly)?;
    Ok(strict != legacy)
}

/// Serialize a JSON value in JCS-canonical form (RFC 8785).
fn serialize_canonical(value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
    let s = serde_jcs::to_string(value)?;
    Ok(s.into_bytes())
}
