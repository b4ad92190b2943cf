//! # Fingerprints: SHA-256 Over Canonical Bytes
//!
//! Defines `Fingerprint`, the 32-byte content address of a batch record.
//!
//! ## Security Invariant
//!
//! A `Fingerprint` can only be computed from `CanonicalBytes`, so every
//! fingerprint in the system went through the canonicalization pipeline.
//! This is enforced by the signature of [`sha256_fingerprint()`].
//!
//! ## Wire Format
//!
//! `0x` followed by 64 lowercase hex characters. Parsing is case-insensitive.
//! The all-zero value [`Fingerprint::ZERO`] is what the ledger contract
//! returns for an identifier that was never anchored.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::canonical::CanonicalBytes;
use crate::error::{CanonicalizationError, ValidationError};

/// A 256-bit batch fingerprint.
#[derive(Debug, Clone, Copy, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// The "never anchored" sentinel.
    pub const ZERO: Fingerprint = Fingerprint([0u8; 32]);

    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw 32 digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the all-zero sentinel.
    pub fn is_zero(&self) -> bool {
        self.0.ct_eq(&[0u8; 32]).into()
    }

    /// Parse `0x` + 64 hex characters, either case.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidFingerprint` for a missing prefix,
    /// wrong length, or non-hex characters.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidFingerprint(s.to_string());
        let hex = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(invalid)?;
        if hex.len() != 64 {
            return Err(invalid());
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let hi = hex_value(chunk[0]).ok_or_else(invalid)?;
            let lo = hex_value(chunk[1]).ok_or_else(invalid)?;
            bytes[i] = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }

    /// Render as 64 lowercase hex characters, no prefix.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Render in wire format: `0x` + 64 lowercase hex characters.
    pub fn to_prefixed_hex(&self) -> String {
        format!("0x{}", self.to_hex())
    }
}

impl PartialEq for Fingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for Fingerprint {}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_prefixed_hex())
    }
}

impl std::str::FromStr for Fingerprint {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_prefixed_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Compute a SHA-256 fingerprint from canonical bytes.
///
/// Accepts only `&CanonicalBytes`, not raw `&[u8]`, so no code path can
/// fingerprint non-canonical bytes.
pub fn sha256_fingerprint(data: &CanonicalBytes) -> Fingerprint {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    Fingerprint(bytes)
}

/// Canonicalize a record and fingerprint it.
///
/// Deterministic and keyless: the same logical record always yields the
/// same fingerprint.
pub fn fingerprint(record: &impl Serialize) -> Result<Fingerprint, CanonicalizationError> {
    let canonical = CanonicalBytes::new(record)?;
    Ok(sha256_fingerprint(&canonical))
}

/// Lowercase SHA-256 hex of arbitrary bytes. Used for derived identifiers,
/// never for record fingerprints.
pub(crate) fn sha256_hex_of(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fingerprint_is_deterministic() {
        let record = json!({"batch_id": "B1", "product": "rajma"});
        assert_eq!(fingerprint(&record).unwrap(), fingerprint(&record).unwrap());
    }

    #[test]
    fn wire_format_is_prefixed_lowercase_hex() {
        let fp = fingerprint(&json!({"key": "value"})).unwrap();
        let s = fp.to_string();
        assert_eq!(s.len(), 66);
        assert!(s.starts_with("0x"));
        assert!(s[2..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn known_vector_for_simple_record() {
        // SHA-256 of the bytes {"a":1}
        let cb = CanonicalBytes::new(&json!({"a": 1})).unwrap();
        assert_eq!(cb.as_bytes(), br#"{"a":1}"#);
        assert_eq!(
            sha256_fingerprint(&cb).to_hex(),
            "015abd7f5cc57a2dd94b7590f04ad8084273905ee33ec5cebeae62276a97f862"
        );
    }

    #[test]
    fn parse_accepts_uppercase_and_round_trips_lowercase() {
        let fp = fingerprint(&json!({"a": 1})).unwrap();
        let upper = format!("0x{}", fp.to_hex().to_uppercase());
        let parsed = Fingerprint::parse(&upper).unwrap();
        assert_eq!(parsed, fp);
        assert_eq!(parsed.to_prefixed_hex(), fp.to_prefixed_hex());
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(Fingerprint::parse("").is_err());
        assert!(Fingerprint::parse("0x").is_err());
        assert!(Fingerprint::parse(&"a".repeat(64)).is_err());
        assert!(Fingerprint::parse(&format!("0x{}", "a".repeat(63))).is_err());
        assert!(Fingerprint::parse(&format!("0x{}", "g".repeat(64))).is_err());
        assert!(Fingerprint::parse(&format!("0x{}", "ab".repeat(33))).is_err());
    }

    #[test]
    fn zero_sentinel() {
        assert!(Fingerprint::ZERO.is_zero());
        assert_eq!(
            Fingerprint::parse(&format!("0x{}", "0".repeat(64))).unwrap(),
            Fingerprint::ZERO
        );
        assert!(!fingerprint(&json!({"a": 1})).unwrap().is_zero());
    }

    #[test]
    fn serde_uses_wire_format() {
        let fp = fingerprint(&json!({"a": 1})).unwrap();
        let encoded = serde_json::to_value(fp).unwrap();
        assert_eq!(encoded, json!(fp.to_prefixed_hex()));
        let back: Fingerprint = serde_json::from_value(encoded).unwrap();
        assert_eq!(back, fp);
        assert!(serde_json::from_value::<Fingerprint>(json!("nope")).is_err());
    }

    #[test]
    fn different_inputs_different_fingerprints() {
        assert_ne!(
            fingerprint(&json!({"a": 1})).unwrap(),
            fingerprint(&json!({"a": 2})).unwrap()
        );
    }
}
