//! # Contract ABI Encoding
//!
//! Just enough of the Solidity ABI to call the batch registry contract:
//! static `bytes32` / `uint256` / `address` words and one dynamic `string`
//! argument. Function selectors are the first four bytes of the Keccak-256
//! hash of the canonical signature.

use harvest_core::{Fingerprint, LedgerAddress};
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Signature of the write function.
pub const REGISTER_BATCH_SIGNATURE: &str = "registerBatch(string,bytes32)";
/// Signature of the read function.
pub const GET_BATCH_HASH_SIGNATURE: &str = "getBatchHash(string)";

const WORD: usize = 32;

/// Failure to decode a contract return value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbiError {
    #[error("return data is not hex: {0}")]
    NotHex(String),
    #[error("return data too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },
    #[error("uint256 value does not fit in 64 bits")]
    Overflow,
}

/// Four-byte function selector for a canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Calldata for `registerBatch(id, fingerprint)`, `0x`-prefixed.
pub fn encode_register_batch(batch_id: &str, fingerprint: &Fingerprint) -> String {
    let mut out = Vec::with_capacity(4 + WORD * 4);
    out.extend_from_slice(&selector(REGISTER_BATCH_SIGNATURE));
    // Head: offset of the string tail (two head words), then the bytes32.
    out.extend_from_slice(&uint_word(2 * WORD as u64));
    out.extend_from_slice(fingerprint.as_bytes());
    out.extend_from_slice(&string_tail(batch_id));
    to_hex(&out)
}

/// Calldata for `getBatchHash(id)`, `0x`-prefixed.
pub fn encode_get_batch_hash(batch_id: &str) -> String {
    let mut out = Vec::with_capacity(4 + WORD * 3);
    out.extend_from_slice(&selector(GET_BATCH_HASH_SIGNATURE));
    out.extend_from_slice(&uint_word(WORD as u64));
    out.extend_from_slice(&string_tail(batch_id));
    to_hex(&out)
}

/// Decoded `(bytes32, uint256, address)` return of `getBatchHash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchHashReturn {
    pub fingerprint: Fingerprint,
    /// Unix seconds; zero when never registered.
    pub timestamp: u64,
    /// `None` for the zero address.
    pub registrar: Option<LedgerAddress>,
}

/// Decode the return data of `getBatchHash`.
pub fn decode_get_batch_hash(data: &str) -> Result<BatchHashReturn, AbiError> {
    let bytes = from_hex(data)?;
    if bytes.len() < 3 * WORD {
        return Err(AbiError::TooShort {
            expected: 3 * WORD,
            actual: bytes.len(),
        });
    }

    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes[..WORD]);

    let ts_word = &bytes[WORD..2 * WORD];
    if ts_word[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(AbiError::Overflow);
    }
    let mut ts = [0u8; 8];
    ts.copy_from_slice(&ts_word[WORD - 8..]);

    let addr_word = &bytes[2 * WORD..3 * WORD];
    let addr_hex: String = addr_word[12..].iter().map(|b| format!("{b:02x}")).collect();
    let registrar = LedgerAddress::parse(&format!("0x{addr_hex}"))
        .ok()
        .filter(|a| *a != LedgerAddress::zero());

    Ok(BatchHashReturn {
        fingerprint: Fingerprint::from_bytes(hash),
        timestamp: u64::from_be_bytes(ts),
        registrar,
    })
}

/// Parse a JSON-RPC hex quantity such as `"0x1b4"`.
pub fn parse_quantity(value: &str) -> Option<u64> {
    let digits = value.strip_prefix("0x")?;
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

fn uint_word(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

fn string_tail(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let padded = bytes.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(WORD + padded);
    out.extend_from_slice(&uint_word(bytes.len() as u64));
    out.extend_from_slice(bytes);
    out.resize(WORD + padded, 0);
    out
}

fn to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(2 + bytes.len() * 2);
    s.push_str("0x");
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

fn from_hex(data: &str) -> Result<Vec<u8>, AbiError> {
    let digits = data.strip_prefix("0x").unwrap_or(data);
    if digits.len() % 2 != 0 {
        return Err(AbiError::NotHex(data.to_string()));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| AbiError::NotHex(data.to_string()))
        })
        .collect()
}
