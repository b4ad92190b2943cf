//! # harvest-cli: Command-Line Tool for Harvest Seal
//!
//! Offline tooling over the same canonicalization and verification code the
//! API service runs, so a record exported from the service can be checked
//! without trusting it.
//!
//! ## Subcommands
//!
//! - `harvest canonicalize`: print the canonical encoding of a record.
//! - `harvest fingerprint`: print the record fingerprint.
//! - `harvest check-profiles`: compare the strict and key-order-only encodings.
//! - `harvest verify`: check a record against an anchored fingerprint or a
//!   live ledger.
//! - `harvest batch-id`: derive a batch identifier from product and village.
//!
//! ```bash
//! harvest fingerprint batch.json
//! harvest verify batch.yaml --anchored 0x015abd...
//! harvest verify batch.json --rpc-url https://rpc-amoy.polygon.technology --contract 0x5Fb...
//! ```

pub mod batch_id;
pub mod fingerprint;
pub mod verify;

use std::io::Read;
use std::path::Path;

use anyhow::Context;
use harvest_core::HarvestError;
use serde_json::Value;

/// Parse a record document. YAML when `path` ends in `.yaml` or `.yml`,
/// JSON otherwise.
pub fn parse_document(text: &str, path: &Path) -> Result<Value, HarvestError> {
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    if is_yaml {
        serde_yaml::from_str(text).map_err(|e| HarvestError::Serialization(e.to_string()))
    } else {
        serde_json::from_str(text).map_err(|e| HarvestError::Serialization(e.to_string()))
    }
}

/// Read and parse a record document. `-` reads JSON from stdin.
pub fn load_document(path: &Path) -> anyhow::Result<Value> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?
    };
    let value = parse_document(&text, path)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded document");
    Ok(value)
}
