//! # harvest-ledger: Anchoring Fingerprints on a Public Ledger
//!
//! The [`LedgerClient`] trait is the seam between the registration
//! workflows and whatever ledger holds the anchored fingerprints. Clients
//! are constructed explicitly and passed in; there is no process-wide
//! client.
//!
//! ## Implementations
//!
//! - [`MemoryLedger`]: in-process, for development and tests. Supports a
//!   simulated outage.
//! - [`EvmLedger`] (feature `evm`): JSON-RPC client for the batch registry
//!   contract. Transaction signing is delegated to the RPC endpoint's
//!   managed `from` account; this crate holds no keys.
//!
//! ## Contract
//!
//! ```solidity
//! function registerBatch(string _batchId, bytes32 _hash) public;
//! function getBatchHash(string _batchId) public view
//!     returns (bytes32, uint256, address);
//! ```
//!
//! `getBatchHash` returns the all-zero hash for an identifier that was
//! never registered.

use async_trait::async_trait;
use harvest_core::{AnchorLookup, BatchId, Fingerprint, LedgerAddress, Timestamp};
use serde::{Deserialize, Serialize};

mod error;
mod memory;

#[cfg(feature = "evm")]
pub mod abi;
#[cfg(feature = "evm")]
mod evm;

pub use error::LedgerError;
pub use memory::MemoryLedger;

#[cfg(feature = "evm")]
pub use evm::{EvmLedger, EvmLedgerConfig};

/// Proof that a fingerprint was written to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorReceipt {
    /// Transaction hash or equivalent reference.
    pub transaction_ref: String,
    /// Block containing the transaction.
    pub block_number: u64,
    /// When the client observed confirmation.
    pub confirmed_at: Timestamp,
    /// Account that submitted the transaction, when the ledger reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitter_address: Option<LedgerAddress>,
    /// Network the receipt came from.
    pub network: String,
}

/// What the ledger holds for one batch identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchoredFingerprint {
    /// [`Fingerprint::ZERO`] when nothing was ever registered.
    pub fingerprint: Fingerprint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchored_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitter_address: Option<LedgerAddress>,
}

impl AnchoredFingerprint {
    /// The answer for an identifier that was never registered.
    pub fn not_anchored() -> Self {
        Self {
            fingerprint: Fingerprint::ZERO,
            anchored_at: None,
            submitter_address: None,
        }
    }

    pub fn is_anchored(&self) -> bool {
        !self.fingerprint.is_zero()
    }
}

impl From<AnchoredFingerprint> for AnchorLookup {
    fn from(anchored: AnchoredFingerprint) -> Self {
        if anchored.is_anchored() {
            AnchorLookup::Anchored {
                fingerprint: anchored.fingerprint,
                anchored_at: anchored.anchored_at,
                submitter: anchored.submitter_address,
            }
        } else {
            AnchorLookup::NotAnchored
        }
    }
}

/// A ledger that stores one immutable fingerprint per batch identifier.
#[async_trait]
pub trait LedgerClient: Send + Sync + std::fmt::Debug {
    /// Record `fingerprint` under `id`.
    ///
    /// Returns only once the write is confirmed. An `Ok` for a write that
    /// did not land would let a record claim an anchor it does not have.
    async fn register(
        &self,
        id: &BatchId,
        fingerprint: &Fingerprint,
    ) -> Result<AnchorReceipt, LedgerError>;

    /// Read what is anchored under `id`.
    async fn read_fingerprint(&self, id: &BatchId) -> Result<AnchoredFingerprint, LedgerError>;

    /// Network name, for logs and receipts.
    fn network(&self) -> &str;
}

/// Query the ledger and fold any failure into [`AnchorLookup::Unavailable`].
pub async fn lookup(ledger: &dyn LedgerClient, id: &BatchId) -> AnchorLookup {
    match ledger.read_fingerprint(id).await {
        Ok(anchored) => anchored.into(),
        Err(e) => {
            tracing::warn!(
                batch_id = %id,
                network = ledger.network(),
                error = %e,
                "ledger read failed"
            );
            AnchorLookup::Unavailable {
                reason: e.to_string(),
            }
        }
    }
}
