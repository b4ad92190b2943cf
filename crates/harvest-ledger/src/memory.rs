use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use harvest_core::{BatchId, Fingerprint, LedgerAddress, Timestamp};

use crate::{AnchorReceipt, AnchoredFingerprint, LedgerClient, LedgerError};

#[derive(Debug, Clone)]
struct Registration {
    fingerprint: Fingerprint,
    anchored_at: Timestamp,
}

/// In-process ledger for development and tests.
///
/// Each identifier can be registered once. Block numbers start at 1 and
/// increase by one per registration; transaction references are derived
/// from the registration contents so that runs are reproducible.
///
/// Every registration reports the zero address as its submitter. This
/// provides no durability and no third-party attestation.
#[derive(Debug)]
pub struct MemoryLedger {
    network: String,
    entries: DashMap<BatchId, Registration>,
    next_block: AtomicU64,
    available: AtomicBool,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl MemoryLedger {
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            entries: DashMap::new(),
            next_block: AtomicU64::new(1),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate an outage: while unavailable every call fails with
    /// [`LedgerError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Overwrite an entry directly, bypassing the one-registration rule.
    /// Lets tests model a ledger that disagrees with the store.
    pub fn force_entry(&self, id: BatchId, fingerprint: Fingerprint) {
        self.entries.insert(
            id,
            Registration {
                fingerprint,
                anchored_at: Timestamp::now(),
            },
        );
    }

    /// Number of registered identifiers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check_available(&self) -> Result<(), LedgerError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LedgerError::Unavailable {
                network: self.network.clone(),
                reason: "simulated outage".to_string(),
            })
        }
    }

    fn transaction_ref(&self, id: &BatchId, fingerprint: &Fingerprint, block: u64) -> String {
        let seed = serde_json::json!({
            "network": self.network,
            "batch_id": id.as_str(),
            "fingerprint": fingerprint.to_prefixed_hex(),
            "block": block,
        });
        harvest_core::fingerprint(&seed)
            .map(|fp| fp.to_prefixed_hex())
            .unwrap_or_else(|_| format!("memory-tx-{block}"))
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn register(
        &self,
        id: &BatchId,
        fingerprint: &Fingerprint,
    ) -> Result<AnchorReceipt, LedgerError> {
        self.check_available()?;
        if fingerprint.is_zero() {
            return Err(LedgerError::Rejected(
                "the zero fingerprint cannot be registered".to_string(),
            ));
        }
        let now = Timestamp::now();
        match self.entries.entry(id.clone()) {
            Entry::Occupied(_) => Err(LedgerError::AlreadyRegistered(id.clone())),
            Entry::Vacant(slot) => {
                slot.insert(Registration {
                    fingerprint: *fingerprint,
                    anchored_at: now,
                });
                let block = self.next_block.fetch_add(1, Ordering::SeqCst);
                tracing::debug!(batch_id = %id, block, network = %self.network, "memory ledger registration");
                Ok(AnchorReceipt {
                    transaction_ref: self.transaction_ref(id, fingerprint, block),
                    block_number: block,
                    confirmed_at: now,
                    submitter_address: Some(LedgerAddress::zero()),
                    network: self.network.clone(),
                })
            }
        }
    }

    async fn read_fingerprint(&self, id: &BatchId) -> Result<AnchoredFingerprint, LedgerError> {
        self.check_available()?;
        Ok(match self.entries.get(id) {
            Some(entry) => AnchoredFingerprint {
                fingerprint: entry.fingerprint,
                anchored_at: Some(entry.anchored_at),
                submitter_address: Some(LedgerAddress::zero()),
            },
            None => AnchoredFingerprint::not_anchored(),
        })
    }

    fn network(&self) -> &str {
        &self.network
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(s: &str) -> BatchId {
        BatchId::new(s).unwrap()
    }

    fn fp(n: u64) -> Fingerprint {
        harvest_core::fingerprint(&json!({ "n": n })).unwrap()
    }

    #[tokio::test]
    async fn register_then_read() {
        let ledger = MemoryLedger::new("memory-test");
        let receipt = ledger.register(&id("B1"), &fp(1)).await.unwrap();
        assert_eq!(receipt.block_number, 1);
        assert_eq!(receipt.network, "memory-test");
        assert!(receipt.transaction_ref.starts_with("0x"));

        let anchored = ledger.read_fingerprint(&id("B1")).await.unwrap();
        assert!(anchored.is_anchored());
        assert_eq!(anchored.fingerprint, fp(1));
        assert_eq!(anchored.anchored_at, Some(receipt.confirmed_at));
    }

    #[tokio::test]
    async fn unknown_id_reads_zero() {
        let ledger = MemoryLedger::default();
        let anchored = ledger.read_fingerprint(&id("nope")).await.unwrap();
        assert!(anchored.fingerprint.is_zero());
        assert!(!anchored.is_anchored());
    }

    #[tokio::test]
    async fn blocks_increment() {
        let ledger = MemoryLedger::default();
        for n in 1..=3u64 {
            let r = ledger.register(&id(&format!("B{n}")), &fp(n)).await.unwrap();
            assert_eq!(r.block_number, n);
        }
        assert_eq!(ledger.len(), 3);
    }

    #[tokio::test]
    async fn registration_is_immutable() {
        let ledger = MemoryLedger::default();
        ledger.register(&id("B1"), &fp(1)).await.unwrap();
        let err = ledger.register(&id("B1"), &fp(2)).await.unwrap_err();
        assert_eq!(err, LedgerError::AlreadyRegistered(id("B1")));
        assert_eq!(ledger.read_fingerprint(&id("B1")).await.unwrap().fingerprint, fp(1));
    }

    #[tokio::test]
    async fn zero_fingerprint_rejected() {
        let ledger = MemoryLedger::default();
        assert!(matches!(
            ledger.register(&id("B1"), &Fingerprint::ZERO).await,
            Err(LedgerError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn outage_fails_every_call() {
        let ledger = MemoryLedger::default();
        ledger.register(&id("B1"), &fp(1)).await.unwrap();
        ledger.set_available(false);
        let err = ledger.read_fingerprint(&id("B1")).await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(ledger.register(&id("B2"), &fp(2)).await.is_err());
        ledger.set_available(true);
        assert!(ledger.read_fingerprint(&id("B1")).await.is_ok());
    }

    #[tokio::test]
    async fn lookup_folds_errors() {
        let ledger = MemoryLedger::default();
        ledger.set_available(false);
        let lookup = crate::lookup(&ledger, &id("B1")).await;
        assert!(matches!(lookup, harvest_core::AnchorLookup::Unavailable { .. }));
    }

    #[tokio::test]
    async fn transaction_refs_are_reproducible() {
        let a = MemoryLedger::new("n");
        let b = MemoryLedger::new("n");
        let ra = a.register(&id("B1"), &fp(1)).await.unwrap();
        let rb = b.register(&id("B1"), &fp(1)).await.unwrap();
        assert_eq!(ra.transaction_ref, rb.transaction_ref);
    }
}
