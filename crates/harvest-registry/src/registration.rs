//! # Registration and Verification Workflows
//!
//! [`BatchRegistry`] ties a [`RecordStore`] to an optional [`LedgerClient`].
//!
//! ## Create
//!
//! 1. Validate the input and build the record. Invalid input is never
//!    hashed or stored.
//! 2. Fingerprint it, write `batch_hash`, and insert it
//!    (`REGISTERED_LOCAL`). A duplicate id fails here.
//! 3. Register the fingerprint on the ledger. On success write the receipt
//!    fields (`ANCHORED`). On failure keep the record as it is and report
//!    partial success with a warning; the record is never rolled back.
//!
//! ## Anchor
//!
//! Retries the ledger step for a `REGISTERED_LOCAL` record. A transaction
//! that landed after create gave up on it (a confirmation timeout, or a
//! receipt that could not be stored) is picked up from the ledger's answer
//! instead of being sent twice.
//!
//! ## Verify
//!
//! Always asks the ledger, whatever the local provenance fields say, and
//! hands the answer to [`harvest_core::verify`]. Without a ledger the
//! answer is "not anchored", so the outcome is `NOT_REGISTERED`.

use std::sync::Arc;

use harvest_core::{
    AnchorLookup, BatchId, BatchRecord, Fingerprint, NewBatch, Timestamp, VerificationOutcome,
    VerificationReport,
};
use harvest_ledger::{AnchorReceipt, AnchoredFingerprint, LedgerClient, LedgerError};
use serde::Serialize;

use crate::error::RegistryError;
use crate::lifecycle::RecordState;
use crate::search::{self, BatchSummary};
use crate::store::RecordStore;

/// Warning attached to a create whose ledger step failed.
pub const LEDGER_FAILED_WARNING: &str = "batch stored but ledger registration failed";
/// Warning attached to a create when no ledger is configured.
pub const LEDGER_NOT_CONFIGURED_WARNING: &str = "batch stored but no ledger is configured";

/// Transaction reference written for an anchor found on the ledger rather
/// than confirmed by this service. The ledger's read does not return the
/// transaction hash.
pub const RECONCILED_TRANSACTION_REF: &str = "reconciled";

fn reconciled_receipt(network: &str, existing: AnchoredFingerprint) -> AnchorReceipt {
    AnchorReceipt {
        transaction_ref: RECONCILED_TRANSACTION_REF.to_string(),
        block_number: 0,
        confirmed_at: existing.anchored_at.unwrap_or_else(Timestamp::now),
        submitter_address: existing.submitter_address,
        network: network.to_string(),
    }
}

/// Result of a create or anchor operation.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationOutcome {
    pub batch_id: BatchId,
    pub fingerprint: Fingerprint,
    pub state: RecordState,
    pub record: BatchRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<AnchorReceipt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_error: Option<String>,
    /// The key-order-only encoding of the input differs from the strict one.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub profiles_diverge: bool,
}

impl RegistrationOutcome {
    pub fn is_anchored(&self) -> bool {
        self.state == RecordState::Anchored
    }
}

/// Readiness of the registry's dependencies.
#[derive(Debug, Clone, Serialize)]
pub struct Readiness {
    pub store_reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_error: Option<String>,
    pub ledger_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BatchRegistry {
    store: Arc<dyn RecordStore>,
    ledger: Option<Arc<dyn LedgerClient>>,
}

impl BatchRegistry {
    pub fn new(store: Arc<dyn RecordStore>, ledger: Option<Arc<dyn LedgerClient>>) -> Self {
        if ledger.is_none() {
            tracing::warn!("no ledger configured; batches will stay REGISTERED_LOCAL");
        }
        Self { store, ledger }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn ledger(&self) -> Option<&Arc<dyn LedgerClient>> {
        self.ledger.as_ref()
    }

    /// Register a new batch: store it, then anchor it.
    pub async fn create(&self, input: NewBatch) -> Result<RegistrationOutcome, RegistryError> {
        let now = Timestamp::now();
        let (id, mut record) = input.into_document()?;
        let fingerprint = record.fingerprint()?;

        let profiles_diverge = record.profiles_diverge()?;
        if profiles_diverge {
            metrics::counter!("harvest_profile_divergence_total").increment(1);
            tracing::warn!(
                batch_id = %id,
                "record canonicalizes differently under the key-order-only profile; \
                 older clients will compute a different fingerprint"
            );
        }

        RecordState::Unregistered.transition(RecordState::RegisteredLocal)?;
        record.stamp_created(now);
        record.set_batch_hash(&fingerprint, now);
        self.store.insert(&id, &record).await?;
        tracing::info!(batch_id = %id, fingerprint = %fingerprint, "batch registered locally");

        let local = |record: BatchRecord, warning: &str, ledger_error: Option<String>| RegistrationOutcome {
            batch_id: id.clone(),
            fingerprint,
            state: RecordState::RegisteredLocal,
            record,
            receipt: None,
            warning: Some(warning.to_string()),
            ledger_error,
            profiles_diverge,
        };

        let Some(ledger) = &self.ledger else {
            return Ok(local(record, LEDGER_NOT_CONFIGURED_WARNING, None));
        };

        match ledger.register(&id, &fingerprint).await {
            Ok(receipt) => {
                let mut outcome = self.record_anchor(id.clone(), record, fingerprint, receipt).await?;
                outcome.profiles_diverge = profiles_diverge;
                Ok(outcome)
            }
            Err(e) => {
                metrics::counter!("harvest_anchor_failures_total").increment(1);
                tracing::warn!(
                    batch_id = %id,
                    network = ledger.network(),
                    error = %e,
                    retryable = e.is_unavailable(),
                    "ledger registration failed; batch kept as REGISTERED_LOCAL"
                );
                Ok(local(record, LEDGER_FAILED_WARNING, Some(e.to_string())))
            }
        }
    }

    /// Anchor a batch that was stored but never made it onto the ledger.
    ///
    /// Refuses if the record changed since its fingerprint was written. If
    /// the ledger already holds this fingerprint the receipt fields are
    /// written from its answer and nothing is sent.
    pub async fn anchor_existing(&self, id: &BatchId) -> Result<RegistrationOutcome, RegistryError> {
        let record = self.get(id).await?;
        let state = RecordState::of(&record);
        state.transition(RecordState::Anchored)?;

        let computed = record.fingerprint()?;
        let stored = record.batch_hash().unwrap_or(Fingerprint::ZERO);
        if stored != computed {
            tracing::warn!(
                batch_id = %id,
                stored = %stored,
                computed = %computed,
                "refusing to anchor a record edited after local registration"
            );
            return Err(RegistryError::FingerprintMismatch {
                id: id.clone(),
                stored,
                computed,
            });
        }

        let ledger = self.ledger.as_ref().ok_or(RegistryError::LedgerNotConfigured)?;
        let failed = |e: LedgerError| {
            metrics::counter!("harvest_anchor_failures_total").increment(1);
            tracing::warn!(batch_id = %id, network = ledger.network(), error = %e, "anchoring failed");
            RegistryError::from(e)
        };

        let existing = ledger.read_fingerprint(id).await.map_err(failed)?;
        if existing.is_anchored() {
            if existing.fingerprint != computed {
                return Err(failed(LedgerError::AlreadyRegistered(id.clone())));
            }
            tracing::info!(batch_id = %id, "fingerprint already on the ledger; recording it");
            let receipt = reconciled_receipt(ledger.network(), existing);
            return self.record_anchor(id.clone(), record, computed, receipt).await;
        }

        let receipt = ledger.register(id, &computed).await.map_err(failed)?;
        self.record_anchor(id.clone(), record, computed, receipt).await
    }

    async fn record_anchor(
        &self,
        id: BatchId,
        mut record: BatchRecord,
        fingerprint: Fingerprint,
        receipt: AnchorReceipt,
    ) -> Result<RegistrationOutcome, RegistryError> {
        record.set_anchor(
            &receipt.transaction_ref,
            receipt.confirmed_at,
            receipt.submitter_address.as_ref(),
            Timestamp::now(),
        );
        if let Err(e) = self.store.put(&id, &record).await {
            tracing::error!(
                batch_id = %id,
                tx = %receipt.transaction_ref,
                error = %e,
                "fingerprint anchored but receipt could not be stored"
            );
            return Err(e.into());
        }
        tracing::info!(
            batch_id = %id,
            fingerprint = %fingerprint,
            tx = %receipt.transaction_ref,
            block = receipt.block_number,
            network = %receipt.network,
            "batch anchored"
        );
        Ok(RegistrationOutcome {
            batch_id: id,
            fingerprint,
            state: RecordState::Anchored,
            record,
            receipt: Some(receipt),
            warning: None,
            ledger_error: None,
            profiles_diverge: false,
        })
    }

    pub async fn get(&self, id: &BatchId) -> Result<BatchRecord, RegistryError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    /// Verify the stored record for `id` against the ledger.
    pub async fn verify(&self, id: &BatchId) -> Result<VerificationReport, RegistryError> {
        let record = self.get(id).await?;
        self.verify_record(id, &record).await
    }

    /// Fetch a record together with its verification report.
    pub async fn get_verified(
        &self,
        id: &BatchId,
    ) -> Result<(BatchRecord, VerificationReport), RegistryError> {
        let record = self.get(id).await?;
        let report = self.verify_record(id, &record).await?;
        Ok((record, report))
    }

    async fn verify_record(
        &self,
        id: &BatchId,
        record: &BatchRecord,
    ) -> Result<VerificationReport, RegistryError> {
        let lookup = match &self.ledger {
            Some(ledger) => harvest_ledger::lookup(ledger.as_ref(), id).await,
            None => AnchorLookup::NotAnchored,
        };
        let report = harvest_core::verify(record, &lookup)?;

        metrics::counter!("harvest_verifications_total", "outcome" => report.outcome.as_str())
            .increment(1);
        match report.outcome {
            VerificationOutcome::Tampered => tracing::warn!(
                batch_id = %id,
                computed = %report.computed_fingerprint,
                anchored = ?report.anchored_fingerprint.map(|f| f.to_string()),
                "stored record does not match its anchored fingerprint"
            ),
            VerificationOutcome::VerificationFailed => tracing::warn!(
                batch_id = %id,
                reason = report.failure_reason.as_deref().unwrap_or_default(),
                "verification could not reach the ledger"
            ),
            outcome => tracing::info!(batch_id = %id, outcome = %outcome, "batch verified"),
        }
        Ok(report)
    }

    /// All batches, newest first.
    pub async fn list(&self) -> Result<Vec<BatchSummary>, RegistryError> {
        let records = self.store.list().await?;
        Ok(search::summarize(&records))
    }

    /// Batches whose id, product or village fields contain `query`.
    pub async fn search(&self, query: &str) -> Result<Vec<BatchSummary>, RegistryError> {
        Ok(search::filter(self.list().await?, query))
    }

    pub async fn readiness(&self) -> Readiness {
        let ping = self.store.ping().await;
        Readiness {
            store_reachable: ping.is_ok(),
            store_error: ping.err().map(|e| e.to_string()),
            ledger_configured: self.ledger.is_some(),
            network: self.ledger.as_ref().map(|l| l.network().to_string()),
        }
    }
}
