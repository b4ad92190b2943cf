//! End-to-end registry workflows against the in-memory ledger and stores.

use std::sync::Arc;

use harvest_core::{BatchId, Fingerprint, NewBatch, VerificationOutcome};
use harvest_ledger::{LedgerClient, LedgerError, MemoryLedger};
use harvest_registry::{
    BatchRegistry, FileRecordStore, MemoryRecordStore, RecordState, RecordStore, RegistryError,
    LEDGER_FAILED_WARNING, LEDGER_NOT_CONFIGURED_WARNING, RECONCILED_TRANSACTION_REF,
};
use serde_json::json;

fn input(id: &str) -> NewBatch {
    serde_json::from_value(json!({
        "batch_id": id,
        "product": "White Rajma",
        "village": {
            "name": "Sarmoli",
            "district": "Pithoragarh",
            "state": "Uttarakhand",
            "elevation_m": 2200
        },
        "farmers": [{
            "farmer_name": "Asha Devi",
            "age": 41,
            "gender": "female",
            "total_land_nali": 12,
            "crop_rotation": {"white_rajma_nali": 8, "amaranth_nali": 4},
            "locations": [],
            "media": {"image_links": []}
        }],
        "notes": ""
    }))
    .unwrap()
}

/// No empty values anywhere, so both canonical profiles agree.
fn clean_input(id: &str) -> NewBatch {
    serde_json::from_value(json!({
        "batch_id": id,
        "product": "White Rajma",
        "village": {"name": "Sarmoli"},
        "farmers": [{"farmer_name": "Asha Devi", "gender": "female", "age": 41}]
    }))
    .unwrap()
}

fn id(s: &str) -> BatchId {
    BatchId::new(s).unwrap()
}

struct Fixture {
    registry: BatchRegistry,
    store: Arc<MemoryRecordStore>,
    ledger: Arc<MemoryLedger>,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryRecordStore::new());
    let ledger = Arc::new(MemoryLedger::new("memory-test"));
    let client: Arc<dyn LedgerClient> = ledger.clone();
    let registry = BatchRegistry::new(store.clone(), Some(client));
    Fixture {
        registry,
        store,
        ledger,
    }
}

#[tokio::test]
async fn create_anchors_and_verifies() {
    let f = fixture();
    let outcome = f.registry.create(input("RAJMA-2026-001")).await.unwrap();

    assert_eq!(outcome.state, RecordState::Anchored);
    assert!(outcome.is_anchored());
    assert!(outcome.warning.is_none());
    let receipt = outcome.receipt.as_ref().unwrap();
    assert_eq!(receipt.block_number, 1);
    assert_eq!(receipt.network, "memory-test");

    let stored = f.registry.get(&id("RAJMA-2026-001")).await.unwrap();
    assert_eq!(stored.batch_hash(), Some(outcome.fingerprint));
    assert_eq!(stored.blockchain_tx_hash(), Some(receipt.transaction_ref.as_str()));
    assert!(stored.blockchain_timestamp().is_some());
    assert!(stored.created_at().is_some());
    // Provenance written after hashing must not move the fingerprint.
    assert_eq!(stored.fingerprint().unwrap(), outcome.fingerprint);

    let report = f.registry.verify(&id("RAJMA-2026-001")).await.unwrap();
    assert_eq!(report.outcome, VerificationOutcome::Verified);
    assert_eq!(report.anchored_fingerprint, Some(outcome.fingerprint));
}

#[tokio::test]
async fn empty_fields_do_not_reach_the_fingerprint() {
    let f = fixture();
    let outcome = f.registry.create(input("RAJMA-2026-002")).await.unwrap();

    let mut trimmed = input("RAJMA-2026-002");
    trimmed.extra.remove("notes");
    trimmed.farmers[0].locations.clear();
    trimmed.farmers[0].media = None;
    let (_, record) = trimmed.into_record(harvest_core::Timestamp::now()).unwrap();
    assert_eq!(record.fingerprint().unwrap(), outcome.fingerprint);
}

#[tokio::test]
async fn edited_record_is_tampered() {
    let f = fixture();
    f.registry.create(input("RAJMA-2026-003")).await.unwrap();

    let batch = id("RAJMA-2026-003");
    let mut record = f.store.get(&batch).await.unwrap().unwrap();
    record.as_map_mut().insert("product".into(), json!("Amaranth"));
    f.store.put(&batch, &record).await.unwrap();

    let report = f.registry.verify(&batch).await.unwrap();
    assert_eq!(report.outcome, VerificationOutcome::Tampered);
    assert_ne!(report.anchored_fingerprint, Some(report.computed_fingerprint));
}

#[tokio::test]
async fn editing_only_provenance_still_verifies() {
    let f = fixture();
    f.registry.create(input("RAJMA-2026-004")).await.unwrap();

    let batch = id("RAJMA-2026-004");
    let mut record = f.store.get(&batch).await.unwrap().unwrap();
    record
        .as_map_mut()
        .insert("updated_at".into(), json!("2030-01-01T00:00:00.000Z"));
    record.as_map_mut().remove("blockchain_tx_hash");
    f.store.put(&batch, &record).await.unwrap();

    let report = f.registry.verify(&batch).await.unwrap();
    assert_eq!(report.outcome, VerificationOutcome::Verified);
}

#[tokio::test]
async fn ledger_outage_keeps_the_record_local() {
    let f = fixture();
    f.ledger.set_available(false);

    let outcome = f.registry.create(input("RAJMA-2026-005")).await.unwrap();
    assert_eq!(outcome.state, RecordState::RegisteredLocal);
    assert_eq!(outcome.warning.as_deref(), Some(LEDGER_FAILED_WARNING));
    assert!(outcome.ledger_error.as_deref().unwrap().contains("simulated outage"));
    assert!(outcome.receipt.is_none());

    let batch = id("RAJMA-2026-005");
    let stored = f.registry.get(&batch).await.unwrap();
    assert_eq!(RecordState::of(&stored), RecordState::RegisteredLocal);

    // Still down: verification cannot conclude anything.
    let report = f.registry.verify(&batch).await.unwrap();
    assert_eq!(report.outcome, VerificationOutcome::VerificationFailed);
    assert!(report.failure_reason.is_some());

    let err = f.registry.anchor_existing(&batch).await.unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Ledger(LedgerError::Unavailable { .. })
    ));

    f.ledger.set_available(true);
    assert_eq!(
        f.registry.verify(&batch).await.unwrap().outcome,
        VerificationOutcome::NotRegistered
    );

    let anchored = f.registry.anchor_existing(&batch).await.unwrap();
    assert_eq!(anchored.state, RecordState::Anchored);
    assert_eq!(anchored.fingerprint, outcome.fingerprint);
    assert_eq!(
        f.registry.verify(&batch).await.unwrap().outcome,
        VerificationOutcome::Verified
    );
}

#[tokio::test]
async fn profile_divergence_is_flagged_only_for_empty_values() {
    let f = fixture();
    let clean = f.registry.create(clean_input("RAJMA-2026-020")).await.unwrap();
    assert!(!clean.profiles_diverge);
    assert_eq!(clean.state, RecordState::Anchored);

    let mut with_null = clean_input("RAJMA-2026-021");
    with_null.extra.insert("remarks".into(), serde_json::Value::Null);
    let flagged = f.registry.create(with_null).await.unwrap();
    assert!(flagged.profiles_diverge);

    let flagged = f.registry.create(input("RAJMA-2026-022")).await.unwrap();
    assert!(flagged.profiles_diverge);
}

#[tokio::test]
async fn late_landing_registration_is_reconciled() {
    let f = fixture();
    f.ledger.set_available(false);
    let outcome = f.registry.create(input("B1")).await.unwrap();
    assert_eq!(outcome.state, RecordState::RegisteredLocal);
    f.ledger.set_available(true);

    // The transaction landed even though create gave up on it.
    let batch = id("B1");
    f.ledger.force_entry(batch.clone(), outcome.fingerprint);
    assert_eq!(
        f.registry.verify(&batch).await.unwrap().outcome,
        VerificationOutcome::Verified
    );

    let anchored = f.registry.anchor_existing(&batch).await.unwrap();
    assert_eq!(anchored.state, RecordState::Anchored);
    assert_eq!(f.ledger.len(), 1);

    let stored = f.registry.get(&batch).await.unwrap();
    assert_eq!(RecordState::of(&stored), RecordState::Anchored);
    assert_eq!(stored.blockchain_tx_hash(), Some(RECONCILED_TRANSACTION_REF));
    assert!(stored.blockchain_timestamp().is_some());
    assert_eq!(stored.fingerprint().unwrap(), outcome.fingerprint);
}

#[tokio::test]
async fn ledger_holding_another_fingerprint_blocks_anchoring() {
    let f = fixture();
    f.ledger.set_available(false);
    f.registry.create(input("B2")).await.unwrap();
    f.ledger.set_available(true);

    let batch = id("B2");
    let other = harvest_core::fingerprint(&json!({"something": "else"})).unwrap();
    f.ledger.force_entry(batch.clone(), other);

    let err = f.registry.anchor_existing(&batch).await.unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Ledger(LedgerError::AlreadyRegistered(_))
    ));
    let stored = f.registry.get(&batch).await.unwrap();
    assert_eq!(RecordState::of(&stored), RecordState::RegisteredLocal);
}

#[tokio::test]
async fn anchoring_an_edited_local_record_is_refused() {
    let f = fixture();
    f.ledger.set_available(false);
    f.registry.create(input("RAJMA-2026-006")).await.unwrap();
    f.ledger.set_available(true);

    let batch = id("RAJMA-2026-006");
    let mut record = f.store.get(&batch).await.unwrap().unwrap();
    record.as_map_mut().insert("product".into(), json!("Amaranth"));
    f.store.put(&batch, &record).await.unwrap();

    let err = f.registry.anchor_existing(&batch).await.unwrap_err();
    assert!(matches!(err, RegistryError::FingerprintMismatch { .. }));
    assert!(f.ledger.is_empty());
}

#[tokio::test]
async fn anchoring_twice_is_a_lifecycle_error() {
    let f = fixture();
    f.registry.create(input("RAJMA-2026-007")).await.unwrap();
    let err = f
        .registry
        .anchor_existing(&id("RAJMA-2026-007"))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Lifecycle(_)));
}

#[tokio::test]
async fn without_a_ledger_batches_are_not_registered() {
    let store = Arc::new(MemoryRecordStore::new());
    let registry = BatchRegistry::new(store, None);

    let outcome = registry.create(input("RAJMA-2026-008")).await.unwrap();
    assert_eq!(outcome.state, RecordState::RegisteredLocal);
    assert_eq!(outcome.warning.as_deref(), Some(LEDGER_NOT_CONFIGURED_WARNING));

    let batch = id("RAJMA-2026-008");
    assert_eq!(
        registry.verify(&batch).await.unwrap().outcome,
        VerificationOutcome::NotRegistered
    );
    assert!(matches!(
        registry.anchor_existing(&batch).await,
        Err(RegistryError::LedgerNotConfigured)
    ));
    assert!(!registry.readiness().await.ledger_configured);
}

#[tokio::test]
async fn ledger_holding_a_different_fingerprint_is_tampered() {
    let f = fixture();
    let store = f.store.clone();
    let unanchored = BatchRegistry::new(store, None);
    unanchored.create(input("RAJMA-2026-009")).await.unwrap();

    let batch = id("RAJMA-2026-009");
    let other = harvest_core::fingerprint(&json!({"something": "else"})).unwrap();
    f.ledger.force_entry(batch.clone(), other);
    assert_eq!(
        f.registry.verify(&batch).await.unwrap().outcome,
        VerificationOutcome::Tampered
    );

    f.ledger.force_entry(batch.clone(), Fingerprint::ZERO);
    assert_eq!(
        f.registry.verify(&batch).await.unwrap().outcome,
        VerificationOutcome::NotRegistered
    );
}

#[tokio::test]
async fn duplicate_batch_id_is_rejected() {
    let f = fixture();
    f.registry.create(input("RAJMA-2026-010")).await.unwrap();
    let err = f.registry.create(input("RAJMA-2026-010")).await.unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyExists(ref b) if b.as_str() == "RAJMA-2026-010"));
    assert_eq!(f.ledger.len(), 1);
}

#[tokio::test]
async fn invalid_input_is_never_stored() {
    let f = fixture();
    let mut bad = input("RAJMA-2026-011");
    bad.farmers.clear();
    assert!(matches!(
        f.registry.create(bad).await,
        Err(RegistryError::Validation(_))
    ));

    let mut bad = input("RAJMA-2026-011");
    bad.product = "  ".into();
    assert!(matches!(
        f.registry.create(bad).await,
        Err(RegistryError::Validation(_))
    ));

    assert!(f.store.is_empty());
    assert!(f.ledger.is_empty());
}

#[tokio::test]
async fn unknown_batch_is_not_found() {
    let f = fixture();
    assert!(matches!(
        f.registry.verify(&id("NOPE")).await,
        Err(RegistryError::NotFound(_))
    ));
    assert!(matches!(
        f.registry.anchor_existing(&id("NOPE")).await,
        Err(RegistryError::NotFound(_))
    ));
}

#[tokio::test]
async fn list_and_search() {
    let f = fixture();
    f.registry.create(input("RAJMA-2026-012")).await.unwrap();
    let mut other = input("AMARANTH-2026-001");
    other.product = "Amaranth".into();
    other.village.name = "Munsiyari".into();
    f.registry.create(other).await.unwrap();

    let rows = f.registry.list().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.record_state == RecordState::Anchored));

    let hits = f.registry.search("munsi").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].batch_id, "AMARANTH-2026-001");
    assert!(f.registry.search("").await.unwrap().is_empty());
}

#[tokio::test]
async fn file_store_round_trip_verifies() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileRecordStore::open(dir.path()).await.unwrap());
    let ledger: Arc<dyn LedgerClient> = Arc::new(MemoryLedger::default());
    let registry = BatchRegistry::new(store, Some(ledger));

    registry.create(input("RAJMA-2026-013")).await.unwrap();
    let (record, report) = registry
        .get_verified(&id("RAJMA-2026-013"))
        .await
        .unwrap();
    assert_eq!(record.product(), Some("White Rajma"));
    assert_eq!(report.outcome, VerificationOutcome::Verified);

    let ready = registry.readiness().await;
    assert!(ready.store_reachable);
    assert_eq!(ready.network.as_deref(), Some("memory"));
}
