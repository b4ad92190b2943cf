//! # Verify Command
//!
//! Recomputes a record's fingerprint and compares it against either a
//! fingerprint supplied on the command line or the one a live ledger holds.
//! The process exit code carries the outcome so scripts can branch on it.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use harvest_core::{
    verify, AnchorLookup, BatchId, BatchRecord, Fingerprint, LedgerAddress, VerificationOutcome,
    VerificationReport,
};
use harvest_ledger::{EvmLedger, EvmLedgerConfig};

/// Read-only calls need a caller address but never sign with it.
const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Arguments for `harvest verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Record file (JSON or YAML), or `-` for stdin.
    pub file: PathBuf,

    /// Compare against this fingerprint instead of querying a ledger.
    #[arg(long, conflicts_with = "rpc_url")]
    pub anchored: Option<String>,

    /// JSON-RPC endpoint of the ledger.
    #[arg(long, required_unless_present = "anchored", requires = "contract")]
    pub rpc_url: Option<String>,

    /// Batch registry contract address.
    #[arg(long)]
    pub contract: Option<String>,

    /// Caller address for the read call.
    #[arg(long)]
    pub from: Option<String>,

    #[arg(long, default_value = "polygon-amoy")]
    pub network: String,

    /// Ledger identifier to query. Defaults to the record's `batch_id`.
    #[arg(long)]
    pub batch_id: Option<String>,

    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Print the full report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Exit code for an outcome. Errors exit 1.
pub fn exit_code(outcome: VerificationOutcome) -> u8 {
    match outcome {
        VerificationOutcome::Verified => 0,
        VerificationOutcome::Tampered => 2,
        VerificationOutcome::NotRegistered => 3,
        VerificationOutcome::VerificationFailed => 4,
    }
}

pub fn run_verify(args: &VerifyArgs) -> Result<u8> {
    let document = crate::load_document(&args.file)?;
    let record = BatchRecord::from_value(document)?;

    let lookup = match &args.anchored {
        Some(anchored) => AnchorLookup::Anchored {
            fingerprint: Fingerprint::parse(anchored)?,
            anchored_at: None,
            submitter: None,
        },
        None => query_ledger(args, &record)?,
    };

    let report = verify(&record, &lookup)?;
    print_report(&report, args.json)?;
    Ok(exit_code(report.outcome))
}

fn query_ledger(args: &VerifyArgs, record: &BatchRecord) -> Result<AnchorLookup> {
    let rpc_url = args
        .rpc_url
        .clone()
        .context("--rpc-url is required when --anchored is not given")?;
    let contract = args
        .contract
        .as_deref()
        .context("--contract is required with --rpc-url")?;
    let contract = LedgerAddress::parse(contract).context("invalid --contract")?;
    let from = LedgerAddress::parse(args.from.as_deref().unwrap_or(ZERO_ADDRESS))
        .context("invalid --from")?;

    let id = match args.batch_id.as_deref().or_else(|| record.batch_id()) {
        Some(id) => BatchId::new(id)?,
        None => anyhow::bail!("record has no batch_id; pass --batch-id"),
    };

    let config = EvmLedgerConfig::new(rpc_url, contract, from, args.network.clone())
        .with_timeout_secs(args.timeout_secs);
    let ledger = EvmLedger::new(config).context("failed to build ledger client")?;

    tracing::info!(batch_id = %id, network = %args.network, "querying ledger");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let lookup = runtime.block_on(async {
        tokio::time::timeout(
            Duration::from_secs(args.timeout_secs.saturating_add(5)),
            harvest_ledger::lookup(&ledger, &id),
        )
        .await
        .unwrap_or_else(|_| AnchorLookup::Unavailable {
            reason: "ledger query timed out".to_string(),
        })
    });
    Ok(lookup)
}

fn print_report(report: &VerificationReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!("{}", report.outcome.as_str());
    println!("  computed  {}", report.computed_fingerprint.to_prefixed_hex());
    if let Some(anchored) = &report.anchored_fingerprint {
        println!("  anchored  {}", anchored.to_prefixed_hex());
    }
    if let Some(at) = &report.anchored_at {
        println!("  at        {}", at.to_iso8601());
    }
    if let Some(reason) = &report.failure_reason {
        println!("  reason    {reason}");
    }
    Ok(())
}
