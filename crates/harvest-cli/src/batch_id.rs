//! # Batch Identifier Command
//!
//! Derives the `BATCH-XXXXXXXXXXXX` identifier the field app assigns when an
//! operator does not supply one.

use anyhow::Result;
use clap::Args;
use harvest_core::BatchId;

/// Arguments for `harvest batch-id`.
#[derive(Args, Debug)]
pub struct BatchIdArgs {
    #[arg(long)]
    pub product: String,

    /// Village name.
    #[arg(long)]
    pub village: String,

    /// Milliseconds since the Unix epoch. Defaults to now.
    #[arg(long)]
    pub timestamp_ms: Option<i64>,
}

pub fn run_batch_id(args: &BatchIdArgs) -> Result<u8> {
    println!("{}", derive(args)?);
    Ok(0)
}

fn derive(args: &BatchIdArgs) -> Result<BatchId> {
    if args.product.trim().is_empty() {
        anyhow::bail!("--product must not be blank");
    }
    if args.village.trim().is_empty() {
        anyhow::bail!("--village must not be blank");
    }
    let timestamp_ms = args
        .timestamp_ms
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
    let id = BatchId::generate(&args.product, &args.village, timestamp_ms);
    tracing::debug!(batch_id = %id, timestamp_ms, "derived batch id");
    Ok(id)
}
