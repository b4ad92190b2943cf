//! # harvest CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.
//! Handlers return the process exit code; errors exit 1.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use harvest_cli::batch_id::{run_batch_id, BatchIdArgs};
use harvest_cli::fingerprint::{
    run_canonicalize, run_check_profiles, run_fingerprint, CanonicalizeArgs, CheckProfilesArgs,
    FingerprintArgs,
};
use harvest_cli::verify::{run_verify, VerifyArgs};

/// Harvest Seal CLI.
///
/// Canonicalizes and fingerprints batch records and verifies them against
/// an anchored fingerprint or a live ledger.
#[derive(Parser, Debug)]
#[command(name = "harvest", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the canonical encoding of a record.
    Canonicalize(CanonicalizeArgs),

    /// Print the fingerprint of a record.
    Fingerprint(FingerprintArgs),

    /// Verify a record. Exit 0 VERIFIED, 2 TAMPERED, 3 NOT_REGISTERED,
    /// 4 VERIFICATION_FAILED.
    Verify(VerifyArgs),

    /// Derive a batch identifier from product, village and time.
    BatchId(BatchIdArgs),

    /// Compare the strict and key-order-only fingerprints. Exit 2 if they differ.
    CheckProfiles(CheckProfilesArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Canonicalize(args) => run_canonicalize(&args),
        Commands::Fingerprint(args) => run_fingerprint(&args),
        Commands::Verify(args) => run_verify(&args),
        Commands::BatchId(args) => run_batch_id(&args),
        Commands::CheckProfiles(args) => run_check_profiles(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
