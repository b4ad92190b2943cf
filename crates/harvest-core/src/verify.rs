//! # Verification: Recompute and Compare
//!
//! [`verify()`] recomputes a stored record's fingerprint and compares it
//! with what the ledger holds for the same batch. It performs no I/O: the
//! caller queries the ledger and hands the result in as an [`AnchorLookup`].
//!
//! | Ledger answer                        | Outcome               |
//! |--------------------------------------|-----------------------|
//! | nothing, or the all-zero fingerprint | `NOT_REGISTERED`      |
//! | same fingerprint                     | `VERIFIED`            |
//! | different fingerprint                | `TAMPERED`            |
//! | query failed                         | `VERIFICATION_FAILED` |
//!
//! A failed ledger query is an outcome, not an error. The only error is a
//! record that cannot be canonicalized at all.

use serde::{Deserialize, Serialize};

use crate::digest::{fingerprint, Fingerprint};
use crate::error::CanonicalizationError;
use crate::identity::LedgerAddress;
use crate::temporal::Timestamp;

/// Result of comparing a stored record against the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationOutcome {
    NotRegistered,
    Verified,
    Tampered,
    VerificationFailed,
}

impl VerificationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotRegistered => "NOT_REGISTERED",
            Self::Verified => "VERIFIED",
            Self::Tampered => "TAMPERED",
            Self::VerificationFailed => "VERIFICATION_FAILED",
        }
    }
}

impl std::fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the ledger said about a batch identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorLookup {
    /// A fingerprint is recorded. May still be the zero sentinel.
    Anchored {
        fingerprint: Fingerprint,
        anchored_at: Option<Timestamp>,
        submitter: Option<LedgerAddress>,
    },
    /// The ledger has no entry for the identifier.
    NotAnchored,
    /// The ledger could not be queried.
    Unavailable { reason: String },
}

/// Full verification result, suitable for returning to a caller verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub outcome: VerificationOutcome,
    /// Fingerprint recomputed from the stored record. Always present.
    pub computed_fingerprint: Fingerprint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchored_fingerprint: Option<Fingerprint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchored_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitter: Option<LedgerAddress>,
    /// Why the ledger could not be consulted, on `VERIFICATION_FAILED`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl VerificationReport {
    pub fn is_verified(&self) -> bool {
        self.outcome == VerificationOutcome::Verified
    }
}

/// Recompute the fingerprint of `stored` and classify it against `lookup`.
///
/// # Errors
///
/// Only if `stored` cannot be represented as a JSON tree.
pub fn verify(
    stored: &impl Serialize,
    lookup: &AnchorLookup,
) -> Result<VerificationReport, CanonicalizationError> {
    let computed = fingerprint(stored)?;
    let mut report = VerificationReport {
        outcome: VerificationOutcome::NotRegistered,
        computed_fingerprint: computed,
        anchored_fingerprint: None,
        anchored_at: None,
        submitter: None,
        failure_reason: None,
    };

    match lookup {
        AnchorLookup::NotAnchored => {}
        AnchorLookup::Anchored { fingerprint, .. } if fingerprint.is_zero() => {}
        AnchorLookup::Anchored {
            fingerprint,
            anchored_at,
            submitter,
        } => {
            report.outcome = if *fingerprint == computed {
                VerificationOutcome::Verified
            } else {
                VerificationOutcome::Tampered
            };
            report.anchored_fingerprint = Some(*fingerprint);
            report.anchored_at = *anchored_at;
            report.submitter = submitter.clone();
        }
        AnchorLookup::Unavailable { reason } => {
            report.outcome = VerificationOutcome::VerificationFailed;
            report.failure_reason = Some(reason.clone());
        }
    }

    Ok(report)
}
