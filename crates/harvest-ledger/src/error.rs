use harvest_core::BatchId;
use thiserror::Error;

/// Errors from ledger operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The ledger refused the registration.
    #[error("registration rejected: {0}")]
    Rejected(String),

    /// The batch identifier already has a fingerprint on the ledger.
    #[error("batch {0} is already registered on the ledger")]
    AlreadyRegistered(BatchId),

    /// The ledger endpoint could not be reached.
    #[error("ledger unavailable on {network}: {reason}")]
    Unavailable {
        /// Network name.
        network: String,
        /// Transport-level reason.
        reason: String,
    },

    /// The transaction was submitted but failed or reverted.
    #[error("transaction failed on {network}: {reason}")]
    TransactionFailed {
        /// Network name.
        network: String,
        /// Failure reason reported by the node.
        reason: String,
    },

    /// The node answered with something that could not be decoded.
    #[error("invalid ledger response on {network}: {reason}")]
    InvalidResponse {
        /// Network name.
        network: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The transaction was not mined within the polling window.
    #[error("transaction {transaction_ref} not confirmed on {network} after {attempts} receipt checks")]
    ConfirmationTimeout {
        /// Network name.
        network: String,
        /// Transaction hash that was being waited on.
        transaction_ref: String,
        /// Receipt checks performed.
        attempts: u32,
    },

    /// Client configuration is unusable.
    #[error("invalid ledger configuration: {0}")]
    Configuration(String),
}

impl LedgerError {
    /// Whether the failure happened before the ledger could be consulted.
    ///
    /// A registration that fails this way may be retried later through the
    /// anchor operation; a read that fails this way is `VERIFICATION_FAILED`.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::InvalidResponse { .. } | Self::ConfirmationTimeout { .. }
        )
    }
}
