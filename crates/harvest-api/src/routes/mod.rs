//! # API Route Modules
//!
//! - `batches`: public listing, detail with verification, and search.
//! - `verify`: standalone verification and the stateless fingerprint tool.
//! - `admin`: batch creation and re-anchoring behind the admin token, plus
//!   the unauthenticated token check.

pub mod admin;
pub mod batches;
pub mod verify;

use harvest_core::BatchId;

use crate::error::AppError;

/// Validate a batch identifier taken from the path.
pub(crate) fn path_batch_id(raw: String) -> Result<BatchId, AppError> {
    BatchId::new(raw).map_err(AppError::from)
}
