//! Error types for `defect-ingest`.
//!
//! Fetch failures never show up here: they are retried and then recorded in
//! the [`IngestionReport`](defect_core::report::IngestionReport).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
  /// Rejected before any network call was made.
  #[error(transparent)]
  InvalidSelector(#[from] defect_core::Error),

  #[error("could not decode VIN {vin}: {reason}")]
  VinDecode { vin: String, reason: String },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IngestError {
  pub(crate) fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
