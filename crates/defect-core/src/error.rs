//! Error types for `defect-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid selector: {0}")]
  InvalidSelector(String),

  #[error("unknown trend bucket: {0:?}")]
  UnknownBucket(String),

  #[error("invalid period: {0:?}")]
  InvalidPeriod(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
