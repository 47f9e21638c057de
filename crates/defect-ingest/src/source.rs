//! The remote data source seams: [`DataSource`] and [`VinDecoder`].
//!
//! [`NhtsaClient`](crate::NhtsaClient) implements both against the public
//! NHTSA APIs; tests substitute in-process fakes.

use std::{fmt, future::Future};

use defect_core::vehicle::ModelYear;
use thiserror::Error;

/// The two per-vehicle record feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
  Complaints,
  Recalls,
}

impl Endpoint {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Complaints => "complaints",
      Self::Recalls => "recalls",
    }
  }
}

impl fmt::Display for Endpoint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Why a single remote request failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
  #[error("request timed out")]
  Timeout,

  #[error("transport error: {0}")]
  Transport(String),

  #[error("HTTP status {0}")]
  Status(u16),

  #[error("undecodable response: {0}")]
  Decode(String),
}

impl FetchError {
  /// Transport problems, timeouts, 429 and 5xx are worth another attempt.
  /// Other 4xx responses and garbage bodies will not improve on retry.
  pub fn is_retryable(&self) -> bool {
    match self {
      Self::Timeout | Self::Transport(_) => true,
      Self::Status(code) => *code == 429 || (500..600).contains(code),
      Self::Decode(_) => false,
    }
  }
}

/// A remote feed of raw complaint and recall records.
///
/// Implementations return the provider's `results` array untouched; shape
/// checking happens in [`normalize`](crate::normalize) so one bad record
/// cannot sink a whole batch.
pub trait DataSource: Send + Sync {
  fn fetch<'a>(
    &'a self,
    endpoint: Endpoint,
    vehicle:  &'a ModelYear,
  ) -> impl Future<Output = Result<Vec<serde_json::Value>, FetchError>> + Send + 'a;
}

/// Resolves a VIN to the make/model/year the record feeds are keyed by.
pub trait VinDecoder: Send + Sync {
  /// `Ok(None)` means the decoder answered but could not name a vehicle.
  fn decode_vin<'a>(
    &'a self,
    vin: &'a str,
  ) -> impl Future<Output = Result<Option<ModelYear>, FetchError>> + Send + 'a;
}
