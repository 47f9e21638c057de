//! The summary handed back after an ingestion run.
//!
//! Each endpoint reports independently so the caller can tell "fetched,
//! nothing there" (`status: fetched`, `fetched: 0`) apart from "fetch
//! failed" (`status: failed`).

use serde::{Deserialize, Serialize};

use crate::{store::InsertOutcome, vehicle::Vehicle};

/// Whether an endpoint's data made it back from the remote source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchStatus {
  Fetched,
  Failed {
    /// Attempts made before giving up.
    attempts: u32,
    error:    String,
  },
}

/// Per-endpoint counts for one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointReport {
  #[serde(flatten)]
  pub status:     FetchStatus,
  /// Raw records returned by the source.
  pub fetched:    usize,
  /// Records stored for the first time.
  pub inserted:   usize,
  /// Records already stored for another vehicle, now linked to this one.
  pub linked:     usize,
  /// Records already linked to this vehicle; skipped.
  pub duplicates: usize,
  /// Records that failed normalisation; skipped.
  pub malformed:  usize,
}

impl EndpointReport {
  pub fn fetched(fetched: usize, malformed: usize, outcome: InsertOutcome) -> Self {
    Self {
      status: FetchStatus::Fetched,
      fetched,
      inserted: outcome.inserted,
      linked: outcome.linked,
      duplicates: outcome.duplicates,
      malformed,
    }
  }

  pub fn failed(attempts: u32, error: impl Into<String>) -> Self {
    Self {
      status:     FetchStatus::Failed { attempts, error: error.into() },
      fetched:    0,
      inserted:   0,
      linked:     0,
      duplicates: 0,
      malformed:  0,
    }
  }

  pub fn is_failed(&self) -> bool {
    matches!(self.status, FetchStatus::Failed { .. })
  }

  /// Records that became visible for this vehicle during the run.
  pub fn new_count(&self) -> usize { self.inserted + self.linked }
}

/// The result of one `ingest` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionReport {
  pub vehicle:    Vehicle,
  pub complaints: EndpointReport,
  pub recalls:    EndpointReport,
}

impl IngestionReport {
  pub fn new_count(&self) -> usize {
    self.complaints.new_count() + self.recalls.new_count()
  }

  /// `true` if at least one endpoint could not be fetched; cached data may be
  /// stale.
  pub fn is_partial(&self) -> bool {
    self.complaints.is_failed() || self.recalls.is_failed()
  }
}
