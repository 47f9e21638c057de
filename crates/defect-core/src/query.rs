//! The `DefectQueries` trait and its result shapes.
//!
//! Every query is a pure read over one vehicle's cached records: calling it
//! twice on an unchanged store returns identical results.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
  record::{Complaint, Recall},
  store::RecordStore,
  trend::{Bucket, TrendPoint},
  vehicle::VehicleId,
};

/// Default `limit` for [`DefectQueries::top_components`].
pub const DEFAULT_COMPONENT_LIMIT: usize = 10;

// ─── Result shapes ───────────────────────────────────────────────────────────

/// Severity roll-up across a vehicle's complaints.
///
/// Crash and fire are counts of flagged complaints; injuries and deaths are
/// sums of the per-complaint counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeveritySummary {
  pub crash_count:      u64,
  pub fire_count:       u64,
  pub injury_count:     u64,
  pub death_count:      u64,
  pub total_complaints: u64,
}

/// One row of a component-frequency ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentCount {
  pub component_label: String,
  pub complaint_count: u64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Read-only analytics over a [`RecordStore`].
pub trait DefectQueries: RecordStore {
  fn severity_summary(
    &self,
    vehicle_id: VehicleId,
  ) -> impl Future<Output = Result<SeveritySummary, Self::Error>> + Send + '_;

  /// Components by descending complaint count; ties by ascending label.
  /// Complaints without a component count under
  /// [`UNKNOWN_COMPONENT`](crate::record::UNKNOWN_COMPONENT).
  fn top_components(
    &self,
    vehicle_id: VehicleId,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<ComponentCount>, Self::Error>> + Send + '_;

  /// Chronological complaint counts with internal gaps zero-filled.
  ///
  /// A complaint is dated by its filing date, falling back to its incident
  /// date; complaints with neither are left out.
  fn trend_over_time(
    &self,
    vehicle_id: VehicleId,
    bucket: Bucket,
  ) -> impl Future<Output = Result<Vec<TrendPoint>, Self::Error>> + Send + '_;

  /// Case-insensitive literal substring match over complaint summaries.
  ///
  /// A blank query returns nothing rather than everything.
  fn search_symptoms<'a>(
    &'a self,
    vehicle_id: VehicleId,
    query: &'a str,
    limit: Option<usize>,
  ) -> impl Future<Output = Result<Vec<Complaint>, Self::Error>> + Send + 'a;

  /// Recalls by report date, newest first; undated last.
  fn recall_list(
    &self,
    vehicle_id: VehicleId,
  ) -> impl Future<Output = Result<Vec<Recall>, Self::Error>> + Send + '_;
}
