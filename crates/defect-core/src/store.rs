//! The `RecordStore` trait: durable, constraint-enforcing persistence.
//!
//! The trait is implemented by storage backends (e.g. `defect-store-sqlite`).
//! The ingestion pipeline and the API depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
  record::{Complaint, NewComplaint, NewRecall, Recall},
  vehicle::{Vehicle, VehicleId, VehicleIdentity},
};

/// Tally of one `insert_*_if_absent` batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertOutcome {
  /// New rows written.
  pub inserted:   usize,
  /// Rows that already existed for another vehicle and were linked to this
  /// one.
  pub linked:     usize,
  /// Rows already linked to this vehicle.
  pub duplicates: usize,
}

/// Abstraction over a defect record store backend.
///
/// Vehicles, complaints and recalls are append-only: nothing is ever updated
/// in place or deleted. Inserting a record whose source identifier already
/// exists is a no-op, not an error, which is what makes ingestion idempotent.
/// Uniqueness must be enforced by the backend itself, not by a
/// check-then-insert in the caller.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Vehicles ──────────────────────────────────────────────────────────

  /// Return the vehicle for `identity`, creating it if absent.
  ///
  /// A known VIN resolves to the vehicle it was first recorded against.
  /// Otherwise the make/model/year row is reused or created, and the VIN
  /// (if any) is recorded against it.
  fn upsert_vehicle(
    &self,
    identity: VehicleIdentity,
  ) -> impl Future<Output = Result<Vehicle, Self::Error>> + Send + '_;

  /// Retrieve a vehicle by id. Returns `None` if not found.
  fn get_vehicle(
    &self,
    id: VehicleId,
  ) -> impl Future<Output = Result<Option<Vehicle>, Self::Error>> + Send + '_;

  /// Look up a vehicle by make/model/year. Inputs are canonicalised first.
  fn find_vehicle<'a>(
    &'a self,
    make: &'a str,
    model: &'a str,
    year: i32,
  ) -> impl Future<Output = Result<Option<Vehicle>, Self::Error>> + Send + 'a;

  /// Look up the vehicle a VIN was recorded against.
  fn find_vehicle_by_vin<'a>(
    &'a self,
    vin: &'a str,
  ) -> impl Future<Output = Result<Option<Vehicle>, Self::Error>> + Send + 'a;

  /// All cached vehicles, ordered by make, model, year.
  fn list_vehicles(
    &self,
  ) -> impl Future<Output = Result<Vec<Vehicle>, Self::Error>> + Send + '_;

  // ── Records: insert-if-absent ────────────────────────────────────────

  /// Store complaints for a vehicle, skipping ODI numbers already present.
  /// Each record is committed on its own.
  fn insert_complaints_if_absent(
    &self,
    vehicle_id: VehicleId,
    records: Vec<NewComplaint>,
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + '_;

  /// Store recalls for a vehicle, skipping campaign numbers already present.
  fn insert_recalls_if_absent(
    &self,
    vehicle_id: VehicleId,
    records: Vec<NewRecall>,
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// All complaints linked to a vehicle, newest filing first.
  fn complaints_for(
    &self,
    vehicle_id: VehicleId,
  ) -> impl Future<Output = Result<Vec<Complaint>, Self::Error>> + Send + '_;

  /// All recalls linked to a vehicle, newest report first; undated last.
  fn recalls_for(
    &self,
    vehicle_id: VehicleId,
  ) -> impl Future<Output = Result<Vec<Recall>, Self::Error>> + Send + '_;

  fn complaint_count(
    &self,
    vehicle_id: VehicleId,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  fn recall_count(
    &self,
    vehicle_id: VehicleId,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
