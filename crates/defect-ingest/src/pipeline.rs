//! The ingestion pipeline: selector in, [`IngestionReport`] out.
//!
//! Order of operations for one call:
//!
//! 1. validate the selector (no network before this succeeds)
//! 2. resolve a VIN to make/model/year, from the store if seen before
//! 3. find or create the vehicle row
//! 4. complaints: fetch with retry, normalise, insert-if-absent
//! 5. recalls: same, independently of how step 4 went
//!
//! Steps 4 and 5 run under a per-vehicle lock, so concurrent ingestions of
//! the same vehicle write one after the other. A vehicle's lock entry is
//! removed once nobody holds or waits on it.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

use defect_core::{
  report::{EndpointReport, IngestionReport},
  store::RecordStore,
  vehicle::{ModelYear, Selector, Vehicle, VehicleId, VehicleIdentity},
};
use serde_json::Value;

use crate::{
  IngestError, Result,
  normalize::{NormalizeError, normalize_complaint, normalize_recall},
  retry::{RetryPolicy, with_retry},
  source::{DataSource, Endpoint, VinDecoder},
};

type VehicleLock = Arc<tokio::sync::Mutex<()>>;
type LockMap = Mutex<HashMap<VehicleId, VehicleLock>>;

pub struct Pipeline<S, D> {
  store:  Arc<S>,
  source: Arc<D>,
  retry:  RetryPolicy,
  locks:  LockMap,
}

impl<S, D> Pipeline<S, D>
where
  S: RecordStore,
  D: DataSource + VinDecoder,
{
  pub fn new(store: Arc<S>, source: Arc<D>, retry: RetryPolicy) -> Self {
    Self {
      store,
      source,
      retry,
      locks: Mutex::new(HashMap::new()),
    }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Fetch, normalise and cache everything the source has for `selector`.
  ///
  /// Fetch failures don't fail the call: they are retried per the policy
  /// and then recorded in the report for that endpoint.
  pub async fn ingest(&self, selector: &Selector) -> Result<IngestionReport> {
    let selector = selector.normalize()?;
    let identity = self.resolve(selector).await?;

    let vehicle = self
      .store
      .upsert_vehicle(identity)
      .await
      .map_err(IngestError::store)?;
    let model_year = vehicle.model_year();

    let _lease = self.lock_vehicle(vehicle.vehicle_id).await;

    let complaints = self.ingest_complaints(&vehicle, &model_year).await?;
    let recalls = self.ingest_recalls(&vehicle, &model_year).await?;

    let report = IngestionReport { vehicle, complaints, recalls };
    tracing::info!(
      vehicle = %model_year,
      vehicle_id = %report.vehicle.vehicle_id,
      complaints_new = report.complaints.new_count(),
      complaints_skipped = report.complaints.duplicates,
      recalls_new = report.recalls.new_count(),
      recalls_skipped = report.recalls.duplicates,
      partial = report.is_partial(),
      "ingestion finished"
    );
    Ok(report)
  }

  async fn resolve(&self, selector: Selector) -> Result<VehicleIdentity> {
    let vin = match selector {
      Selector::ModelYear(model_year) => {
        return Ok(VehicleIdentity { model_year, vin: None });
      }
      Selector::Vin(vin) => vin,
    };

    let known = self
      .store
      .find_vehicle_by_vin(&vin)
      .await
      .map_err(IngestError::store)?;
    if let Some(vehicle) = known {
      tracing::debug!(%vin, vehicle_id = %vehicle.vehicle_id, "VIN already known");
      return Ok(VehicleIdentity { model_year: vehicle.model_year(), vin: Some(vin) });
    }

    let decoded = with_retry(&self.retry, "vin decode", || self.source.decode_vin(&vin))
      .await
      .map_err(|failure| IngestError::VinDecode {
        vin:    vin.clone(),
        reason: format!("{} (after {} attempts)", failure.error, failure.attempts),
      })?;

    match decoded {
      Some(model_year) => Ok(VehicleIdentity { model_year, vin: Some(vin) }),
      None => Err(IngestError::VinDecode {
        vin,
        reason: "decoder returned no make/model/year".into(),
      }),
    }
  }

  async fn lock_vehicle(&self, vehicle_id: VehicleId) -> VehicleLease<'_> {
    let lock = {
      let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
      locks.entry(vehicle_id).or_default().clone()
    };
    VehicleLease {
      locks: &self.locks,
      guard: Some(lock.lock_owned().await),
    }
  }

  #[cfg(test)]
  pub(crate) fn held_locks(&self) -> usize {
    self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
  }

  // ── Endpoints ─────────────────────────────────────────────────────────────

  async fn ingest_complaints(
    &self,
    vehicle:    &Vehicle,
    model_year: &ModelYear,
  ) -> Result<EndpointReport> {
    let raw = match self.fetch(Endpoint::Complaints, model_year).await {
      Ok(raw) => raw,
      Err(failed) => return Ok(failed),
    };
    let fetched = raw.len();
    let (records, malformed) = normalize_all(Endpoint::Complaints, raw, normalize_complaint);

    let outcome = self
      .store
      .insert_complaints_if_absent(vehicle.vehicle_id, records)
      .await
      .map_err(IngestError::store)?;
    Ok(EndpointReport::fetched(fetched, malformed, outcome))
  }

  async fn ingest_recalls(
    &self,
    vehicle:    &Vehicle,
    model_year: &ModelYear,
  ) -> Result<EndpointReport> {
    let raw = match self.fetch(Endpoint::Recalls, model_year).await {
      Ok(raw) => raw,
      Err(failed) => return Ok(failed),
    };
    let fetched = raw.len();
    let (records, malformed) = normalize_all(Endpoint::Recalls, raw, normalize_recall);

    let outcome = self
      .store
      .insert_recalls_if_absent(vehicle.vehicle_id, records)
      .await
      .map_err(IngestError::store)?;
    Ok(EndpointReport::fetched(fetched, malformed, outcome))
  }

  /// Fetch one endpoint with retry. On failure the error side is the
  /// finished report for that endpoint.
  async fn fetch(
    &self,
    endpoint:   Endpoint,
    model_year: &ModelYear,
  ) -> std::result::Result<Vec<Value>, EndpointReport> {
    with_retry(&self.retry, endpoint.as_str(), || {
      self.source.fetch(endpoint, model_year)
    })
    .await
    .map_err(|failure| {
      tracing::warn!(
        %endpoint,
        vehicle = %model_year,
        attempts = failure.attempts,
        error = %failure.error,
        "fetch failed, giving up"
      );
      EndpointReport::failed(failure.attempts, failure.error.to_string())
    })
  }
}

/// Normalise a batch, keeping the good records and counting the bad ones.
fn normalize_all<T>(
  endpoint:  Endpoint,
  raw:       Vec<Value>,
  normalize: fn(Value) -> std::result::Result<T, NormalizeError>,
) -> (Vec<T>, usize) {
  let mut records = Vec::with_capacity(raw.len());
  let mut malformed = 0;

  for (index, value) in raw.into_iter().enumerate() {
    match normalize(value) {
      Ok(record) => records.push(record),
      Err(error) => {
        malformed += 1;
        tracing::warn!(%endpoint, index, %error, "skipping malformed record");
      }
    }
  }

  (records, malformed)
}

// ─── Locks ───────────────────────────────────────────────────────────────────

/// Holds one vehicle's write lock. Dropping it releases the lock and prunes
/// map entries that only the map still references.
struct VehicleLease<'a> {
  locks: &'a LockMap,
  guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl Drop for VehicleLease<'_> {
  fn drop(&mut self) {
    drop(self.guard.take());
    let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
    locks.retain(|_, lock| Arc::strong_count(lock) > 1);
  }
}
