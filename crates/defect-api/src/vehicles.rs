//! Handlers for `/vehicles` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/vehicles` | Every cached vehicle |
//! | `GET`  | `/vehicles/lookup` | `?vin=` or `?make=&model=&year=`; 404 if never ingested |
//! | `GET`  | `/vehicles/{id}` | Vehicle plus cached record counts |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use defect_core::{
  query::DefectQueries,
  store::RecordStore,
  vehicle::{Selector, Vehicle, VehicleId},
};
use defect_ingest::{DataSource, VinDecoder};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError, ingest::IngestBody};

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /vehicles`
pub async fn list<S, D>(State(state): State<AppState<S, D>>) -> Result<Json<Vec<Vehicle>>, ApiError>
where
  S: DefectQueries,
  D: DataSource + VinDecoder,
{
  let vehicles = state.store.list_vehicles().await.map_err(ApiError::store)?;
  Ok(Json(vehicles))
}

// ─── Lookup ──────────────────────────────────────────────────────────────────

/// `GET /vehicles/lookup?vin=...` or `?make=...&model=...&year=...`
///
/// Only consults the local cache: a VIN is found if it was ingested before.
pub async fn lookup<S, D>(
  State(state): State<AppState<S, D>>,
  Query(params): Query<IngestBody>,
) -> Result<Json<Vehicle>, ApiError>
where
  S: DefectQueries,
  D: DataSource + VinDecoder,
{
  let selector = params.selector()?.normalize()?;
  let found = match &selector {
    Selector::Vin(vin) => state.store.find_vehicle_by_vin(vin).await,
    Selector::ModelYear(my) => state.store.find_vehicle(&my.make, &my.model, my.year).await,
  }
  .map_err(ApiError::store)?;

  found
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("{selector} has not been ingested")))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct VehicleDetail {
  #[serde(flatten)]
  pub vehicle:         Vehicle,
  pub complaint_count: u64,
  pub recall_count:    u64,
}

/// `GET /vehicles/{id}`
pub async fn get_one<S, D>(
  State(state): State<AppState<S, D>>,
  Path(id): Path<VehicleId>,
) -> Result<Json<VehicleDetail>, ApiError>
where
  S: DefectQueries,
  D: DataSource + VinDecoder,
{
  let vehicle = require_vehicle(&*state.store, id).await?;
  let complaint_count = state.store.complaint_count(id).await.map_err(ApiError::store)?;
  let recall_count = state.store.recall_count(id).await.map_err(ApiError::store)?;

  Ok(Json(VehicleDetail { vehicle, complaint_count, recall_count }))
}

/// Fetch a vehicle or fail with 404.
pub(crate) async fn require_vehicle<S: RecordStore>(store: &S, id: VehicleId) -> Result<Vehicle, ApiError> {
  store
    .get_vehicle(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("vehicle {id} not found")))
}
