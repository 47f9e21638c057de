//! Read-only analytics over one cached vehicle.
//!
//! All routes live under `/vehicles/{id}` and answer 404 for an unknown id.
//! None of them touch the network.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use defect_core::{
  query::{ComponentCount, DEFAULT_COMPONENT_LIMIT, DefectQueries, SeveritySummary},
  record::{Complaint, Recall},
  store::RecordStore,
  trend::{Bucket, TrendPoint},
  vehicle::VehicleId,
};
use defect_ingest::{DataSource, VinDecoder};
use serde::Deserialize;

use crate::{AppState, error::ApiError, vehicles::require_vehicle};

/// `GET /vehicles/{id}/severity`
pub async fn severity<S, D>(
  State(state): State<AppState<S, D>>,
  Path(id): Path<VehicleId>,
) -> Result<Json<SeveritySummary>, ApiError>
where
  S: DefectQueries,
  D: DataSource + VinDecoder,
{
  require_vehicle(&*state.store, id).await?;
  let summary = state.store.severity_summary(id).await.map_err(ApiError::store)?;
  Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
pub struct ComponentParams {
  pub limit: Option<usize>,
}

/// `GET /vehicles/{id}/components[?limit=N]`
pub async fn components<S, D>(
  State(state): State<AppState<S, D>>,
  Path(id): Path<VehicleId>,
  Query(params): Query<ComponentParams>,
) -> Result<Json<Vec<ComponentCount>>, ApiError>
where
  S: DefectQueries,
  D: DataSource + VinDecoder,
{
  require_vehicle(&*state.store, id).await?;
  let limit = params.limit.unwrap_or(DEFAULT_COMPONENT_LIMIT);
  let ranked = state.store.top_components(id, limit).await.map_err(ApiError::store)?;
  Ok(Json(ranked))
}

#[derive(Debug, Deserialize)]
pub struct TrendParams {
  /// `month` (default) or `year`. Parsed by hand so a bad value gets the
  /// usual JSON error body.
  pub bucket: Option<String>,
}

/// `GET /vehicles/{id}/trend[?bucket=month|year]`
pub async fn trend<S, D>(
  State(state): State<AppState<S, D>>,
  Path(id): Path<VehicleId>,
  Query(params): Query<TrendParams>,
) -> Result<Json<Vec<TrendPoint>>, ApiError>
where
  S: DefectQueries,
  D: DataSource + VinDecoder,
{
  let bucket: Bucket = match params.bucket.as_deref() {
    Some(b) => b.parse()?,
    None => Bucket::default(),
  };
  require_vehicle(&*state.store, id).await?;
  let points = state.store.trend_over_time(id, bucket).await.map_err(ApiError::store)?;
  Ok(Json(points))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
  #[serde(default)]
  pub q:     String,
  pub limit: Option<usize>,
}

/// `GET /vehicles/{id}/search?q=...[&limit=N]`
pub async fn search<S, D>(
  State(state): State<AppState<S, D>>,
  Path(id): Path<VehicleId>,
  Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Complaint>>, ApiError>
where
  S: DefectQueries,
  D: DataSource + VinDecoder,
{
  require_vehicle(&*state.store, id).await?;
  let hits = state
    .store
    .search_symptoms(id, &params.q, params.limit)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(hits))
}

/// `GET /vehicles/{id}/recalls`
pub async fn recalls<S, D>(
  State(state): State<AppState<S, D>>,
  Path(id): Path<VehicleId>,
) -> Result<Json<Vec<Recall>>, ApiError>
where
  S: DefectQueries,
  D: DataSource + VinDecoder,
{
  require_vehicle(&*state.store, id).await?;
  let recalls = state.store.recall_list(id).await.map_err(ApiError::store)?;
  Ok(Json(recalls))
}

/// `GET /vehicles/{id}/complaints`
pub async fn complaints<S, D>(
  State(state): State<AppState<S, D>>,
  Path(id): Path<VehicleId>,
) -> Result<Json<Vec<Complaint>>, ApiError>
where
  S: DefectQueries,
  D: DataSource + VinDecoder,
{
  require_vehicle(&*state.store, id).await?;
  let complaints = state.store.complaints_for(id).await.map_err(ApiError::store)?;
  Ok(Json(complaints))
}
