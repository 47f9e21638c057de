//! Handler for `POST /ingest`.
//!
//! Body: `{"vin": "..."}` or `{"make": "...", "model": "...", "year": 2021}`.
//! A non-blank `vin` wins. Responds with the [`IngestionReport`]; a fetch
//! failure on either endpoint is reported inside it, not as an HTTP error.

use axum::{Json, extract::State};
use defect_core::{query::DefectQueries, report::IngestionReport, vehicle::Selector};
use defect_ingest::{DataSource, VinDecoder};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct IngestBody {
  pub vin:   Option<String>,
  pub make:  Option<String>,
  pub model: Option<String>,
  pub year:  Option<i32>,
}

impl IngestBody {
  pub fn selector(&self) -> Result<Selector, ApiError> {
    Ok(Selector::from_parts(
      self.vin.as_deref(),
      self.make.as_deref(),
      self.model.as_deref(),
      self.year,
    )?)
  }
}

/// `POST /ingest`
pub async fn handler<S, D>(
  State(state): State<AppState<S, D>>,
  Json(body): Json<IngestBody>,
) -> Result<Json<IngestionReport>, ApiError>
where
  S: DefectQueries,
  D: DataSource + VinDecoder,
{
  let selector = body.selector()?;
  let report = state.pipeline.ingest(&selector).await?;
  Ok(Json(report))
}
