//! One function per CLI subcommand. Each prints its result as pretty JSON.

use anyhow::{Context as _, anyhow};
use defect_core::{
  query::DefectQueries,
  store::RecordStore,
  trend::Bucket,
  vehicle::{Selector, Vehicle},
};
use defect_ingest::{DataSource, Pipeline, VinDecoder};
use serde::Serialize;

use crate::SelectorArgs;

impl SelectorArgs {
  fn selector(&self) -> anyhow::Result<Selector> {
    let selector = Selector::from_parts(
      self.vin.as_deref(),
      self.make.as_deref(),
      self.model.as_deref(),
      self.year,
    )?;
    Ok(selector.normalize()?)
  }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  let out = serde_json::to_string_pretty(value).context("failed to serialise output")?;
  println!("{out}");
  Ok(())
}

/// Find a previously ingested vehicle. Never touches the network.
async fn cached_vehicle<S: RecordStore>(store: &S, args: &SelectorArgs) -> anyhow::Result<Vehicle> {
  let selector = args.selector()?;
  let found = match &selector {
    Selector::Vin(vin) => store.find_vehicle_by_vin(vin).await,
    Selector::ModelYear(my) => store.find_vehicle(&my.make, &my.model, my.year).await,
  }
  .context("store lookup failed")?;

  found.ok_or_else(|| anyhow!("{selector} is not cached; run `defect ingest` first"))
}

// ─── Ingest ──────────────────────────────────────────────────────────────────

pub async fn ingest<S, D>(pipeline: &Pipeline<S, D>, args: &SelectorArgs) -> anyhow::Result<()>
where
  S: RecordStore,
  D: DataSource + VinDecoder,
{
  let report = pipeline.ingest(&args.selector()?).await?;
  if report.is_partial() {
    tracing::warn!("some endpoints failed; cached data may be incomplete");
  }
  print_json(&report)
}

// ─── Queries ─────────────────────────────────────────────────────────────────

pub async fn summary<S: DefectQueries>(store: &S, args: &SelectorArgs) -> anyhow::Result<()> {
  let vehicle = cached_vehicle(store, args).await?;
  print_json(&store.severity_summary(vehicle.vehicle_id).await?)
}

pub async fn components<S: DefectQueries>(
  store: &S,
  args:  &SelectorArgs,
  limit: usize,
) -> anyhow::Result<()> {
  let vehicle = cached_vehicle(store, args).await?;
  print_json(&store.top_components(vehicle.vehicle_id, limit).await?)
}

pub async fn trend<S: DefectQueries>(
  store:  &S,
  args:   &SelectorArgs,
  bucket: Bucket,
) -> anyhow::Result<()> {
  let vehicle = cached_vehicle(store, args).await?;
  print_json(&store.trend_over_time(vehicle.vehicle_id, bucket).await?)
}

pub async fn search<S: DefectQueries>(
  store: &S,
  args:  &SelectorArgs,
  text:  &str,
  limit: Option<usize>,
) -> anyhow::Result<()> {
  let vehicle = cached_vehicle(store, args).await?;
  print_json(&store.search_symptoms(vehicle.vehicle_id, text, limit).await?)
}

pub async fn recalls<S: DefectQueries>(store: &S, args: &SelectorArgs) -> anyhow::Result<()> {
  let vehicle = cached_vehicle(store, args).await?;
  print_json(&store.recall_list(vehicle.vehicle_id).await?)
}

pub async fn complaints<S: RecordStore>(store: &S, args: &SelectorArgs) -> anyhow::Result<()> {
  let vehicle = cached_vehicle(store, args).await?;
  print_json(&store.complaints_for(vehicle.vehicle_id).await?)
}

pub async fn vehicles<S: RecordStore>(store: &S) -> anyhow::Result<()> {
  print_json(&store.list_vehicles().await?)
}
