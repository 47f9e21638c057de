//! JSON REST API for the vehicle defect cache.
//!
//! Exposes an axum [`Router`] backed by any [`DefectQueries`] store and an
//! ingestion [`Pipeline`]. Transport concerns (binding, TLS, tracing layers)
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", defect_api::api_router(AppState::new(pipeline)))
//! ```

pub mod analytics;
pub mod error;
pub mod ingest;
pub mod vehicles;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use defect_core::query::DefectQueries;
use defect_ingest::{DataSource, Pipeline, VinDecoder};

pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S, D> {
  pub store:    Arc<S>,
  pub pipeline: Arc<Pipeline<S, D>>,
}

impl<S, D> AppState<S, D>
where
  S: DefectQueries,
  D: DataSource + VinDecoder,
{
  pub fn new(pipeline: Arc<Pipeline<S, D>>) -> Self {
    Self {
      store: pipeline.store().clone(),
      pipeline,
    }
  }
}

// Not derived: that would demand `S: Clone` and `D: Clone`.
impl<S, D> Clone for AppState<S, D> {
  fn clone(&self) -> Self {
    Self {
      store:    self.store.clone(),
      pipeline: self.pipeline.clone(),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, D>(state: AppState<S, D>) -> Router<()>
where
  S: DefectQueries + 'static,
  D: DataSource + VinDecoder + 'static,
{
  Router::new()
    // Ingestion
    .route("/ingest", post(ingest::handler::<S, D>))
    // Vehicles
    .route("/vehicles", get(vehicles::list::<S, D>))
    .route("/vehicles/lookup", get(vehicles::lookup::<S, D>))
    .route("/vehicles/{id}", get(vehicles::get_one::<S, D>))
    // Analytics
    .route("/vehicles/{id}/severity", get(analytics::severity::<S, D>))
    .route("/vehicles/{id}/components", get(analytics::components::<S, D>))
    .route("/vehicles/{id}/trend", get(analytics::trend::<S, D>))
    .route("/vehicles/{id}/search", get(analytics::search::<S, D>))
    .route("/vehicles/{id}/recalls", get(analytics::recalls::<S, D>))
    .route("/vehicles/{id}/complaints", get(analytics::complaints::<S, D>))
    .with_state(state)
}
