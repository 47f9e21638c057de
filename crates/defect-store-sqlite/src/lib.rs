//! SQLite backend for the vehicle defect cache.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Implements both
//! [`RecordStore`](defect_core::store::RecordStore) and
//! [`DefectQueries`](defect_core::query::DefectQueries).

mod encode;
mod queries;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
