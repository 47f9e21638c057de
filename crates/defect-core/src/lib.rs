//! Core types and trait definitions for the vehicle defect cache.
//!
//! No HTTP or database code lives here. The store, ingestion and API crates
//! all build on it.

// Implementors write native `async fn`; the traits spell out `Send` bounds.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod query;
pub mod record;
pub mod report;
pub mod store;
pub mod trend;
pub mod vehicle;

pub use error::{Error, Result};
