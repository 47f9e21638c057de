//! Ingestion pipeline for the vehicle defect cache.
//!
//! Fetches complaints and recalls for one vehicle from a [`DataSource`],
//! normalises the provider's loosely-typed JSON into the record types of
//! `defect-core`, and hands them to a [`RecordStore`] with insert-if-absent
//! semantics. Running it twice against unchanged remote data is a no-op.
//!
//! [`RecordStore`]: defect_core::store::RecordStore

pub mod error;
pub mod nhtsa;
pub mod normalize;
pub mod pipeline;
pub mod retry;
pub mod source;

pub use error::{IngestError, Result};
pub use nhtsa::{NhtsaClient, NhtsaConfig};
pub use pipeline::Pipeline;
pub use retry::RetryPolicy;
pub use source::{DataSource, Endpoint, FetchError, VinDecoder};

#[cfg(test)]
mod tests;
