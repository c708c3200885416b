//! Ingestion pipeline entry points.
//!
//! - `IngestionController`: runs site adapters through listing, dedup and
//!   per-post processing
//! - `RunReport`: per-adapter outcome of a run

mod ingest;
mod report;

pub use ingest::{IngestionContext, IngestionController};
pub use report::{AdapterOutcome, AdapterReport, RunReport};
