//! Batch ingestion
//!
//! Per file: `received -> classified -> {decoded | validated} -> persisted ->
//! encrypted -> done`, or `failed` from any step. Every file yields exactly
//! one result, in input order.

mod error;
mod guard;
mod orchestrator;

pub use error::IngestError;
pub use orchestrator::IngestOrchestrator;
