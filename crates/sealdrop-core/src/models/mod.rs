//! Data models for the ingestion pipeline
//!
//! Organized by domain: incoming files, structured records decoded from
//! tabular files, media asset metadata, and the per-batch report.

mod file;
mod media;
mod record;
mod report;

pub use file::*;
pub use media::*;
pub use record::*;
pub use report::*;
