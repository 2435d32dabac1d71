//! Sealdrop persistence
//!
//! The ingestion pipeline only sees [`IngestRepository`]. `PgIngestRepository`
//! is the Postgres adapter; `InMemoryIngestRepository` (feature `in-memory`)
//! keeps everything in process memory and can be told to fail.

pub mod db;
pub mod error;
#[cfg(any(test, feature = "in-memory"))]
pub mod memory;
pub mod repository;

pub use db::{connect, run_migrations, PgIngestRepository};
pub use error::DbError;
#[cfg(any(test, feature = "in-memory"))]
pub use memory::InMemoryIngestRepository;
pub use repository::IngestRepository;
