//! Postgres adapter
//
// Pool construction and migrations
mod pool;
//
// Ingest repository
mod ingest;

pub use ingest::PgIngestRepository;
pub use pool::{connect, run_migrations};
