//! Sealdrop ingestion pipeline
//!
//! Classification, tabular decoding, field normalization, media validation
//! and the per-batch orchestrator that ties them to persistence and
//! encryption.

pub mod classifier;
pub mod fields;
pub mod ingest;
pub mod tabular;
pub mod validator;

pub use classifier::{classify, extension_of};
pub use fields::{parse_ticker_sentiment, parse_topics};
pub use ingest::{IngestError, IngestOrchestrator};
pub use tabular::{decode_file, DecodeError, Row};
pub use validator::{MediaValidator, ValidationError};
