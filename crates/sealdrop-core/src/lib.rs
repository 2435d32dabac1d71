//! Sealdrop Core Library
//!
//! This crate provides the domain models, error types, configuration and the
//! streaming file cipher shared by all sealdrop components.

pub mod config;
pub mod constants;
pub mod encryption;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{AppConfig, BaseConfig, IngestConfig};
pub use encryption::{EncryptionError, StreamCipher};
pub use error::{AppError, ErrorMetadata, LogLevel};
