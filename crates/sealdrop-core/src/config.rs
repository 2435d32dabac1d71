//! Configuration module
//!
//! Configuration is read once from the environment at startup and then passed
//! around as immutable values. `IngestConfig` is everything the ingestion
//! pipeline needs; `BaseConfig` covers the server and database.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{MAX_FILES_PER_BATCH, MAX_MEDIA_SIZE_BYTES};
use crate::encryption::StreamCipher;

const SERVER_PORT: u16 = 4000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_REQUEST_BODY_MB: usize = 120;
const MAX_CONCURRENT_FILES: usize = 4;
const BATCH_TIMEOUT_SECS: u64 = 120;
const UPLOAD_ROOT: &str = "./uploads";

/// Server, database and logging settings.
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub max_request_body_mb: usize,
    pub log_format: String,
}

/// Settings consumed by the ingestion pipeline.
#[derive(Clone)]
pub struct IngestConfig {
    pub upload_root: PathBuf,
    pub max_media_size_bytes: u64,
    pub max_files_per_batch: usize,
    pub max_concurrent_files: usize,
    pub batch_timeout: Duration,
    /// Raw `ENCRYPTION_KEY` value (base64 or hex). Parsed by [`IngestConfig::cipher`].
    pub encryption_key: Option<String>,
}

impl fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestConfig")
            .field("upload_root", &self.upload_root)
            .field("max_media_size_bytes", &self.max_media_size_bytes)
            .field("max_files_per_batch", &self.max_files_per_batch)
            .field("max_concurrent_files", &self.max_concurrent_files)
            .field("batch_timeout", &self.batch_timeout)
            .field(
                "encryption_key",
                &self.encryption_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl IngestConfig {
    /// Defaults rooted at `upload_root`, with no encryption key.
    pub fn new(upload_root: impl Into<PathBuf>) -> Self {
        Self {
            upload_root: upload_root.into(),
            max_media_size_bytes: MAX_MEDIA_SIZE_BYTES,
            max_files_per_batch: MAX_FILES_PER_BATCH,
            max_concurrent_files: MAX_CONCURRENT_FILES,
            batch_timeout: Duration::from_secs(BATCH_TIMEOUT_SECS),
            encryption_key: None,
        }
    }

    pub fn with_encryption_key(mut self, key: impl Into<String>) -> Self {
        self.encryption_key = Some(key.into());
        self
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let upload_root = env::var("UPLOAD_ROOT").unwrap_or_else(|_| UPLOAD_ROOT.to_string());

        let max_media_size_bytes = env::var("MAX_MEDIA_SIZE_BYTES")
            .unwrap_or_else(|_| MAX_MEDIA_SIZE_BYTES.to_string())
            .parse::<u64>()
            .unwrap_or(MAX_MEDIA_SIZE_BYTES);

        let max_files_per_batch = env::var("MAX_FILES_PER_BATCH")
            .unwrap_or_else(|_| MAX_FILES_PER_BATCH.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_FILES_PER_BATCH);

        let max_concurrent_files = env::var("MAX_CONCURRENT_FILES")
            .unwrap_or_else(|_| MAX_CONCURRENT_FILES.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_CONCURRENT_FILES);

        let batch_timeout_secs = env::var("BATCH_TIMEOUT_SECS")
            .unwrap_or_else(|_| BATCH_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .unwrap_or(BATCH_TIMEOUT_SECS);

        let encryption_key = env::var("ENCRYPTION_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        Ok(Self {
            upload_root: PathBuf::from(upload_root),
            max_media_size_bytes,
            max_files_per_batch,
            max_concurrent_files,
            batch_timeout: Duration::from_secs(batch_timeout_secs),
            encryption_key,
        })
    }

    /// Build the process-wide cipher. A missing key yields an unconfigured
    /// cipher; a malformed key is an error.
    pub fn cipher(&self) -> Result<StreamCipher, anyhow::Error> {
        match &self.encryption_key {
            Some(key) => StreamCipher::from_encoded(key)
                .map_err(|e| anyhow::anyhow!("ENCRYPTION_KEY is invalid: {}", e)),
            None => Ok(StreamCipher::unconfigured()),
        }
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_concurrent_files == 0 {
            return Err(anyhow::anyhow!("MAX_CONCURRENT_FILES must be at least 1"));
        }

        if self.max_files_per_batch == 0 {
            return Err(anyhow::anyhow!("MAX_FILES_PER_BATCH must be at least 1"));
        }

        if self.batch_timeout.is_zero() {
            return Err(anyhow::anyhow!("BATCH_TIMEOUT_SECS must be greater than 0"));
        }

        self.cipher().map(|_| ())
    }
}

impl BaseConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let server_port = env::var("PORT")
            .unwrap_or_else(|_| SERVER_PORT.to_string())
            .parse::<u16>()
            .unwrap_or(SERVER_PORT);

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let database_url = env::var("DATABASE_URL").ok().filter(|u| !u.is_empty());

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
            .parse::<u32>()
            .unwrap_or(MAX_CONNECTIONS);

        let db_timeout_seconds = env::var("DB_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .unwrap_or(CONNECTION_TIMEOUT_SECS);

        let max_request_body_mb = env::var("MAX_REQUEST_BODY_MB")
            .unwrap_or_else(|_| MAX_REQUEST_BODY_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_REQUEST_BODY_MB);

        let log_format = env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "text".to_string())
            .to_lowercase();

        Ok(Self {
            server_port,
            cors_origins,
            environment,
            database_url,
            db_max_connections,
            db_timeout_seconds,
            max_request_body_mb,
            log_format,
        })
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.max_request_body_mb == 0 {
            return Err(anyhow::anyhow!("MAX_REQUEST_BODY_MB must be greater than 0"));
        }

        Ok(())
    }
}

/// Full application configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub base: BaseConfig,
    pub ingest: IngestConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Ok(Self {
            base: BaseConfig::from_env()?,
            ingest: IngestConfig::from_env()?,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.base.validate()?;
        self.ingest.validate()?;

        if self.is_production() && self.ingest.encryption_key.is_none() {
            return Err(anyhow::anyhow!(
                "ENCRYPTION_KEY must be set in production"
            ));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.base.is_production()
    }

    pub fn server_port(&self) -> u16 {
        self.base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.base.environment
    }

    pub fn database_url(&self) -> Option<&str> {
        self.base.database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.base.db_timeout_seconds
    }

    pub fn max_request_body_bytes(&self) -> usize {
        self.base.max_request_body_mb * 1024 * 1024
    }

    pub fn log_json(&self) -> bool {
        self.base.log_format == "json"
    }

    pub fn upload_root(&self) -> &std::path::Path {
        &self.ingest.upload_root
    }

    pub fn max_files_per_batch(&self) -> usize {
        self.ingest.max_files_per_batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> BaseConfig {
        BaseConfig {
            server_port: SERVER_PORT,
            cors_origins: vec!["*".to_string()],
            environment: "development".to_string(),
            database_url: Some("postgresql://localhost/sealdrop".to_string()),
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            max_request_body_mb: MAX_REQUEST_BODY_MB,
            log_format: "text".to_string(),
        }
    }

    #[test]
    fn test_ingest_defaults() {
        let config = IngestConfig::new("/tmp/uploads");
        assert_eq!(config.max_media_size_bytes, 10 * 1024 * 1024);
        assert_eq!(config.max_files_per_batch, 10);
        assert_eq!(config.max_concurrent_files, 4);
        assert!(config.encryption_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_key_fails_validation() {
        let config = IngestConfig::new("/tmp/uploads").with_encryption_key("not-a-key");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_key_gives_unconfigured_cipher() {
        let cipher = IngestConfig::new("/tmp/uploads").cipher().unwrap();
        assert!(!cipher.is_configured());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = IngestConfig::new("/tmp/uploads");
        config.max_concurrent_files = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_postgres_url_rejected() {
        let mut base = base();
        base.database_url = Some("mysql://localhost/db".to_string());
        assert!(base.validate().is_err());
    }

    #[test]
    fn test_production_requires_key() {
        let mut base = base();
        base.environment = "production".to_string();
        base.cors_origins = vec!["https://sealdrop.example".to_string()];
        let config = AppConfig {
            base,
            ingest: IngestConfig::new("/tmp/uploads"),
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            ingest: IngestConfig::new("/tmp/uploads")
                .with_encryption_key("0".repeat(64)),
            ..config
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = IngestConfig::new("/tmp/uploads").with_encryption_key("0".repeat(64));
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains(&"0".repeat(64)));
    }
}
