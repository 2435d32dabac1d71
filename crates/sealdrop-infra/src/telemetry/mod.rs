//! Tracing initialization
//!
//! A `tracing-subscriber` registry with an `EnvFilter` (from `RUST_LOG`, with
//! a crate-level default) and a `fmt` layer, either human-readable or JSON.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "sealdrop=debug,tower_http=debug";

#[derive(Clone, Debug)]
pub struct TelemetryOptions {
    pub json: bool,
    pub environment: String,
}

pub fn init_telemetry(options: &TelemetryOptions) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    let result = if options.json {
        registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::info!(
        environment = %options.environment,
        json = options.json,
        "Tracing initialized"
    );
    Ok(())
}
