//! Sealdrop infrastructure: tracing setup and HTTP middleware.

pub mod middleware;
pub mod telemetry;

pub use middleware::request_id::{request_id_middleware, RequestId, REQUEST_ID_HEADER};
pub use telemetry::{init_telemetry, TelemetryOptions};
