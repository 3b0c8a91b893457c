//! # Kin Telemetry
//!
//! Observability for the Kin ledger client.
//!
//! ## Components
//!
//! - **Logging**: `tracing` events rendered by `tracing-subscriber`, either
//!   human-readable or one JSON object per line.
//! - **Metrics**: Prometheus counters and gauges for submissions, rejections,
//!   stream deliveries and reconnects.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kin_telemetry::{init_logging, register_metrics, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_logging(&config)?;
//! register_metrics()?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `KIN_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `KIN_JSON_LOGS` | `false` | Emit JSON log lines |
//! | `KIN_SERVICE_NAME` | `kin-client` | Service name attached to logs |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{gather_metrics, register_metrics};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Increment a counter, optionally selecting label values.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
