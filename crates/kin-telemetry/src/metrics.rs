//! Prometheus metrics for the ledger client.
//!
//! All metrics follow the naming convention: `kin_<area>_<metric>`

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Gauge, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // TRANSACTION METRICS
    // =========================================================================

    /// Envelopes handed to the ledger
    pub static ref TRANSACTIONS_SUBMITTED: Counter = Counter::new(
        "kin_transactions_submitted_total",
        "Total transaction envelopes submitted to the ledger"
    ).expect("metric creation failed");

    /// Submissions the ledger refused, by result code
    pub static ref TRANSACTIONS_REJECTED: CounterVec = CounterVec::new(
        Opts::new("kin_transactions_rejected_total", "Rejected transactions by result code"),
        &["reason"]
    ).expect("metric creation failed");

    // =========================================================================
    // STREAM METRICS
    // =========================================================================

    /// Events handed to listeners
    pub static ref STREAM_EVENTS_DELIVERED: CounterVec = CounterVec::new(
        Opts::new("kin_stream_events_delivered_total", "Events delivered to listeners"),
        &["kind"]  // kind: payment/balance/account_created
    ).expect("metric creation failed");

    /// Stream resubscriptions after an error or end of stream
    pub static ref STREAM_RECONNECTS: Counter = Counter::new(
        "kin_stream_reconnects_total",
        "Total ledger stream resubscriptions"
    ).expect("metric creation failed");

    /// Open per-account streams
    pub static ref STREAMS_ACTIVE: Gauge = Gauge::new(
        "kin_streams_active",
        "Number of currently open account streams"
    ).expect("metric creation failed");

    // =========================================================================
    // GATEWAY METRICS
    // =========================================================================

    /// Transport and decoding failures by gateway operation
    pub static ref GATEWAY_ERRORS: CounterVec = CounterVec::new(
        Opts::new("kin_gateway_errors_total", "Gateway failures by operation"),
        &["operation"]  // operation: fetch_account/submit/fetch_transaction/stream
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Calling this more than once is harmless.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(TRANSACTIONS_SUBMITTED.clone()),
        Box::new(TRANSACTIONS_REJECTED.clone()),
        Box::new(STREAM_EVENTS_DELIVERED.clone()),
        Box::new(STREAM_RECONNECTS.clone()),
        Box::new(STREAMS_ACTIVE.clone()),
        Box::new(GATEWAY_ERRORS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
