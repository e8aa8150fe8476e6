//! Observability utilities for the pricing monitor.
//!
//! This crate provides:
//! - Prometheus recorder installation and text rendering
//! - Metric descriptions for the exported pricing series
//! - `PricingMetrics`, the label-level recorder used by the metric sink
//!
//! # Example
//!
//! ```rust,ignore
//! use observability::{init_metrics, metrics_handler, PricingMetrics};
//!
//! init_metrics()?;
//!
//! PricingMetrics::record_price("aws", "us-east-1", "t3.micro", 0.0104, Some(0.0097), None);
//!
//! let app = Router::new().route("/metrics", get(metrics_handler));
//! ```

pub mod pricing;

pub use pricing::{PassTimer, PricingMetrics};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize the Prometheus metrics recorder.
///
/// Call once at startup; later calls return the existing handle.
pub fn init_metrics() -> Result<&'static PrometheusHandle, BuildError> {
    METRICS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;

        info!("Prometheus metrics recorder initialized");

        register_metric_descriptions();

        Ok(handle)
    })
}

/// Get the metrics handle (must call init_metrics first)
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Axum handler for /metrics endpoint
pub async fn metrics_handler() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

/// Register metric descriptions for documentation
fn register_metric_descriptions() {
    use metrics::describe_counter;
    use metrics::describe_gauge;
    use metrics::describe_histogram;
    use metrics::Unit;

    describe_gauge!(
        pricing::TOTAL_COST_PER_HOUR,
        "Total cost per hour for the instance type in USD"
    );
    describe_gauge!(
        pricing::COST_PER_GB_HOUR,
        "Cost per GB of RAM per hour in USD"
    );
    describe_gauge!(pricing::COST_PER_VCPU_HOUR, "Cost per vCPU per hour in USD");
    describe_counter!(
        pricing::PRICING_ERRORS_TOTAL,
        "Total number of errors encountered while fetching pricing"
    );
    describe_gauge!(
        pricing::LAST_UPDATE_TIMESTAMP,
        Unit::Seconds,
        "Unix timestamp of the last successful pricing update"
    );
    describe_histogram!(
        pricing::PASS_DURATION_SECONDS,
        Unit::Seconds,
        "Duration of a complete pricing fetch pass"
    );
    describe_counter!(
        pricing::PASS_TARGETS_TOTAL,
        "Fetch targets resolved by pricing passes, by outcome"
    );
}
