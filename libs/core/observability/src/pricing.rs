//! Pricing gauges and counters exported for scraping.

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

pub const TOTAL_COST_PER_HOUR: &str = "cloud_vm_total_cost_per_hour";
pub const COST_PER_GB_HOUR: &str = "cloud_vm_cost_per_gb_hour";
pub const COST_PER_VCPU_HOUR: &str = "cloud_vm_cost_per_vcpu_hour";
pub const PRICING_ERRORS_TOTAL: &str = "cloud_vm_pricing_errors_total";
pub const LAST_UPDATE_TIMESTAMP: &str = "cloud_vm_pricing_last_update_timestamp_seconds";
pub const PASS_DURATION_SECONDS: &str = "cloud_vm_pricing_pass_duration_seconds";
pub const PASS_TARGETS_TOTAL: &str = "cloud_vm_pricing_pass_targets_total";

/// Pricing metrics recorder
pub struct PricingMetrics;

impl PricingMetrics {
    // =========================================================================
    // Price Gauges
    // =========================================================================

    /// Publish the hourly cost of an instance type. Derived gauges are only
    /// written when a value is supplied.
    pub fn record_price(
        provider: &str,
        region: &str,
        instance_type: &str,
        total_cost: f64,
        cost_per_gb: Option<f64>,
        cost_per_vcpu: Option<f64>,
    ) {
        let labels = [
            ("provider", provider.to_string()),
            ("region", region.to_string()),
            ("instance_type", instance_type.to_string()),
        ];

        gauge!(TOTAL_COST_PER_HOUR, &labels).set(total_cost);

        if let Some(per_gb) = cost_per_gb {
            gauge!(COST_PER_GB_HOUR, &labels).set(per_gb);
        }

        if let Some(per_vcpu) = cost_per_vcpu {
            gauge!(COST_PER_VCPU_HOUR, &labels).set(per_vcpu);
        }
    }

    // =========================================================================
    // Fetch Outcome Metrics
    // =========================================================================

    /// Count a failed fetch
    pub fn record_fetch_error(provider: &str, region: &str) {
        counter!(
            PRICING_ERRORS_TOTAL,
            "provider" => provider.to_string(),
            "region" => region.to_string()
        )
        .increment(1);
    }

    /// Stamp the last successful update, in Unix seconds
    pub fn set_last_update(provider: &str, region: &str, unix_seconds: f64) {
        gauge!(
            LAST_UPDATE_TIMESTAMP,
            "provider" => provider.to_string(),
            "region" => region.to_string()
        )
        .set(unix_seconds);
    }

    // =========================================================================
    // Pass Metrics
    // =========================================================================

    /// Record the outcome of a complete fetch pass
    pub fn record_pass(succeeded: usize, failed: usize, duration: Duration) {
        counter!(PASS_TARGETS_TOTAL, "status" => "success").increment(succeeded as u64);
        counter!(PASS_TARGETS_TOTAL, "status" => "failed").increment(failed as u64);
        histogram!(PASS_DURATION_SECONDS).record(duration.as_secs_f64());

        tracing::debug!(
            succeeded = succeeded,
            failed = failed,
            duration_ms = duration.as_millis() as u64,
            "Recorded pass metrics"
        );
    }
}

/// Wall-clock timer for a fetch pass.
pub struct PassTimer {
    start: Instant,
}

impl PassTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
