//! Metric sinks
//!
//! [`PrometheusSink`] publishes through the process-wide metrics recorder for
//! the `/metrics` endpoint; [`MemorySink`] keeps results in memory for
//! one-shot collection.

use chrono::{DateTime, Utc};
use domain_pricing::{CloudProvider, MetricSink, PricePoint};
use observability::PricingMetrics;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Sink backed by the installed Prometheus recorder.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusSink;

impl MetricSink for PrometheusSink {
    fn record_price(&self, point: &PricePoint) {
        PricingMetrics::record_price(
            point.provider().as_ref(),
            point.region(),
            point.instance_type(),
            point.total_hourly_cost(),
            point.cost_per_gb(),
            point.cost_per_vcpu(),
        );
    }

    fn record_failure(&self, provider: CloudProvider, region: &str) {
        PricingMetrics::record_fetch_error(provider.as_ref(), region);
    }

    fn record_last_success(&self, provider: CloudProvider, region: &str, at: DateTime<Utc>) {
        PricingMetrics::set_last_update(provider.as_ref(), region, at.timestamp() as f64);
    }
}

/// Failure count for one (provider, region) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureCount {
    pub provider: CloudProvider,
    pub region: String,
    pub count: u64,
}

#[derive(Default)]
struct MemoryState {
    prices: BTreeMap<(CloudProvider, String, String), PricePoint>,
    failures: BTreeMap<(CloudProvider, String), u64>,
    last_success: BTreeMap<(CloudProvider, String), DateTime<Utc>>,
}

/// In-process sink. Later prices for a target overwrite earlier ones, the
/// same way a gauge does.
#[derive(Default)]
pub struct MemorySink {
    state: Mutex<MemoryState>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest price per target, ordered by provider, region, instance type.
    pub fn prices(&self) -> Vec<PricePoint> {
        self.with_state(|state| state.prices.values().cloned().collect())
    }

    pub fn failures(&self) -> Vec<FailureCount> {
        self.with_state(|state| {
            state
                .failures
                .iter()
                .map(|((provider, region), count)| FailureCount {
                    provider: *provider,
                    region: region.clone(),
                    count: *count,
                })
                .collect()
        })
    }

    pub fn last_success(&self, provider: CloudProvider, region: &str) -> Option<DateTime<Utc>> {
        self.with_state(|state| {
            state
                .last_success
                .get(&(provider, region.to_string()))
                .copied()
        })
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> T {
        // A poisoned lock only means a writer panicked mid-insert; the maps stay usable.
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}

impl MetricSink for MemorySink {
    fn record_price(&self, point: &PricePoint) {
        let key = (
            point.provider(),
            point.region().to_string(),
            point.instance_type().to_string(),
        );
        self.with_state(|state| {
            state.prices.insert(key, point.clone());
        });
    }

    fn record_failure(&self, provider: CloudProvider, region: &str) {
        self.with_state(|state| {
            *state
                .failures
                .entry((provider, region.to_string()))
                .or_default() += 1;
        });
    }

    fn record_last_success(&self, provider: CloudProvider, region: &str, at: DateTime<Utc>) {
        self.with_state(|state| {
            state.last_success.insert((provider, region.to_string()), at);
        });
    }
}
