//! Contract between the fetch core and whatever publishes its results.

use chrono::{DateTime, Utc};

use crate::models::{CloudProvider, PricePoint};

/// Write-only recorder for pricing results.
///
/// Implementations must be safe to call from many fetches at once. Each
/// target owns a disjoint label set, so writes never need read-modify-write.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
pub trait MetricSink: Send + Sync {
    /// Publish a successful price point.
    fn record_price(&self, point: &PricePoint);

    /// Count a failed fetch for a (provider, region) pair.
    fn record_failure(&self, provider: CloudProvider, region: &str);

    /// Stamp the last successful refresh of a (provider, region) pair.
    fn record_last_success(&self, provider: CloudProvider, region: &str, at: DateTime<Utc>);
}
