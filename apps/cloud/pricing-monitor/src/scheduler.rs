//! Fetch Scheduler
//!
//! Refreshes every configured target once per poll interval. Each pass fans
//! out one task per (provider, region, instance type) and records exactly one
//! outcome per target through the metric sink.

use chrono::{DateTime, Utc};
use domain_pricing::{FetchTarget, MetricSink, PricePoint};
use futures::FutureExt;
use observability::{PassTimer, PricingMetrics};
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::providers::{PricingSource, ProviderError, ProviderRegistry, ProviderResult};

/// Result of a single fetch pass
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl PassSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Periodic pricing refresh over a fixed target set
pub struct FetchScheduler {
    registry: ProviderRegistry,
    targets: Vec<FetchTarget>,
    sink: Arc<dyn MetricSink>,
    poll_interval: Duration,
    fetch_timeout: Duration,
}

impl FetchScheduler {
    pub fn new(
        registry: ProviderRegistry,
        targets: Vec<FetchTarget>,
        sink: Arc<dyn MetricSink>,
        poll_interval: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            targets,
            sink,
            poll_interval,
            fetch_timeout,
        }
    }

    pub fn targets(&self) -> &[FetchTarget] {
        &self.targets
    }

    /// Run an initial pass immediately, then one per poll interval until
    /// `shutdown` flips to `true`.
    ///
    /// A pass that overruns the interval delays the next tick rather than
    /// stacking passes.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            targets = self.targets.len(),
            poll_interval = ?self.poll_interval,
            fetch_timeout = ?self.fetch_timeout,
            "Starting pricing scheduler"
        );

        if *shutdown.borrow() {
            info!("Shutdown requested before first pass, stopping scheduler");
            return;
        }

        self.run_pass(&shutdown).await;

        let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_pass(&shutdown).await;
                }
                _ = cancelled(&mut shutdown) => {
                    info!("Received shutdown signal, stopping scheduler");
                    break;
                }
            }
        }

        info!("Pricing scheduler stopped");
    }

    /// Fetch every target concurrently and wait for all of them to resolve.
    ///
    /// A failing, hanging or panicking fetch only affects its own target.
    pub async fn run_pass(&self, shutdown: &watch::Receiver<bool>) -> PassSummary {
        let timer = PassTimer::start();
        let mut join_set = JoinSet::new();

        for target in self.targets.iter().cloned() {
            let source = self.registry.get(target.provider);
            let shutdown = shutdown.clone();
            let fetch_timeout = self.fetch_timeout;

            join_set.spawn(async move {
                let outcome = fetch_one(source, &target, fetch_timeout, shutdown).await;
                (target, outcome)
            });
        }

        let mut succeeded = 0;
        let mut failed = 0;

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((target, outcome)) => {
                    if self.record_outcome(&target, outcome) {
                        succeeded += 1;
                    } else {
                        failed += 1;
                    }
                }
                // Panics are caught inside the task, so this is only reachable
                // when the runtime itself is shutting down.
                Err(e) => {
                    error!(error = %e, "Fetch task aborted");
                    failed += 1;
                }
            }
        }

        let duration = timer.elapsed();
        PricingMetrics::record_pass(succeeded, failed, duration);

        let summary = PassSummary {
            succeeded,
            failed,
            duration_ms: duration.as_millis() as u64,
            timestamp: Utc::now(),
        };

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            duration_ms = summary.duration_ms,
            "Pricing pass complete"
        );

        summary
    }

    fn record_outcome(&self, target: &FetchTarget, outcome: ProviderResult<PricePoint>) -> bool {
        match outcome {
            Ok(point) => {
                self.sink.record_price(&point);
                self.sink
                    .record_last_success(target.provider, &target.region, Utc::now());

                debug!(
                    provider = %target.provider,
                    region = %target.region,
                    instance_type = %target.instance_type,
                    total_hourly_cost = point.total_hourly_cost(),
                    "Updated pricing"
                );
                true
            }
            Err(ProviderError::Cancelled) => {
                warn!(
                    provider = %target.provider,
                    region = %target.region,
                    instance_type = %target.instance_type,
                    "Fetch cancelled by shutdown"
                );
                self.sink.record_failure(target.provider, &target.region);
                false
            }
            Err(e) => {
                error!(
                    provider = %target.provider,
                    region = %target.region,
                    instance_type = %target.instance_type,
                    error = %e,
                    "Failed to fetch pricing"
                );
                self.sink.record_failure(target.provider, &target.region);
                false
            }
        }
    }
}

async fn fetch_one(
    source: Option<Arc<dyn PricingSource>>,
    target: &FetchTarget,
    fetch_timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> ProviderResult<PricePoint> {
    let source = source.ok_or_else(|| {
        ProviderError::NotConfigured(format!("no {} pricing source registered", target.provider))
    })?;

    let fetch = AssertUnwindSafe(async {
        source
            .fetch_price(&target.region, &target.instance_type)
            .await
    })
    .catch_unwind();

    tokio::select! {
        result = tokio::time::timeout(fetch_timeout, fetch) => match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(ProviderError::TaskPanicked),
            Err(_) => Err(ProviderError::Timeout(fetch_timeout)),
        },
        _ = cancelled(&mut shutdown) => Err(ProviderError::Cancelled),
    }
}

/// Resolves once shutdown is requested. A dropped sender never requests it.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
