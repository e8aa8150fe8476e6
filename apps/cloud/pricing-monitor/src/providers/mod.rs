//! Cloud pricing providers
//!
//! Each provider wraps one vendor pricing API and turns a (region,
//! instance type) query into a normalized [`PricePoint`].

pub mod aws;
pub mod gcp;

use async_trait::async_trait;
use domain_pricing::{CloudProvider, PricePoint, PricingError};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub use aws::AwsPricingProvider;
pub use gcp::GcpPricingProvider;

use crate::config::Config;

/// Error type for pricing provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("AWS Pricing API error: {0}")]
    AwsError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("Fetch cancelled by shutdown")]
    Cancelled,

    #[error("Fetch task panicked")]
    TaskPanicked,
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// A vendor pricing API able to price one instance type in one region.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PricingSource: Send + Sync {
    /// Get the cloud provider type
    fn provider(&self) -> CloudProvider;

    /// Fetch and normalize the hourly price of an instance type in a region
    async fn fetch_price(&self, region: &str, instance_type: &str) -> ProviderResult<PricePoint>;
}

/// Registry of initialized pricing sources, keyed by provider
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    sources: BTreeMap<CloudProvider, Arc<dyn PricingSource>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build clients for every provider with at least one configured region.
    ///
    /// Providers without regions are never constructed, so their credentials
    /// are never required. A construction failure for a configured provider
    /// is returned rather than skipped.
    pub async fn from_config(config: &Config) -> ProviderResult<Self> {
        let mut registry = Self::new();

        if config.aws.is_enabled() {
            let provider = AwsPricingProvider::new(&config.aws).await?;
            registry.register(Arc::new(provider));
        }

        if config.gcp.is_enabled() {
            let provider = GcpPricingProvider::new(&config.gcp)?;
            registry.register(Arc::new(provider));
        }

        info!(
            providers = ?registry.providers().collect::<Vec<_>>(),
            "Pricing providers initialized"
        );

        Ok(registry)
    }

    pub fn register(&mut self, source: Arc<dyn PricingSource>) {
        self.sources.insert(source.provider(), source);
    }

    pub fn get(&self, provider: CloudProvider) -> Option<Arc<dyn PricingSource>> {
        self.sources.get(&provider).cloned()
    }

    pub fn providers(&self) -> impl Iterator<Item = CloudProvider> + '_ {
        self.sources.keys().copied()
    }
}
