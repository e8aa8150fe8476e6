//! GCP Pricing Provider
//!
//! Prices Compute Engine machine types from the Cloud Billing Catalog API.
//! https://cloud.google.com/billing/docs/reference/rest/v1/services.skus

use async_trait::async_trait;
use domain_pricing::sku_matcher;
use domain_pricing::{CloudProvider, PricePoint, PricingError, Sku, UnitPrice};
use futures::stream::{self, Stream};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{PricingSource, ProviderError, ProviderResult};
use crate::config::GcpConfig;

/// Compute Engine service ID in the billing catalog
const COMPUTE_ENGINE_SERVICE_ID: &str = "6F81-5844-456A";

const PAGE_SIZE: &str = "5000";

/// Keeps the API key out of request URLs, which surface in transport errors.
const API_KEY_HEADER: &str = "X-Goog-Api-Key";

/// GCP Pricing Provider
pub struct GcpPricingProvider {
    client: Client,
    api_url: String,
    credential: GcpCredential,
}

enum GcpCredential {
    ApiKey(String),
    AccessToken(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GcpSkuListResponse {
    #[serde(default)]
    skus: Vec<GcpSku>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GcpSku {
    #[serde(default)]
    description: String,
    category: Option<GcpCategory>,
    #[serde(default)]
    service_regions: Vec<String>,
    #[serde(default)]
    pricing_info: Vec<GcpPricingInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GcpCategory {
    usage_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GcpPricingInfo {
    pricing_expression: Option<GcpPricingExpression>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GcpPricingExpression {
    #[serde(default)]
    tiered_rates: Vec<GcpTieredRate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GcpTieredRate {
    unit_price: Option<GcpMoney>,
}

/// `google.type.Money`; `units` is an int64 serialized as a string.
#[derive(Debug, Deserialize)]
struct GcpMoney {
    units: Option<String>,
    nanos: Option<i32>,
}

impl GcpMoney {
    fn to_unit_price(&self) -> Option<UnitPrice> {
        let units = match self.units.as_deref() {
            Some(units) => units.parse().ok()?,
            None => 0,
        };
        Some(UnitPrice::new(units, self.nanos.unwrap_or(0)))
    }
}

impl From<GcpSku> for Sku {
    fn from(sku: GcpSku) -> Self {
        let pricing_tiers = sku
            .pricing_info
            .first()
            .and_then(|info| info.pricing_expression.as_ref())
            .map(|expression| {
                expression
                    .tiered_rates
                    .iter()
                    .filter_map(|rate| rate.unit_price.as_ref()?.to_unit_price())
                    .collect()
            })
            .unwrap_or_default();

        Sku {
            description: sku.description,
            service_regions: sku.service_regions,
            usage_type: sku.category.and_then(|c| c.usage_type),
            pricing_tiers,
        }
    }
}

fn parse_page(body: &str) -> ProviderResult<GcpSkuListResponse> {
    serde_json::from_str(body).map_err(|e| ProviderError::Pricing(PricingError::Decode(e)))
}

impl GcpPricingProvider {
    /// Requires either an API key or an access token; the API key wins when both are set.
    pub fn new(config: &GcpConfig) -> ProviderResult<Self> {
        let credential = match (&config.api_key, &config.access_token) {
            (Some(key), _) => GcpCredential::ApiKey(key.clone()),
            (None, Some(token)) => GcpCredential::AccessToken(token.clone()),
            (None, None) => {
                return Err(ProviderError::NotConfigured(
                    "GCP_API_KEY or GCP_ACCESS_TOKEN is required for GCP pricing".to_string(),
                ));
            }
        };

        Ok(Self {
            client: Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            credential,
        })
    }

    async fn fetch_page(&self, page_token: Option<&str>) -> ProviderResult<GcpSkuListResponse> {
        let url = format!(
            "{}/services/{}/skus",
            self.api_url, COMPUTE_ENGINE_SERVICE_ID
        );

        let mut query = vec![("currencyCode", "USD"), ("pageSize", PAGE_SIZE)];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let request = match &self.credential {
            GcpCredential::ApiKey(key) => {
                self.client.get(&url).header(API_KEY_HEADER, key.as_str())
            }
            GcpCredential::AccessToken(token) => self.client.get(&url).bearer_auth(token),
        };

        let response = request
            .query(&query)
            .send()
            .await
            .map_err(|e| ProviderError::HttpError(e.without_url()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::HttpError(e.without_url()))?;

        if !status.is_success() {
            warn!(status = %status, "GCP Billing API request failed");
            return Err(ProviderError::ApiError(format!(
                "GCP API returned status {status}: {body}"
            )));
        }

        parse_page(&body)
    }

    /// Lazily paginated view of the Compute Engine catalog.
    ///
    /// Pages are only requested as the consumer pulls them, so a lookup that
    /// matches early never fetches the rest of the catalog.
    fn sku_pages(&self) -> impl Stream<Item = ProviderResult<Vec<Sku>>> + '_ {
        stream::try_unfold(Some(None::<String>), move |cursor| async move {
            let Some(page_token) = cursor else {
                return Ok(None);
            };

            let page = self.fetch_page(page_token.as_deref()).await?;
            debug!(skus = page.skus.len(), "Fetched GCP catalog page");

            let next = page
                .next_page_token
                .filter(|token| !token.is_empty())
                .map(Some);
            let skus = page.skus.into_iter().map(Sku::from).collect();

            Ok(Some((skus, next)))
        })
    }
}

#[async_trait]
impl PricingSource for GcpPricingProvider {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Gcp
    }

    async fn fetch_price(&self, region: &str, instance_type: &str) -> ProviderResult<PricePoint> {
        debug!(
            region = region,
            instance_type = instance_type,
            "Fetching GCP pricing"
        );

        sku_matcher::price_machine_type(|| self.sku_pages(), region, instance_type).await
    }
}
