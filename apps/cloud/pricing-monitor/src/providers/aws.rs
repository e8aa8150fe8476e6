//! AWS Pricing Provider
//!
//! Queries the AWS Price List Query API for on-demand EC2 pricing.
//! https://docs.aws.amazon.com/awsaccountbilling/latest/aboutv2/price-list-query-api.html

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_pricing::error::DisplayErrorContext;
use aws_sdk_pricing::types::{Filter, FilterType};
use aws_sdk_pricing::Client;
use domain_pricing::offer_terms;
use domain_pricing::{CloudProvider, PricePoint};
use tracing::{debug, warn};

use super::{PricingSource, ProviderError, ProviderResult};
use crate::config::AwsConfig;

const EC2_SERVICE_CODE: &str = "AmazonEC2";

/// Narrow enough to return a single Linux, shared-tenancy, on-demand product.
const MAX_RESULTS: i32 = 10;

/// AWS Pricing Provider
pub struct AwsPricingProvider {
    client: Client,
}

impl AwsPricingProvider {
    /// Build a client against the Price List API endpoint region.
    ///
    /// Credentials come from the default provider chain and are resolved once
    /// here, so missing credentials fail startup instead of every pass.
    pub async fn new(config: &AwsConfig) -> ProviderResult<Self> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.pricing_region.clone()))
            .load()
            .await;

        let credentials_provider = sdk_config.credentials_provider().ok_or_else(|| {
            ProviderError::NotConfigured("no AWS credentials provider available".to_string())
        })?;

        if let Err(e) = credentials_provider.provide_credentials().await {
            warn!(error = %e, "Failed to resolve AWS credentials");
            return Err(ProviderError::NotConfigured(format!(
                "AWS credentials could not be resolved: {e}"
            )));
        }

        debug!("Successfully retrieved AWS credentials");

        Ok(Self {
            client: Client::new(&sdk_config),
        })
    }
}

/// Term-match filters selecting the on-demand Linux product for an instance type.
pub fn product_filters(region: &str, instance_type: &str) -> ProviderResult<Vec<Filter>> {
    [
        ("ServiceCode", EC2_SERVICE_CODE),
        ("instanceType", instance_type),
        ("regionCode", region),
        ("operatingSystem", "Linux"),
        ("tenancy", "Shared"),
        ("capacitystatus", "Used"),
        ("preInstalledSw", "NA"),
    ]
    .into_iter()
    .map(|(field, value)| {
        Filter::builder()
            .r#type(FilterType::TermMatch)
            .field(field)
            .value(value)
            .build()
            .map_err(|e| ProviderError::AwsError(format!("invalid {field} filter: {e}")))
    })
    .collect()
}

#[async_trait]
impl PricingSource for AwsPricingProvider {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Aws
    }

    async fn fetch_price(&self, region: &str, instance_type: &str) -> ProviderResult<PricePoint> {
        debug!(
            region = region,
            instance_type = instance_type,
            "Fetching AWS pricing"
        );

        let output = self
            .client
            .get_products()
            .service_code(EC2_SERVICE_CODE)
            .set_filters(Some(product_filters(region, instance_type)?))
            .max_results(MAX_RESULTS)
            .send()
            .await
            .map_err(|e| ProviderError::AwsError(DisplayErrorContext(&e).to_string()))?;

        let point = offer_terms::normalize_price_list(output.price_list(), region, instance_type)?;

        debug!(
            region = region,
            instance_type = instance_type,
            hourly_price = point.total_hourly_cost(),
            "Fetched AWS pricing"
        );

        Ok(point)
    }
}
