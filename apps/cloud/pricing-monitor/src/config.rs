//! Configuration for the pricing monitor

use core_config::server::ServerConfig;
use core_config::{env_duration, env_list, env_optional, env_or_default, ConfigError, FromEnv};
use domain_pricing::{CloudProvider, FetchTarget};
use std::fmt;
use std::time::Duration;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct Config {
    pub aws: AwsConfig,
    pub gcp: GcpConfig,
    /// How often to refresh pricing data
    pub poll_interval: Duration,
    /// Deadline for a single (provider, region, instance type) fetch
    pub fetch_timeout: Duration,
    pub metrics: ServerConfig,
}

#[derive(Debug, Clone, Default)]
pub struct AwsConfig {
    /// Region hosting the Price List API endpoint
    pub pricing_region: String,
    /// Regions to monitor
    pub regions: Vec<String>,
    /// EC2 instance types to track
    pub instance_types: Vec<String>,
}

fn default_aws_pricing_region() -> String {
    "us-east-1".to_string()
}

#[derive(Clone, Default)]
pub struct GcpConfig {
    /// Cloud Billing API base URL
    pub api_url: String,
    /// API key for the Cloud Billing Catalog API
    pub api_key: Option<String>,
    /// OAuth access token, used when no API key is set
    pub access_token: Option<String>,
    /// Regions to monitor
    pub regions: Vec<String>,
    /// Machine types to track
    pub instance_types: Vec<String>,
}

fn default_gcp_api_url() -> String {
    "https://cloudbilling.googleapis.com/v1".to_string()
}

impl fmt::Debug for GcpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcpConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("regions", &self.regions)
            .field("instance_types", &self.instance_types)
            .finish()
    }
}

impl AwsConfig {
    pub fn is_enabled(&self) -> bool {
        !self.regions.is_empty()
    }
}

impl GcpConfig {
    pub fn is_enabled(&self) -> bool {
        !self.regions.is_empty()
    }
}

impl FromEnv for Config {
    fn from_env() -> Result<Self, ConfigError> {
        let poll_interval = env_duration("POLL_INTERVAL")?.unwrap_or(DEFAULT_POLL_INTERVAL);
        let fetch_timeout = env_duration("FETCH_TIMEOUT")?.unwrap_or(poll_interval / 2);

        let config = Config {
            aws: AwsConfig {
                pricing_region: env_or_default("AWS_PRICING_REGION", &default_aws_pricing_region()),
                regions: env_list("AWS_REGIONS"),
                instance_types: env_list("AWS_INSTANCE_TYPES"),
            },
            gcp: GcpConfig {
                api_url: env_or_default("GCP_BILLING_API_URL", &default_gcp_api_url()),
                api_key: env_optional("GCP_API_KEY"),
                access_token: env_optional("GCP_ACCESS_TOKEN"),
                regions: env_list("GCP_REGIONS"),
                instance_types: env_list("GCP_INSTANCE_TYPES"),
            },
            poll_interval,
            fetch_timeout,
            metrics: ServerConfig::from_env()?,
        };

        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Reject combinations the scheduler cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.aws.is_enabled() && !self.gcp.is_enabled() {
            return Err(ConfigError::Invalid(
                "must specify at least one AWS or GCP region".to_string(),
            ));
        }

        check_pairing("aws", &self.aws.regions, &self.aws.instance_types)?;
        check_pairing("gcp", &self.gcp.regions, &self.gcp.instance_types)?;

        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid("poll interval must be positive".to_string()));
        }

        if self.fetch_timeout.is_zero() || self.fetch_timeout > self.poll_interval {
            return Err(ConfigError::Invalid(format!(
                "fetch timeout {:?} must be positive and no longer than the poll interval {:?}",
                self.fetch_timeout, self.poll_interval
            )));
        }

        Ok(())
    }

    /// Every (provider, region, instance type) tuple to refresh each pass.
    pub fn targets(&self) -> Vec<FetchTarget> {
        let mut targets = FetchTarget::cross_product(
            CloudProvider::Aws,
            &self.aws.regions,
            &self.aws.instance_types,
        );
        targets.extend(FetchTarget::cross_product(
            CloudProvider::Gcp,
            &self.gcp.regions,
            &self.gcp.instance_types,
        ));
        targets
    }
}

fn check_pairing(
    provider: &str,
    regions: &[String],
    instance_types: &[String],
) -> Result<(), ConfigError> {
    match (regions.is_empty(), instance_types.is_empty()) {
        (false, true) => Err(ConfigError::Invalid(format!(
            "{provider}-regions specified but no {provider}-instance-types provided"
        ))),
        (true, false) => Err(ConfigError::Invalid(format!(
            "{provider}-instance-types specified but no {provider}-regions provided"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_VARS: [&str; 9] = [
        "AWS_REGIONS",
        "AWS_INSTANCE_TYPES",
        "GCP_REGIONS",
        "GCP_INSTANCE_TYPES",
        "GCP_API_KEY",
        "GCP_ACCESS_TOKEN",
        "POLL_INTERVAL",
        "FETCH_TIMEOUT",
        "METRICS_PORT",
    ];

    fn with_env<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        let mut all: Vec<(&str, Option<&str>)> = ALL_VARS.iter().map(|k| (*k, None)).collect();
        for &(key, value) in vars {
            all.retain(|(k, _)| *k != key);
            all.push((key, Some(value)));
        }
        temp_env::with_vars(all, f);
    }

    #[test]
    fn test_from_env_defaults() {
        with_env(
            &[("AWS_REGIONS", "us-east-1,us-west-2"), ("AWS_INSTANCE_TYPES", "t3.micro")],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.aws.pricing_region, "us-east-1");
                assert_eq!(config.aws.regions, vec!["us-east-1", "us-west-2"]);
                assert!(!config.gcp.is_enabled());
                assert_eq!(config.poll_interval, Duration::from_secs(3600));
                assert_eq!(config.fetch_timeout, Duration::from_secs(1800));
                assert_eq!(config.metrics.port, 9090);
            },
        );
    }

    #[test]
    fn test_from_env_custom_intervals() {
        with_env(
            &[
                ("GCP_REGIONS", "us-central1"),
                ("GCP_INSTANCE_TYPES", "e2-micro,n2-standard-2"),
                ("GCP_API_KEY", "secret"),
                ("POLL_INTERVAL", "15m"),
                ("FETCH_TIMEOUT", "2m"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.poll_interval, Duration::from_secs(900));
                assert_eq!(config.fetch_timeout, Duration::from_secs(120));
                assert_eq!(config.gcp.api_key.as_deref(), Some("secret"));
                assert_eq!(config.targets().len(), 2);
            },
        );
    }

    #[test]
    fn test_no_regions_rejected() {
        with_env(&[], || {
            let err = Config::from_env().unwrap_err();
            assert!(err.to_string().contains("at least one AWS or GCP region"));
        });
    }

    #[test]
    fn test_regions_without_instance_types_rejected() {
        with_env(&[("GCP_REGIONS", "us-central1")], || {
            let err = Config::from_env().unwrap_err();
            assert!(err.to_string().contains("gcp-regions specified"));
        });
    }

    #[test]
    fn test_instance_types_without_regions_rejected() {
        with_env(
            &[
                ("AWS_REGIONS", "us-east-1"),
                ("AWS_INSTANCE_TYPES", "t3.micro"),
                ("GCP_INSTANCE_TYPES", "e2-micro"),
            ],
            || {
                let err = Config::from_env().unwrap_err();
                assert!(err.to_string().contains("gcp-instance-types specified"));
            },
        );
    }

    #[test]
    fn test_fetch_timeout_longer_than_interval_rejected() {
        with_env(
            &[
                ("AWS_REGIONS", "us-east-1"),
                ("AWS_INSTANCE_TYPES", "t3.micro"),
                ("POLL_INTERVAL", "1m"),
                ("FETCH_TIMEOUT", "5m"),
            ],
            || {
                let err = Config::from_env().unwrap_err();
                assert!(err.to_string().contains("fetch timeout"));
            },
        );
    }

    #[test]
    fn test_targets_cross_both_providers() {
        with_env(
            &[
                ("AWS_REGIONS", "us-east-1,eu-west-1"),
                ("AWS_INSTANCE_TYPES", "t3.micro,m5.large"),
                ("GCP_REGIONS", "us-central1"),
                ("GCP_INSTANCE_TYPES", "n2-standard-2"),
            ],
            || {
                let targets = Config::from_env().unwrap().targets();
                assert_eq!(targets.len(), 5);
                assert_eq!(
                    targets.iter().filter(|t| t.provider == CloudProvider::Gcp).count(),
                    1
                );
            },
        );
    }

    #[test]
    fn test_debug_redacts_gcp_credentials() {
        let gcp = GcpConfig {
            api_key: Some("super-secret".to_string()),
            ..Default::default()
        };
        let rendered = format!("{gcp:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
