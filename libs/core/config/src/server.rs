use crate::{env_or_default, ConfigError, FromEnv};
use std::net::Ipv4Addr;

/// Listener configuration for the metrics endpoint
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FromEnv for ServerConfig {
    /// Reads from environment variables with sensible defaults:
    /// - METRICS_HOST: defaults to Ipv4Addr::UNSPECIFIED (0.0.0.0 - all interfaces)
    /// - METRICS_PORT: defaults to 9090
    fn from_env() -> Result<Self, ConfigError> {
        let host = env_or_default("METRICS_HOST", &Ipv4Addr::UNSPECIFIED.to_string());
        let port = env_or_default("METRICS_PORT", "9090").parse().map_err(|e| {
            ConfigError::ParseError {
                key: "METRICS_PORT".to_string(),
                details: format!("{}", e),
            }
        })?;

        Ok(Self { host, port })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::UNSPECIFIED.to_string(),
            port: 9090,
        }
    }
}
