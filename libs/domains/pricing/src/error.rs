use thiserror::Error;

use crate::models::PriceDimension;

/// Result type for pricing operations
pub type PricingResult<T> = Result<T, PricingError>;

/// Errors that can occur while normalizing vendor pricing
#[derive(Debug, Error)]
pub enum PricingError {
    /// Pricing document did not decode into the expected shape
    #[error("Failed to decode pricing document: {0}")]
    Decode(#[from] serde_json::Error),

    /// A required section of the pricing document is absent
    #[error("Invalid pricing document: missing {0}")]
    MissingField(&'static str),

    /// The catalog returned nothing for the query
    #[error("No pricing data found for instance type {instance_type} in region {region}")]
    NotFound {
        region: String,
        instance_type: String,
    },

    /// No dimension carried a positive price
    #[error("No valid pricing found")]
    PriceNotFound,

    /// Price was zero, negative or not finite
    #[error("Invalid hourly price: {0}")]
    InvalidPrice(f64),

    /// Memory string could not be parsed
    #[error("Invalid memory format: {0}")]
    InvalidMemory(String),

    /// Instance type identifier is malformed
    #[error("Invalid machine type format: {0}")]
    InvalidMachineType(String),

    /// Instance type is well-formed but its core count cannot be determined
    #[error("Could not determine vCPU count for machine type: {0}")]
    UnresolvableShape(String),

    /// Catalog was exhausted without a matching SKU
    #[error("No {dimension} pricing found for region {region} and family {family}")]
    SkuNotFound {
        dimension: PriceDimension,
        region: String,
        family: String,
    },
}
