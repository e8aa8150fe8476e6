//! Normalization of AWS Price List documents.
//!
//! A `GetProducts` result is a list of JSON strings, one per product. Each
//! carries the instance shape under `product.attributes` and the on-demand
//! offer under `terms.OnDemand.<term>.priceDimensions.<dimension>.pricePerUnit`.
//! The document is decoded into the typed structures below; every section the
//! normalizer depends on is optional so a missing one surfaces as a
//! [`PricingError::MissingField`] rather than a generic decode failure.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{PricingError, PricingResult};
use crate::models::{CloudProvider, PricePoint};

/// Bytes in a GiB expressed in decimal GB.
pub const GIB_TO_GB: f64 = 1.073741824;

#[derive(Debug, Deserialize)]
struct PriceListDocument {
    product: Option<Product>,
    terms: Option<Terms>,
}

#[derive(Debug, Deserialize)]
struct Product {
    attributes: Option<ProductAttributes>,
}

#[derive(Debug, Default, Deserialize)]
struct ProductAttributes {
    memory: Option<String>,
    vcpu: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Terms {
    #[serde(rename = "OnDemand")]
    on_demand: Option<BTreeMap<String, OfferTerm>>,
}

#[derive(Debug, Deserialize)]
struct OfferTerm {
    #[serde(rename = "priceDimensions", default)]
    price_dimensions: BTreeMap<String, PriceDimension>,
}

#[derive(Debug, Deserialize)]
struct PriceDimension {
    #[serde(rename = "pricePerUnit", default)]
    price_per_unit: BTreeMap<String, String>,
}

/// Normalize the product documents returned for one (region, instance type) query.
///
/// Only the first document is used; the query filters are narrow enough that
/// the catalog returns a single product.
pub fn normalize_price_list<S: AsRef<str>>(
    documents: &[S],
    region: &str,
    instance_type: &str,
) -> PricingResult<PricePoint> {
    let document = documents.first().ok_or_else(|| PricingError::NotFound {
        region: region.to_string(),
        instance_type: instance_type.to_string(),
    })?;

    normalize(document.as_ref(), region, instance_type)
}

/// Translate a single price list document into a [`PricePoint`].
pub fn normalize(raw: &str, region: &str, instance_type: &str) -> PricingResult<PricePoint> {
    let document: PriceListDocument = serde_json::from_str(raw)?;

    let attributes = document
        .product
        .ok_or(PricingError::MissingField("product"))?
        .attributes
        .ok_or(PricingError::MissingField("product.attributes"))?;

    let on_demand = document
        .terms
        .ok_or(PricingError::MissingField("terms"))?
        .on_demand
        .ok_or(PricingError::MissingField("terms.OnDemand"))?;

    let hourly_price = first_positive_usd_price(&on_demand).ok_or(PricingError::PriceNotFound)?;

    let memory_str = attributes.memory.unwrap_or_default();
    let memory_gb = parse_memory(&memory_str).unwrap_or_else(|e| {
        warn!(memory = %memory_str, error = %e, "Failed to parse memory");
        0.0
    });

    let vcpu_str = attributes.vcpu.unwrap_or_default();
    let vcpus = vcpu_str.trim().parse::<u32>().unwrap_or_else(|e| {
        warn!(vcpu = %vcpu_str, error = %e, "Failed to parse vcpu");
        0
    });

    debug!(
        region = region,
        instance_type = instance_type,
        hourly_price = hourly_price,
        memory_gb = memory_gb,
        vcpus = vcpus,
        "Normalized AWS pricing"
    );

    PricePoint::new(
        CloudProvider::Aws,
        region,
        instance_type,
        hourly_price,
        memory_gb,
        vcpus,
    )
}

fn first_positive_usd_price(on_demand: &BTreeMap<String, OfferTerm>) -> Option<f64> {
    on_demand
        .values()
        .flat_map(|term| term.price_dimensions.values())
        .filter_map(|dimension| dimension.price_per_unit.get("USD"))
        .filter_map(|usd| usd.trim().parse::<f64>().ok())
        .find(|price| price.is_finite() && *price > 0.0)
}

/// Convert a vendor memory string such as `"8 GiB"` into decimal GB.
pub fn parse_memory(memory: &str) -> PricingResult<f64> {
    let mut parts = memory.split_whitespace();
    let (Some(quantity), Some(unit), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(PricingError::InvalidMemory(memory.to_string()));
    };

    let value: f64 = quantity
        .replace(',', "")
        .parse()
        .map_err(|_| PricingError::InvalidMemory(memory.to_string()))?;

    if !value.is_finite() || value < 0.0 {
        return Err(PricingError::InvalidMemory(memory.to_string()));
    }

    let gb = match unit.to_ascii_uppercase().as_str() {
        "GIB" => value * GIB_TO_GB,
        "GB" => value,
        "MIB" => value * GIB_TO_GB / 1024.0,
        "MB" => value / 1000.0,
        "TIB" => value * GIB_TO_GB * 1024.0,
        "TB" => value * 1000.0,
        _ => return Err(PricingError::InvalidMemory(memory.to_string())),
    };

    Ok(gb)
}
