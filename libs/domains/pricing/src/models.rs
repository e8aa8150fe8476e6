use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::{PricingError, PricingResult};

/// Cloud provider enumeration
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CloudProvider {
    Aws,
    Gcp,
}

/// Canonical normalized hourly cost for one (provider, region, instance shape).
///
/// Construction goes through [`PricePoint::new`], which rejects anything but a
/// finite positive total so a zero-cost point can never be published.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    provider: CloudProvider,
    region: String,
    instance_type: String,
    total_hourly_cost: f64,
    memory_gb: f64,
    vcpus: u32,
}

impl PricePoint {
    pub fn new(
        provider: CloudProvider,
        region: impl Into<String>,
        instance_type: impl Into<String>,
        total_hourly_cost: f64,
        memory_gb: f64,
        vcpus: u32,
    ) -> PricingResult<Self> {
        if !total_hourly_cost.is_finite() || total_hourly_cost <= 0.0 {
            return Err(PricingError::InvalidPrice(total_hourly_cost));
        }

        // Memory is a best-effort field; anything unusable collapses to zero.
        let memory_gb = if memory_gb.is_finite() && memory_gb > 0.0 {
            memory_gb
        } else {
            0.0
        };

        Ok(Self {
            provider,
            region: region.into(),
            instance_type: instance_type.into(),
            total_hourly_cost,
            memory_gb,
            vcpus,
        })
    }

    pub fn provider(&self) -> CloudProvider {
        self.provider
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn instance_type(&self) -> &str {
        &self.instance_type
    }

    pub fn total_hourly_cost(&self) -> f64 {
        self.total_hourly_cost
    }

    pub fn memory_gb(&self) -> f64 {
        self.memory_gb
    }

    pub fn vcpus(&self) -> u32 {
        self.vcpus
    }

    /// Hourly cost per GB of memory, `None` when memory is unknown.
    pub fn cost_per_gb(&self) -> Option<f64> {
        (self.memory_gb > 0.0).then(|| self.total_hourly_cost / self.memory_gb)
    }

    /// Hourly cost per vCPU, `None` when the core count is unknown.
    pub fn cost_per_vcpu(&self) -> Option<f64> {
        (self.vcpus > 0).then(|| self.total_hourly_cost / f64::from(self.vcpus))
    }
}

/// One (provider, region, instance type) tuple scheduled for a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FetchTarget {
    pub provider: CloudProvider,
    pub region: String,
    pub instance_type: String,
}

impl FetchTarget {
    pub fn new(
        provider: CloudProvider,
        region: impl Into<String>,
        instance_type: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            region: region.into(),
            instance_type: instance_type.into(),
        }
    }

    /// Cross product of regions and instance types for a single provider.
    pub fn cross_product(
        provider: CloudProvider,
        regions: &[String],
        instance_types: &[String],
    ) -> Vec<Self> {
        regions
            .iter()
            .flat_map(|region| {
                instance_types
                    .iter()
                    .map(move |instance_type| Self::new(provider, region, instance_type))
            })
            .collect()
    }
}

/// Resolved compute shape of an instance type identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineShape {
    pub family: String,
    pub vcpus: u32,
    pub memory_gb: f64,
}

/// Priced dimension of a per-resource billing model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PriceDimension {
    Core,
    Memory,
}

/// Fixed-point money as the billing catalog expresses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnitPrice {
    pub units: i64,
    pub nanos: i32,
}

impl UnitPrice {
    pub fn new(units: i64, nanos: i32) -> Self {
        Self { units, nanos }
    }

    pub fn as_f64(&self) -> f64 {
        self.units as f64 + f64::from(self.nanos) / 1e9
    }
}

/// Billable catalog line item describing one priced dimension.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sku {
    pub description: String,
    pub service_regions: Vec<String>,
    /// Category usage type (`OnDemand`, `Preemptible`, `Commit1Yr`, ...), when reported.
    pub usage_type: Option<String>,
    pub pricing_tiers: Vec<UnitPrice>,
}
