//! Pricing Domain
//!
//! Vendor-neutral core of the pricing monitor: the canonical [`PricePoint`]
//! and the pure translations that produce it from vendor payloads.
//!
//! # Architecture
//!
//! ```text
//!  AWS price list document          GCP billing catalog pages
//!            │                                 │
//!  ┌─────────▼─────────┐   ┌──────────────────▼──────────────────┐
//!  │    offer_terms    │   │ machine_shape ─► sku_matcher        │
//!  └─────────┬─────────┘   └──────────────────┬──────────────────┘
//!            └────────────────┬────────────────┘
//!                      ┌──────▼──────┐
//!                      │ PricePoint  │ ─► MetricSink
//!                      └─────────────┘
//! ```

pub mod error;
pub mod machine_shape;
pub mod models;
pub mod offer_terms;
pub mod sink;
pub mod sku_matcher;

// Re-export commonly used types
pub use error::{PricingError, PricingResult};
pub use models::{
    CloudProvider, FetchTarget, MachineShape, PriceDimension, PricePoint, Sku, UnitPrice,
};
pub use sink::MetricSink;

#[cfg(any(test, feature = "mocks"))]
pub use sink::MockMetricSink;
