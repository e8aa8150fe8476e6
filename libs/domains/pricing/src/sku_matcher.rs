//! Selection of per-core and per-GB SKUs from the GCP billing catalog.
//!
//! GCP prices vCPUs and memory independently. For a (region, family,
//! dimension) the catalog is expected to list a single on-demand SKU, so
//! the first matching line item in page order wins.

use futures::{Stream, TryStreamExt};
use tracing::debug;

use crate::error::{PricingError, PricingResult};
use crate::machine_shape;
use crate::models::{CloudProvider, MachineShape, PriceDimension, PricePoint, Sku};

/// Description phrases identifying each machine family's SKUs.
pub const FAMILY_PHRASES: &[(&str, &[&str])] = &[
    ("e2", &["e2 instance"]),
    ("n1", &["n1 predefined", "n1 instance"]),
    ("n2", &["n2 instance", "n2d instance"]),
    ("n2d", &["n2 instance", "n2d instance"]),
    ("n4", &["n4 instance", "n4d instance"]),
    ("n4d", &["n4 instance", "n4d instance"]),
    ("c2", &["c2 instance"]),
    ("c2d", &["c2d instance"]),
    ("c3", &["c3 instance"]),
];

const CORE_KEYWORDS: &[&str] = &["core", "vcpu"];
const MEMORY_KEYWORDS: &[&str] = &["ram", "memory"];
const ON_DEMAND_USAGE: &str = "OnDemand";

/// Which priced dimension a SKU description describes, if any.
pub fn classify(description: &str) -> Option<PriceDimension> {
    let desc = description.to_lowercase();
    if CORE_KEYWORDS.iter().any(|k| desc.contains(k)) {
        Some(PriceDimension::Core)
    } else if MEMORY_KEYWORDS.iter().any(|k| desc.contains(k)) {
        Some(PriceDimension::Memory)
    } else {
        None
    }
}

/// Whether a SKU description belongs to a machine family.
pub fn matches_family(description: &str, family: &str) -> bool {
    let desc = description.to_lowercase();
    let family = family.to_lowercase();

    match FAMILY_PHRASES.iter().find(|(name, _)| *name == family) {
        Some((_, phrases)) => phrases.iter().any(|phrase| desc.contains(phrase)),
        None => desc.contains(&family),
    }
}

/// Whether a SKU prices `dimension` for `family` in `region`.
pub fn matches(sku: &Sku, region: &str, family: &str, dimension: PriceDimension) -> bool {
    if sku
        .usage_type
        .as_deref()
        .is_some_and(|usage| usage != ON_DEMAND_USAGE)
    {
        return false;
    }

    classify(&sku.description) == Some(dimension)
        && matches_family(&sku.description, family)
        && sku.service_regions.iter().any(|r| r == region)
}

fn first_tier_price(sku: &Sku) -> Option<f64> {
    sku.pricing_tiers
        .first()
        .map(|tier| tier.as_f64())
        .filter(|price| price.is_finite() && *price > 0.0)
}

/// Walk catalog pages in order and return the unit price of the first match.
///
/// The stream is consumed only until a match is found; a page error aborts
/// the lookup.
pub async fn find_unit_price<S, E>(
    pages: S,
    region: &str,
    family: &str,
    dimension: PriceDimension,
) -> Result<f64, E>
where
    S: Stream<Item = Result<Vec<Sku>, E>>,
    E: From<PricingError>,
{
    futures::pin_mut!(pages);

    let mut scanned = 0usize;
    while let Some(page) = pages.try_next().await? {
        scanned += page.len();
        let found = page
            .iter()
            .filter(|sku| matches(sku, region, family, dimension))
            .find_map(first_tier_price);

        if let Some(price) = found {
            debug!(
                region = region,
                family = family,
                dimension = %dimension,
                price = price,
                scanned = scanned,
                "Matched catalog SKU"
            );
            return Ok(price);
        }
    }

    Err(PricingError::SkuNotFound {
        dimension,
        region: region.to_string(),
        family: family.to_string(),
    }
    .into())
}

/// Compose a price point from independently priced cores and memory.
pub fn compose_price(
    region: &str,
    machine_type: &str,
    shape: &MachineShape,
    core_price: f64,
    memory_price: f64,
) -> PricingResult<PricePoint> {
    let total = core_price * f64::from(shape.vcpus) + memory_price * shape.memory_gb;

    PricePoint::new(
        CloudProvider::Gcp,
        region,
        machine_type,
        total,
        shape.memory_gb,
        shape.vcpus,
    )
}

/// Resolve the machine shape, price both dimensions and compose the total.
///
/// `catalog` opens a fresh page stream per lookup; the core and memory
/// lookups are separate passes over the catalog and fail independently.
pub async fn price_machine_type<F, S, E>(
    catalog: F,
    region: &str,
    machine_type: &str,
) -> Result<PricePoint, E>
where
    F: Fn() -> S,
    S: Stream<Item = Result<Vec<Sku>, E>>,
    E: From<PricingError>,
{
    let shape = machine_shape::resolve(machine_type)?;

    let core_price = find_unit_price(catalog(), region, &shape.family, PriceDimension::Core).await?;
    let memory_price =
        find_unit_price(catalog(), region, &shape.family, PriceDimension::Memory).await?;

    debug!(
        region = region,
        machine_type = machine_type,
        core_price = core_price,
        memory_price = memory_price,
        vcpus = shape.vcpus,
        memory_gb = shape.memory_gb,
        "Composed GCP pricing"
    );

    Ok(compose_price(region, machine_type, &shape, core_price, memory_price)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UnitPrice;
    use futures::{stream, StreamExt};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sku(description: &str, regions: &[&str], units: i64, nanos: i32) -> Sku {
        Sku {
            description: description.to_string(),
            service_regions: regions.iter().map(|r| r.to_string()).collect(),
            usage_type: Some("OnDemand".to_string()),
            pricing_tiers: vec![UnitPrice::new(units, nanos)],
        }
    }

    fn pages(
        pages: Vec<Vec<Sku>>,
    ) -> impl Stream<Item = Result<Vec<Sku>, PricingError>> {
        stream::iter(pages.into_iter().map(Ok))
    }

    #[test]
    fn test_classify_dimensions() {
        assert_eq!(classify("N2 Instance Core running in Americas"), Some(PriceDimension::Core));
        assert_eq!(classify("E2 Instance vCPU"), Some(PriceDimension::Core));
        assert_eq!(classify("N2 Instance Ram running in Americas"), Some(PriceDimension::Memory));
        assert_eq!(classify("Memory-optimized Instance Memory"), Some(PriceDimension::Memory));
        assert_eq!(classify("Network Internet Egress"), None);
    }

    #[test]
    fn test_family_phrase_table() {
        assert!(matches_family("N1 Predefined Instance Core running in Americas", "n1"));
        assert!(!matches_family("N2D AMD Instance Ram", "n2"));
        assert!(matches_family("N2D Instance Ram running in Iowa", "n2"));
        assert!(matches_family("C3 Instance Core running in Iowa", "c3"));
        assert!(!matches_family("C2D Instance Core running in Iowa", "c2"));
        assert!(!matches_family("E2 Instance Core running in Iowa", "n2"));
    }

    #[test]
    fn test_unlisted_family_uses_substring_fallback() {
        assert!(matches_family("T2D AMD Instance Core running in Americas", "t2d"));
        assert!(!matches_family("N2 Instance Core running in Americas", "t2d"));
    }

    #[test]
    fn test_non_on_demand_usage_never_matches() {
        let mut spot = sku("Spot Preemptible N2 Instance Core", &["us-central1"], 0, 7_000_000);
        spot.usage_type = Some("Preemptible".to_string());

        assert!(!matches(&spot, "us-central1", "n2", PriceDimension::Core));

        spot.usage_type = None;
        assert!(matches(&spot, "us-central1", "n2", PriceDimension::Core));
    }

    #[tokio::test]
    async fn test_first_match_in_page_order_wins() {
        let catalog = pages(vec![
            vec![sku("N2 Instance Ram running in Americas", &["us-central1"], 0, 4_000_000)],
            vec![
                sku("N2 Instance Core running in Americas", &["us-central1"], 0, 30_000_000),
                sku("N2 Instance Core running in Americas", &["us-central1"], 0, 99_000_000),
            ],
        ]);

        let price = find_unit_price(catalog, "us-central1", "n2", PriceDimension::Core)
            .await
            .unwrap();

        assert_eq!(price, 0.03);
    }

    #[tokio::test]
    async fn test_never_matches_outside_service_regions() {
        let catalog = pages(vec![vec![
            sku(
                "N2 Instance Core running in EMEA",
                &["europe-west1", "europe-west4"],
                0,
                40_000_000,
            ),
            sku(
                "N2 Instance Core running in Americas",
                &["us-central1", "us-east1"],
                0,
                30_000_000,
            ),
        ]]);

        let price = find_unit_price(catalog, "us-east1", "n2", PriceDimension::Core)
            .await
            .unwrap();
        assert_eq!(price, 0.03);

        let catalog = pages(vec![vec![sku(
            "N2 Instance Core running in EMEA",
            &["europe-west1"],
            0,
            40_000_000,
        )]]);
        let err = find_unit_price(catalog, "us-east1", "n2", PriceDimension::Core)
            .await
            .unwrap_err();
        assert!(matches!(err, PricingError::SkuNotFound { dimension: PriceDimension::Core, .. }));
    }

    #[tokio::test]
    async fn test_zero_priced_match_is_skipped() {
        let catalog = pages(vec![vec![
            sku("E2 Instance Core running in Americas", &["us-central1"], 0, 0),
            sku("E2 Instance Core running in Americas", &["us-central1"], 0, 21_811_590),
        ]]);

        let price = find_unit_price(catalog, "us-central1", "e2", PriceDimension::Core)
            .await
            .unwrap();

        assert_eq!(price, 0.02181159);
    }

    #[tokio::test]
    async fn test_exhausted_catalog_is_not_found() {
        let catalog = pages(vec![vec![], vec![]]);
        let err = find_unit_price(catalog, "us-central1", "n2", PriceDimension::Memory)
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "No memory pricing found for region us-central1 and family n2"
        );
    }

    #[tokio::test]
    async fn test_stops_consuming_after_match() {
        let pulled = AtomicUsize::new(0);
        let catalog = stream::iter(vec![
            vec![sku("N2 Instance Core", &["us-central1"], 0, 30_000_000)],
            vec![sku("N2 Instance Core", &["us-central1"], 0, 50_000_000)],
        ])
        .map(|page| {
            pulled.fetch_add(1, Ordering::SeqCst);
            Ok::<_, PricingError>(page)
        });

        find_unit_price(catalog, "us-central1", "n2", PriceDimension::Core)
            .await
            .unwrap();

        assert_eq!(pulled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_page_error_aborts_lookup() {
        let catalog = stream::iter(vec![
            Ok(vec![]),
            Err(PricingError::InvalidMemory("boom".to_string())),
            Ok(vec![sku("N2 Instance Core", &["us-central1"], 0, 30_000_000)]),
        ]);

        let err = find_unit_price(catalog, "us-central1", "n2", PriceDimension::Core)
            .await
            .unwrap_err();

        assert!(matches!(err, PricingError::InvalidMemory(_)));
    }

    fn scenario_catalog() -> Vec<Vec<Sku>> {
        vec![
            vec![sku("E2 Instance Core running in Americas", &["us-central1"], 0, 21_811_590)],
            vec![
                sku("N2 Instance Core running in Americas", &["us-central1"], 0, 30_000_000),
                sku("N2 Instance Ram running in Americas", &["us-central1"], 0, 4_000_000),
            ],
        ]
    }

    #[tokio::test]
    async fn test_price_machine_type_end_to_end() {
        let point = price_machine_type(|| pages(scenario_catalog()), "us-central1", "n2-standard-2")
            .await
            .unwrap();

        assert_eq!(point.provider(), CloudProvider::Gcp);
        assert_eq!(point.vcpus(), 2);
        assert_eq!(point.memory_gb(), 7.5);
        assert!((point.total_hourly_cost() - 0.09).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_price_machine_type_is_idempotent() {
        let catalog = || pages(scenario_catalog());
        let first = price_machine_type(catalog, "us-central1", "n2-standard-2")
            .await
            .unwrap();
        let second = price_machine_type(catalog, "us-central1", "n2-standard-2")
            .await
            .unwrap();

        assert_eq!(
            first.total_hourly_cost().to_bits(),
            second.total_hourly_cost().to_bits()
        );
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_missing_memory_sku_fails_whole_price() {
        let catalog = vec![vec![sku(
            "N2 Instance Core running in Americas",
            &["us-central1"],
            0,
            30_000_000,
        )]];

        let err = price_machine_type(|| pages(catalog.clone()), "us-central1", "n2-standard-2")
            .await
            .unwrap_err();

        assert!(matches!(err, PricingError::SkuNotFound { dimension: PriceDimension::Memory, .. }));
    }

    #[tokio::test]
    async fn test_bad_machine_type_fails_before_catalog_lookup() {
        let opened = AtomicUsize::new(0);

        let err = price_machine_type(
            || {
                opened.fetch_add(1, Ordering::SeqCst);
                pages(vec![])
            },
            "us-central1",
            "n2",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PricingError::InvalidMachineType(_)));
        assert_eq!(opened.load(Ordering::SeqCst), 0);
    }
}
