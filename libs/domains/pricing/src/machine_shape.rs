//! Compute shape resolution for GCP machine type identifiers.
//!
//! Machine types are dash-delimited: `<family>-<class>[-<cores>]`, e.g.
//! `n2-standard-2`. Shared-core types carry no core count and are looked up
//! in [`FIXED_SHAPES`]; everything else derives memory from the core count
//! and a per-class ratio in [`CLASS_MEMORY_RATIOS`]. Custom types spell out
//! their memory in MiB as a fourth token.

use crate::error::{PricingError, PricingResult};
use crate::models::MachineShape;

/// Shared-core machine types: (identifier, family, vcpus, memory GB).
pub const FIXED_SHAPES: &[(&str, &str, u32, f64)] = &[
    ("e2-micro", "e2", 2, 1.0),
    ("e2-small", "e2", 2, 2.0),
    ("e2-medium", "e2", 2, 4.0),
    ("f1-micro", "f1", 1, 0.6),
    ("g1-small", "g1", 1, 1.7),
];

/// Memory GB per vCPU for each machine class keyword.
pub const CLASS_MEMORY_RATIOS: &[(&str, f64)] = &[
    ("standard", 3.75),
    ("highmem", 6.5),
    ("highcpu", 0.9),
];

/// Ratio applied to classes missing from [`CLASS_MEMORY_RATIOS`].
pub const DEFAULT_MEMORY_RATIO: f64 = 4.0;

const CUSTOM_CLASS: &str = "custom";

pub fn memory_ratio(class: &str) -> f64 {
    CLASS_MEMORY_RATIOS
        .iter()
        .find(|(name, _)| *name == class)
        .map(|(_, ratio)| *ratio)
        .unwrap_or(DEFAULT_MEMORY_RATIO)
}

/// Resolve a machine type identifier into its family, core count and memory.
pub fn resolve(machine_type: &str) -> PricingResult<MachineShape> {
    if let Some((_, family, vcpus, memory_gb)) =
        FIXED_SHAPES.iter().find(|(name, ..)| *name == machine_type)
    {
        return Ok(MachineShape {
            family: (*family).to_string(),
            vcpus: *vcpus,
            memory_gb: *memory_gb,
        });
    }

    let parts: Vec<&str> = machine_type.split('-').collect();
    if parts.len() < 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(PricingError::InvalidMachineType(machine_type.to_string()));
    }

    let family = parts[0];
    let class = parts[1];

    let Some(cores_token) = parts.get(2) else {
        return Err(PricingError::UnresolvableShape(machine_type.to_string()));
    };

    let vcpus = parse_positive(cores_token)
        .ok_or_else(|| PricingError::InvalidMachineType(machine_type.to_string()))?;

    let memory_gb = match (class, parts.get(3)) {
        (CUSTOM_CLASS, Some(memory_mib)) => {
            let mib = parse_positive(memory_mib)
                .ok_or_else(|| PricingError::InvalidMachineType(machine_type.to_string()))?;
            f64::from(mib) / 1024.0
        }
        _ => f64::from(vcpus) * memory_ratio(class),
    };

    Ok(MachineShape {
        family: family.to_string(),
        vcpus,
        memory_gb,
    })
}

fn parse_positive(token: &str) -> Option<u32> {
    token.parse::<u32>().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_shapes_use_table_values() {
        for (name, family, vcpus, memory_gb) in FIXED_SHAPES {
            let shape = resolve(name).unwrap();
            assert_eq!(shape.family, *family);
            assert_eq!(shape.vcpus, *vcpus);
            assert_eq!(shape.memory_gb, *memory_gb);
        }
    }

    #[test]
    fn test_e2_micro() {
        let shape = resolve("e2-micro").unwrap();
        assert_eq!(
            shape,
            MachineShape {
                family: "e2".to_string(),
                vcpus: 2,
                memory_gb: 1.0
            }
        );
    }

    #[test]
    fn test_standard_class_ratio() {
        let shape = resolve("n2-standard-2").unwrap();
        assert_eq!(shape.family, "n2");
        assert_eq!(shape.vcpus, 2);
        assert_eq!(shape.memory_gb, 7.5);

        for n in [1u32, 4, 8, 16, 32, 96] {
            let shape = resolve(&format!("n1-standard-{n}")).unwrap();
            assert_eq!(shape.memory_gb, f64::from(n) * 3.75);
        }
    }

    #[test]
    fn test_highmem_highcpu_and_default_ratios() {
        assert_eq!(resolve("n2-highmem-4").unwrap().memory_gb, 26.0);
        assert_eq!(resolve("c2d-highcpu-8").unwrap().memory_gb, 8.0 * 0.9);
        assert_eq!(resolve("c3-megamem-2").unwrap().memory_gb, 8.0);
    }

    #[test]
    fn test_custom_machine_type_uses_memory_token() {
        let shape = resolve("n2-custom-4-16384").unwrap();
        assert_eq!(shape.vcpus, 4);
        assert_eq!(shape.memory_gb, 16.0);
    }

    #[test]
    fn test_too_few_tokens_is_format_error() {
        for input in ["n2", "", "-standard", "n2-"] {
            assert!(
                matches!(resolve(input), Err(PricingError::InvalidMachineType(_))),
                "{input:?}"
            );
        }
    }

    #[test]
    fn test_bad_core_count_is_format_error() {
        for input in ["n2-standard-x", "n2-standard-0", "n2-standard--2", "n2-standard-"] {
            assert!(
                matches!(resolve(input), Err(PricingError::InvalidMachineType(_))),
                "{input:?}"
            );
        }
    }

    #[test]
    fn test_missing_core_count_is_unresolvable() {
        assert!(matches!(
            resolve("n2-standard"),
            Err(PricingError::UnresolvableShape(_))
        ));
        assert!(matches!(
            resolve("e2-large"),
            Err(PricingError::UnresolvableShape(_))
        ));
    }

    #[test]
    fn test_unknown_class_falls_back_to_default_ratio() {
        assert_eq!(memory_ratio("ultramem"), DEFAULT_MEMORY_RATIO);
        assert_eq!(memory_ratio("standard"), 3.75);
    }
}
