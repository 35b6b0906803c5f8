//! Deployment flavor selection from hardware facts

use serde::Serialize;
use std::fmt;

/// Compute flavor used to deploy an imported image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Flavor {
    /// `m1.tiny`
    #[serde(rename = "m1.tiny")]
    Tiny,
    /// `m1.small`
    #[default]
    #[serde(rename = "m1.small")]
    Small,
    /// `m1.medium`
    #[serde(rename = "m1.medium")]
    Medium,
    /// `m1.large`
    #[serde(rename = "m1.large")]
    Large,
    /// `m1.xlarge`
    #[serde(rename = "m1.xlarge")]
    XLarge,
}

impl Flavor {
    /// Name of the flavor as known to the compute service
    pub fn as_str(&self) -> &'static str {
        match self {
            Flavor::Tiny => "m1.tiny",
            Flavor::Small => "m1.small",
            Flavor::Medium => "m1.medium",
            Flavor::Large => "m1.large",
            Flavor::XLarge => "m1.xlarge",
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn flavor_for_memory(memory_mb: u64) -> Flavor {
    match memory_mb {
        0..=512 => Flavor::Tiny,
        513..=2048 => Flavor::Small,
        2049..=4096 => Flavor::Medium,
        4097..=8192 => Flavor::Large,
        _ => Flavor::XLarge,
    }
}

fn flavor_for_cpu(cpu: u64) -> Option<Flavor> {
    match cpu {
        0..=1 => None,
        2 => Some(Flavor::Medium),
        3..=4 => Some(Flavor::Large),
        _ => Some(Flavor::XLarge),
    }
}

/// Select a flavor from the CPU count and memory size (MB)
///
/// Memory picks a flavor first; a CPU count above one then overrides it,
/// even when that means a smaller flavor than memory alone would pick.
/// Missing facts, and facts equal to zero, leave the previous choice
/// alone, so with neither the result is [`Flavor::Small`].
///
/// # Example
///
/// ```
/// use ovaimport::{Flavor, select_flavor};
///
/// assert_eq!(select_flavor(None, Some(4096)), Flavor::Medium);
/// assert_eq!(select_flavor(Some(2), Some(16384)), Flavor::Medium);
/// assert_eq!(select_flavor(Some(1), None), Flavor::Small);
/// ```
pub fn select_flavor(cpu: Option<u64>, memory_mb: Option<u64>) -> Flavor {
    let mut flavor = Flavor::default();

    if let Some(memory_mb) = memory_mb.filter(|&m| m > 0) {
        flavor = flavor_for_memory(memory_mb);
    }

    if let Some(cpu) = cpu.filter(|&c| c > 0) {
        if let Some(forced) = flavor_for_cpu(cpu) {
            flavor = forced;
        }
    }

    flavor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_small() {
        assert_eq!(select_flavor(None, None), Flavor::Small);
    }

    #[test]
    fn test_memory_boundaries() {
        let cases = [
            (1, Flavor::Tiny),
            (512, Flavor::Tiny),
            (513, Flavor::Small),
            (2048, Flavor::Small),
            (2049, Flavor::Medium),
            (4096, Flavor::Medium),
            (4097, Flavor::Large),
            (8192, Flavor::Large),
            (8193, Flavor::XLarge),
            (16384, Flavor::XLarge),
            (65536, Flavor::XLarge),
        ];
        for (memory, expected) in cases {
            assert_eq!(select_flavor(None, Some(memory)), expected, "memory {}", memory);
        }
    }

    #[test]
    fn test_cpu_boundaries() {
        let cases = [
            (1, Flavor::Small),
            (2, Flavor::Medium),
            (3, Flavor::Large),
            (4, Flavor::Large),
            (5, Flavor::XLarge),
            (8, Flavor::XLarge),
            (64, Flavor::XLarge),
        ];
        for (cpu, expected) in cases {
            assert_eq!(select_flavor(Some(cpu), None), expected, "cpu {}", cpu);
        }
    }

    #[test]
    fn test_memory_only() {
        assert_eq!(select_flavor(None, Some(4096)), Flavor::Medium);
    }

    #[test]
    fn test_two_cpus_force_medium_with_medium_memory() {
        // Memory alone already gives medium; the CPU rule must too
        assert_eq!(select_flavor(None, Some(4096)), Flavor::Medium);
        assert_eq!(select_flavor(Some(2), None), Flavor::Medium);
        assert_eq!(select_flavor(Some(2), Some(4096)), Flavor::Medium);
    }

    #[test]
    fn test_cpu_overrides_memory() {
        assert_eq!(select_flavor(Some(8), Some(16384)), Flavor::XLarge);
        assert_eq!(select_flavor(Some(2), Some(16384)), Flavor::Medium);
        assert_eq!(select_flavor(Some(4), Some(256)), Flavor::Large);
    }

    #[test]
    fn test_single_cpu_keeps_memory_choice() {
        assert_eq!(select_flavor(Some(1), Some(256)), Flavor::Tiny);
        assert_eq!(select_flavor(Some(1), None), Flavor::Small);
    }

    #[test]
    fn test_zero_counts_as_missing() {
        assert_eq!(select_flavor(None, Some(0)), Flavor::Small);
        assert_eq!(select_flavor(Some(0), Some(256)), Flavor::Tiny);
    }

    #[test]
    fn test_names() {
        assert_eq!(Flavor::Tiny.to_string(), "m1.tiny");
        assert_eq!(Flavor::XLarge.as_str(), "m1.xlarge");
    }
}
