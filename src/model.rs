use serde::{Deserialize, Serialize};

/// Raw per-instance-type entry from the snapshot's `instance_types` table.
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceSpec {
    pub emr: bool,
    pub cores: u32,
    pub ram_gb: f64,
}

/// One interruption-frequency bucket from the snapshot's `ranges` table.
///
/// `max` is the upper bound in percent; the last range's `max` means
/// "and above".
#[derive(Debug, Clone, Deserialize)]
pub struct InterruptRange {
    pub index: usize,
    pub label: String,
    #[serde(default)]
    pub dots: u32,
    pub max: u8,
}

/// Savings / interrupt-range entry from the `spot_advisor` table.
#[derive(Debug, Clone, Deserialize)]
pub struct AdvisorEntry {
    /// Savings against on-demand pricing, in percent.
    pub s: u8,
    /// Index into the `ranges` table.
    pub r: usize,
}

/// One instance type joined with its savings and interruption data for a
/// single (region, OS) pair. This is what filters and formatters operate on.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceRecord {
    pub instance_type: String,
    pub vcpus: u32,
    pub mem_gb: f64,
    pub emr: bool,
    pub savings: u8,
    pub inter_label: String,
    pub inter_max: u8,
}

impl InstanceRecord {
    pub fn is_metal(&self) -> bool {
        is_metal(&self.instance_type)
    }
}

/// Bare metal instances carry "metal" in the size part of the identifier,
/// e.g. "c7g.metal" or "i4i.metal-24xl".
pub fn is_metal(instance_type: &str) -> bool {
    instance_type
        .split_once('.')
        .map(|(_, size)| size.contains("metal"))
        .unwrap_or(false)
}

/// AWS region with the list of Operating Systems available in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionDetail {
    pub region: String,
    pub operating_systems: Vec<String>,
}

/// Description of an EC2 instance series or option letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceTypeClass {
    pub key: &'static str,
    pub label: &'static str,
    pub desc: &'static str,
}

/// Known EC2 instance series, keyed by the series token of the identifier.
pub const INSTANCE_SERIES: &[InstanceTypeClass] = &[
    InstanceTypeClass { key: "c", label: "C", desc: "Compute optimized" },
    InstanceTypeClass { key: "d", label: "D", desc: "Dense storage" },
    InstanceTypeClass { key: "f", label: "F", desc: "FPGA" },
    InstanceTypeClass { key: "g", label: "G", desc: "Graphics intensive" },
    InstanceTypeClass { key: "hpc", label: "Hpc", desc: "High performance computing" },
    InstanceTypeClass {
        key: "im",
        label: "Im",
        desc: "Storage optimized (1 to 4 ratio of vCPU to memory)",
    },
    InstanceTypeClass { key: "inf", label: "Inf", desc: "AWS Inferentia" },
    InstanceTypeClass {
        key: "is",
        label: "Is",
        desc: "Storage optimized (1 to 6 ratio of vCPU to memory)",
    },
    InstanceTypeClass { key: "i", label: "I", desc: "Storage optimized" },
    InstanceTypeClass { key: "mac", label: "Mac", desc: "macOS" },
    InstanceTypeClass { key: "m", label: "M", desc: "General purpose" },
    InstanceTypeClass { key: "p", label: "P", desc: "GPU accelerated" },
    InstanceTypeClass { key: "r", label: "R", desc: "Memory optimized" },
    InstanceTypeClass { key: "t", label: "T", desc: "Burstable performance" },
    InstanceTypeClass { key: "trn", label: "Trn", desc: "AWS Trainium" },
    InstanceTypeClass { key: "u", label: "U", desc: "High memory" },
    InstanceTypeClass { key: "vt", label: "VT", desc: "Video transcoding" },
    InstanceTypeClass { key: "x", label: "X", desc: "Memory intensive" },
];

/// Known EC2 instance option letters found between generation and size.
pub const INSTANCE_OPTIONS: &[InstanceTypeClass] = &[
    InstanceTypeClass { key: "a", label: "a", desc: "AMD processors" },
    InstanceTypeClass { key: "b", label: "b", desc: "Block storage optimization" },
    InstanceTypeClass { key: "d", label: "d", desc: "Instance store volumes" },
    InstanceTypeClass { key: "e", label: "e", desc: "Extra storage or memory" },
    InstanceTypeClass { key: "flex", label: "flex", desc: "Flex instance" },
    InstanceTypeClass { key: "g", label: "g", desc: "AWS Graviton processors" },
    InstanceTypeClass { key: "i", label: "i", desc: "Intel processors" },
    InstanceTypeClass { key: "n", label: "n", desc: "Network and EBS optimized" },
    InstanceTypeClass { key: "q", label: "q", desc: "Qualcomm inference accelerators" },
    InstanceTypeClass { key: "z", label: "z", desc: "High performance" },
];

pub fn is_valid_series(key: &str) -> bool {
    INSTANCE_SERIES.iter().any(|series| series.key == key)
}

pub fn is_valid_option(key: &str) -> bool {
    INSTANCE_OPTIONS.iter().any(|option| option.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_metal() {
        assert!(!is_metal("c7gn.2xlarge"));
        assert!(!is_metal("t3.nano"));
        assert!(is_metal("c7g.metal"));
        assert!(is_metal("i4i.metal-24xl"));
        assert!(is_metal("u-6tb1.metal"));
        // No size part at all.
        assert!(!is_metal("mac2"));
    }

    #[test]
    fn test_is_valid_series() {
        assert!(is_valid_series("c"));
        assert!(is_valid_series("hpc"));
        assert!(is_valid_series("trn"));
        assert!(!is_valid_series("zz"));
        assert!(!is_valid_series(""));
    }

    #[test]
    fn test_is_valid_option() {
        assert!(is_valid_option("flex"));
        assert!(is_valid_option("g"));
        assert!(!is_valid_option("x"));
        assert!(!is_valid_option(""));
    }
}
