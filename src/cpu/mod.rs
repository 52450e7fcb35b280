//! CPU detection
//!
//! Provides:
//! - SoC identification from the system property store
//! - Compile-time ABI of the running binary
//! - NEON/ASIMD detection from the `AT_HWCAP` bitmask
//! - Cache hierarchy from sysfs

mod sources;

pub use sources::*;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::CpuSettings;

/// Sentinel used when no identity source yields a value
pub const UNKNOWN_SOC: &str = "Unknown SoC";

/// Identity keys tried in order: SoC model, then board platform
pub const DEFAULT_SOC_KEYS: [&str; 2] = ["ro.soc.model", "ro.board.platform"];

/// Cache index slots inspected (`index0` through `index3`)
pub const CACHE_INDEX_SLOTS: u32 = 4;

/// `HWCAP_ASIMD` on aarch64
pub const HWCAP_ASIMD: u64 = 1 << 1;

/// `HWCAP_NEON` on 32-bit ARM
pub const HWCAP_NEON: u64 = 1 << 12;

// ─────────────────────────────────────────────────────────────────
// Report Types
// ─────────────────────────────────────────────────────────────────

/// Instruction-set target the running binary was compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Abi {
    #[serde(rename = "arm64-v8a")]
    Arm64,
    #[serde(rename = "armeabi-v7a")]
    Arm32,
    #[serde(rename = "x86_64")]
    X86_64,
    #[serde(rename = "x86")]
    X86,
}

impl Abi {
    /// ABI of this build. Targets outside the four known ABIs report `X86`.
    pub const fn current() -> Self {
        if cfg!(target_arch = "aarch64") {
            Abi::Arm64
        } else if cfg!(target_arch = "arm") {
            Abi::Arm32
        } else if cfg!(target_arch = "x86_64") {
            Abi::X86_64
        } else {
            Abi::X86
        }
    }

    /// Android ABI name
    pub fn name(&self) -> &'static str {
        match self {
            Abi::Arm64 => "arm64-v8a",
            Abi::Arm32 => "armeabi-v7a",
            Abi::X86_64 => "x86_64",
            Abi::X86 => "x86",
        }
    }

    pub fn is_arm(&self) -> bool {
        matches!(self, Abi::Arm64 | Abi::Arm32)
    }
}

impl std::fmt::Display for Abi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of cache as reported by sysfs `type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheType {
    Data,
    Instruction,
    Unified,
    /// Missing or unrecognised `type` attribute
    #[serde(rename = "")]
    Unknown,
}

impl CacheType {
    pub fn from_sysfs(value: &str) -> Self {
        match value.trim() {
            "Data" => CacheType::Data,
            "Instruction" => CacheType::Instruction,
            "Unified" => CacheType::Unified,
            _ => CacheType::Unknown,
        }
    }
}

/// One cache descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheLevel {
    pub level: String,
    #[serde(rename = "type")]
    pub cache_type: CacheType,
    /// Raw platform text, e.g. "32K"
    pub size: String,
}

/// CPU capability report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuReport {
    pub soc_name: String,
    pub abi: Abi,
    pub simd_support: bool,
    pub caches: Vec<CacheLevel>,
}

// ─────────────────────────────────────────────────────────────────
// Detection
// ─────────────────────────────────────────────────────────────────

/// CPU probe over a set of data sources
pub struct CpuProbe<P, H, C> {
    properties: P,
    hwcap: H,
    caches: C,
    soc_keys: Vec<String>,
}

impl CpuProbe<SystemProperties, AuxvHwcap, SysfsCacheTopology> {
    /// Probe backed by the live OS sources
    pub fn system() -> Self {
        Self::new(
            SystemProperties::open(),
            AuxvHwcap::default(),
            SysfsCacheTopology::default(),
        )
    }

    /// Live OS sources with configured key order and sysfs root
    pub fn from_settings(settings: &CpuSettings) -> Self {
        Self::new(
            SystemProperties::open(),
            AuxvHwcap::default(),
            SysfsCacheTopology::new(&settings.cache_sysfs_root),
        )
        .with_soc_keys(settings.soc_property_keys.clone())
    }
}

impl<P, H, C> CpuProbe<P, H, C>
where
    P: PropertyStore,
    H: HwcapSource,
    C: CacheTopology,
{
    pub fn new(properties: P, hwcap: H, caches: C) -> Self {
        Self {
            properties,
            hwcap,
            caches,
            soc_keys: DEFAULT_SOC_KEYS.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Replace the identity keys, highest priority first
    pub fn with_soc_keys(mut self, keys: Vec<String>) -> Self {
        self.soc_keys = keys;
        self
    }

    /// Assemble a report. Never fails; unreadable sources degrade to partial data.
    pub fn probe(&self) -> CpuReport {
        let abi = Abi::current();
        let report = CpuReport {
            soc_name: resolve_soc_name(&self.properties, &self.soc_keys),
            abi,
            simd_support: simd_supported(abi, self.hwcap.hwcap()),
            caches: read_caches(&self.caches),
        };

        info!(
            soc = %report.soc_name,
            abi = %report.abi,
            simd = report.simd_support,
            caches = report.caches.len(),
            "CPU probe complete"
        );
        report
    }
}

/// Detect the running CPU using the live OS sources
pub fn detect_cpu() -> CpuReport {
    CpuProbe::system().probe()
}

/// First non-empty value among `keys`, in order, else [`UNKNOWN_SOC`]
pub fn resolve_soc_name<P, K>(properties: &P, keys: &[K]) -> String
where
    P: PropertyStore + ?Sized,
    K: AsRef<str>,
{
    for key in keys {
        let value = properties.get(key.as_ref());
        if !value.is_empty() {
            debug!(key = key.as_ref(), value = %value, "Resolved SoC identity");
            return value;
        }
    }
    debug!("No SoC identity source available");
    UNKNOWN_SOC.to_string()
}

/// Test the SIMD capability bit for `abi`. Always false off ARM.
pub fn simd_supported(abi: Abi, hwcap: Option<u64>) -> bool {
    let Some(hwcap) = hwcap else {
        return false;
    };
    match abi {
        Abi::Arm64 => hwcap & HWCAP_ASIMD != 0,
        Abi::Arm32 => hwcap & HWCAP_NEON != 0,
        Abi::X86_64 | Abi::X86 => false,
    }
}

/// Cache descriptors for index slots `0..CACHE_INDEX_SLOTS`, in index order.
/// Slots without a size are skipped; later slots are still read.
pub fn read_caches<C: CacheTopology + ?Sized>(topology: &C) -> Vec<CacheLevel> {
    let mut caches = Vec::new();

    for index in 0..CACHE_INDEX_SLOTS {
        let size = topology.attribute(index, "size");
        if size.is_empty() {
            debug!(index, "Cache slot has no size, skipping");
            continue;
        }

        caches.push(CacheLevel {
            level: topology.attribute(index, "level"),
            cache_type: CacheType::from_sysfs(&topology.attribute(index, "type")),
            size,
        });
    }

    caches
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapTopology(HashMap<(u32, &'static str), &'static str>);

    impl MapTopology {
        fn slot(mut self, index: u32, level: &'static str, kind: &'static str, size: &'static str) -> Self {
            self.0.insert((index, "level"), level);
            self.0.insert((index, "type"), kind);
            self.0.insert((index, "size"), size);
            self
        }
    }

    impl CacheTopology for MapTopology {
        fn attribute(&self, index: u32, name: &str) -> String {
            self.0
                .iter()
                .find(|((i, n), _)| *i == index && *n == name)
                .map(|(_, v)| v.to_string())
                .unwrap_or_default()
        }
    }

    #[test]
    fn test_soc_primary_key_wins() {
        let props = StaticProperties::new()
            .with("ro.soc.model", "SM8650")
            .with("ro.board.platform", "pineapple");
        assert_eq!(resolve_soc_name(&props, &DEFAULT_SOC_KEYS), "SM8650");
    }

    #[test]
    fn test_soc_falls_back_in_order() {
        let props = StaticProperties::new()
            .with("ro.soc.model", "")
            .with("ro.board.platform", "kalama");
        assert_eq!(resolve_soc_name(&props, &DEFAULT_SOC_KEYS), "kalama");

        let keys = ["a", "b", "c"];
        let props = StaticProperties::new().with("c", "third").with("b", "second");
        assert_eq!(resolve_soc_name(&props, &keys), "second");
    }

    #[test]
    fn test_soc_unknown_sentinel() {
        let props = StaticProperties::new();
        assert_eq!(resolve_soc_name(&props, &DEFAULT_SOC_KEYS), UNKNOWN_SOC);

        let no_keys: [&str; 0] = [];
        assert_eq!(resolve_soc_name(&props, &no_keys), "Unknown SoC");
    }

    #[test]
    fn test_simd_false_off_arm() {
        for mask in [None, Some(0), Some(u64::MAX), Some(HWCAP_ASIMD | HWCAP_NEON)] {
            assert!(!simd_supported(Abi::X86_64, mask));
            assert!(!simd_supported(Abi::X86, mask));
        }
    }

    #[test]
    fn test_simd_uses_arch_specific_bit() {
        assert!(simd_supported(Abi::Arm64, Some(HWCAP_ASIMD)));
        assert!(!simd_supported(Abi::Arm64, Some(HWCAP_NEON)));
        assert!(simd_supported(Abi::Arm32, Some(HWCAP_NEON)));
        assert!(!simd_supported(Abi::Arm32, Some(HWCAP_ASIMD)));
        assert!(!simd_supported(Abi::Arm64, None));
    }

    #[test]
    fn test_caches_skip_missing_sizes_and_keep_order() {
        let topology = MapTopology::default()
            .slot(0, "1", "Data", "64K")
            .slot(2, "2", "Unified", "512K")
            .slot(3, "3", "Unified", "8192K");

        let caches = read_caches(&topology);
        let sizes: Vec<_> = caches.iter().map(|c| c.size.as_str()).collect();
        assert_eq!(sizes, ["64K", "512K", "8192K"]);
        assert_eq!(caches[1].level, "2");
        assert_eq!(caches[1].cache_type, CacheType::Unified);
    }

    #[test]
    fn test_cache_with_empty_size_is_dropped() {
        let topology = MapTopology::default()
            .slot(0, "1", "Instruction", "")
            .slot(1, "1", "Data", "32K");

        let caches = read_caches(&topology);
        assert_eq!(caches.len(), 1);
        assert_eq!(caches[0].cache_type, CacheType::Data);
    }

    #[test]
    fn test_cache_type_parsing() {
        assert_eq!(CacheType::from_sysfs("Instruction"), CacheType::Instruction);
        assert_eq!(CacheType::from_sysfs("Unified\n"), CacheType::Unified);
        assert_eq!(CacheType::from_sysfs(""), CacheType::Unknown);
        assert_eq!(CacheType::from_sysfs("Trace"), CacheType::Unknown);
    }

    #[test]
    fn test_report_serialization() {
        let report = CpuReport {
            soc_name: "SM8550".into(),
            abi: Abi::Arm64,
            simd_support: true,
            caches: vec![CacheLevel {
                level: "1".into(),
                cache_type: CacheType::Data,
                size: "64K".into(),
            }],
        };

        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(
            json,
            r#"{"socName":"SM8550","abi":"arm64-v8a","simdSupport":true,"caches":[{"level":"1","type":"Data","size":"64K"}]}"#
        );
    }

    #[test]
    fn test_unknown_cache_type_serializes_empty() {
        let level = CacheLevel {
            level: String::new(),
            cache_type: CacheType::Unknown,
            size: "1M".into(),
        };
        let value = serde_json::to_value(&level).unwrap();
        assert_eq!(value["type"], "");
    }

    #[test]
    fn test_probe_with_fixed_sources() {
        let probe = CpuProbe::new(
            StaticProperties::new().with("ro.board.platform", "taro"),
            FixedHwcap(Some(HWCAP_ASIMD | HWCAP_NEON)),
            MapTopology::default().slot(1, "1", "Data", "32K"),
        );

        let report = probe.probe();
        assert_eq!(report.soc_name, "taro");
        assert_eq!(report.abi, Abi::current());
        assert_eq!(report.simd_support, Abi::current().is_arm());
        assert_eq!(report.caches.len(), 1);
    }

    #[test]
    fn test_custom_soc_keys() {
        let probe = CpuProbe::new(
            StaticProperties::new().with("ro.hardware", "qcom"),
            FixedHwcap(None),
            MapTopology::default(),
        )
        .with_soc_keys(vec!["ro.hardware".into()]);

        assert_eq!(probe.probe().soc_name, "qcom");
    }

    #[test]
    fn test_detect_cpu_no_panic() {
        let report = detect_cpu();
        assert!(!report.soc_name.is_empty());
    }
}
