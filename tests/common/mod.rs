//! Common test utilities and fixtures

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Get the path to the test fixtures directory
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Get a path to a specific fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

pub fn valid_config_fixture() -> PathBuf {
    fixture_path("valid_config.toml")
}

pub fn invalid_config_fixture() -> PathBuf {
    fixture_path("invalid_config.toml")
}

/// One `indexN` directory: (index, level, type, size)
pub type CacheEntry<'a> = (u32, &'a str, &'a str, &'a str);

/// Fake `/sys/devices/system/cpu/cpu0/cache` tree in a temp directory
pub struct FakeCacheTree {
    dir: TempDir,
}

impl FakeCacheTree {
    pub fn new(entries: &[CacheEntry<'_>]) -> Self {
        let dir = TempDir::new().unwrap();
        for &(index, level, cache_type, size) in entries {
            let slot = dir.path().join(format!("index{}", index));
            fs::create_dir_all(&slot).unwrap();
            write_attr(&slot, "level", level);
            write_attr(&slot, "type", cache_type);
            write_attr(&slot, "size", size);
        }
        Self { dir }
    }

    /// Typical big.LITTLE cluster: L1d, L1i, L2, L3
    pub fn typical() -> Self {
        Self::new(&[
            (0, "1", "Data", "64K"),
            (1, "1", "Instruction", "64K"),
            (2, "2", "Unified", "512K"),
            (3, "3", "Unified", "2048K"),
        ])
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn path_str(&self) -> &str {
        self.dir.path().to_str().unwrap()
    }
}

/// Write a sysfs-style attribute with its trailing newline
pub fn write_attr(dir: &Path, name: &str, value: &str) {
    if !value.is_empty() {
        fs::write(dir.join(name), format!("{}\n", value)).unwrap();
    }
}
