//! Configuration system tests
//!
//! Tests configuration loading, validation, and environment overrides

mod common;

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use hwprobe::config::ProbeConfig;

/// Test fixture for configuration testing
struct ConfigFixture {
    _temp_dir: TempDir,
    config_path: PathBuf,
}

impl ConfigFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        Self {
            _temp_dir: temp_dir,
            config_path,
        }
    }

    fn write_config(&self, content: &str) {
        fs::write(&self.config_path, content).unwrap();
    }

    fn path(&self) -> &str {
        self.config_path.to_str().unwrap()
    }
}

fn hwprobe_cmd() -> Command {
    let mut cmd = Command::cargo_bin("hwprobe").unwrap();
    for key in ["HWPROBE_CONFIG", "HWPROBE_GPU_ENABLE", "HWPROBE_LOG_LEVEL", "HWPROBE_CACHE_ROOT"] {
        cmd.env_remove(key);
    }
    cmd
}

// ─────────────────────────────────────────────────────────────────
// Valid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_empty_config_is_valid() {
    let fixture = ConfigFixture::new();
    fixture.write_config("");

    hwprobe_cmd()
        .arg("config")
        .arg("validate")
        .arg("--config")
        .arg(fixture.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_valid_fixture() {
    hwprobe_cmd()
        .arg("config")
        .arg("validate")
        .arg("--config")
        .arg(common::valid_config_fixture())
        .assert()
        .success();
}

#[test]
fn test_valid_fixture_loads_values() {
    let path = common::valid_config_fixture();
    let content = fs::read_to_string(path).unwrap();
    let config: ProbeConfig = toml::from_str(&content).unwrap();

    assert_eq!(config.cpu.soc_property_keys.len(), 3);
    assert!(!config.gpu.enable);
    assert_eq!(config.gpu.application_name, "fixture-probe");
    assert_eq!(config.gpu.prefer_device_types, ["discrete", "integrated"]);
    assert!(config.output.pretty);
    assert_eq!(config.logging.max_files, 2);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_file_drives_probe() {
    let tree = common::FakeCacheTree::new(&[(0, "1", "Data", "32K"), (1, "2", "Unified", "1M")]);
    let fixture = ConfigFixture::new();
    fixture.write_config(&format!(
        r#"
[cpu]
cache_sysfs_root = "{}"

[gpu]
enable = false
"#,
        tree.path_str()
    ));

    let output = hwprobe_cmd()
        .arg("all")
        .arg("--config")
        .arg(fixture.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["cpu"]["caches"].as_array().unwrap().len(), 2);
    assert_eq!(report["gpu"]["error"], "GPU probing disabled");
}

// ─────────────────────────────────────────────────────────────────
// Invalid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_invalid_fixture() {
    hwprobe_cmd()
        .arg("config")
        .arg("validate")
        .arg("--config")
        .arg(common::invalid_config_fixture())
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("quantum"));
}

#[test]
fn test_invalid_toml_syntax() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[gpu\nenable = ");

    hwprobe_cmd()
        .arg("config")
        .arg("validate")
        .arg("--config")
        .arg(fixture.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("parse"));
}

#[test]
fn test_empty_soc_keys_rejected() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[cpu]\nsoc_property_keys = []\n");

    hwprobe_cmd()
        .arg("config")
        .arg("validate")
        .arg("--config")
        .arg(fixture.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("SoC property key"));
}

#[test]
fn test_invalid_log_level_rejected() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[logging]\nlevel = \"chatty\"\n");

    hwprobe_cmd()
        .arg("config")
        .arg("validate")
        .arg("--config")
        .arg(fixture.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid log level"));
}

// ─────────────────────────────────────────────────────────────────
// Environment Override Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_env_override_beats_file() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[gpu]\nenable = true\n");

    hwprobe_cmd()
        .arg("gpu")
        .arg("--config")
        .arg(fixture.path())
        .env("HWPROBE_GPU_ENABLE", "false")
        .assert()
        .success()
        .stdout("{\"supported\":false,\"error\":\"GPU probing disabled\"}\n");
}

#[test]
fn test_env_log_level_validated() {
    let fixture = ConfigFixture::new();
    fixture.write_config("");

    hwprobe_cmd()
        .arg("config")
        .arg("validate")
        .arg("--config")
        .arg(fixture.path())
        .env("HWPROBE_LOG_LEVEL", "shouty")
        .assert()
        .failure();
}

#[test]
fn test_config_path_from_env() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[output]\npretty = true\n");

    hwprobe_cmd()
        .arg("config")
        .arg("show")
        .env("HWPROBE_CONFIG", fixture.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("pretty = true"));
}

// ─────────────────────────────────────────────────────────────────
// Init Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_init_writes_valid_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hwprobe").join("config.toml");

    hwprobe_cmd()
        .arg("config")
        .arg("init")
        .arg("--path")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration written"));

    assert!(path.exists());

    hwprobe_cmd()
        .arg("config")
        .arg("validate")
        .arg("--config")
        .arg(&path)
        .assert()
        .success();
}

#[test]
fn test_init_refuses_overwrite_without_force() {
    let fixture = ConfigFixture::new();
    fixture.write_config("# existing\n");

    hwprobe_cmd()
        .arg("config")
        .arg("init")
        .arg("--path")
        .arg(fixture.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    hwprobe_cmd()
        .arg("config")
        .arg("init")
        .arg("--path")
        .arg(fixture.path())
        .arg("--force")
        .assert()
        .success();

    let written = fs::read_to_string(fixture.path()).unwrap();
    assert!(written.contains("[cpu]"));
}
