//! CLI integration tests
//!
//! Tests the command-line interface using assert_cmd

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

use common::FakeCacheTree;

/// Get a command for the hwprobe binary, isolated from ambient HWPROBE_* settings
fn hwprobe_cmd() -> Command {
    let mut cmd = Command::cargo_bin("hwprobe").unwrap();
    for key in [
        "HWPROBE_CONFIG",
        "HWPROBE_SOC_KEYS",
        "HWPROBE_CACHE_ROOT",
        "HWPROBE_GPU_ENABLE",
        "HWPROBE_GPU_PREFER",
        "HWPROBE_PRETTY",
        "HWPROBE_LOG_LEVEL",
        "HWPROBE_LOG_FILE",
        "HWPROBE_LOG_JSON",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("stdout should be a single JSON document")
}

// ─────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    hwprobe_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("cpu"))
        .stdout(predicate::str::contains("gpu"))
        .stdout(predicate::str::contains("all"))
        .stdout(predicate::str::contains("version"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_command() {
    hwprobe_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("hwprobe"))
        .stdout(predicate::str::contains("Build Information"))
        .stdout(predicate::str::contains("Features"))
        .stdout(predicate::str::contains("Target"));
}

#[test]
fn test_short_version_flag() {
    hwprobe_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("hwprobe"));
}

#[test]
fn test_invalid_command() {
    hwprobe_cmd()
        .arg("nonexistent-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

// ─────────────────────────────────────────────────────────────────
// Probe Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_gpu_disabled_exact_output() {
    hwprobe_cmd()
        .arg("gpu")
        .env("HWPROBE_GPU_ENABLE", "false")
        .assert()
        .success()
        .stdout("{\"supported\":false,\"error\":\"GPU probing disabled\"}\n");
}

#[test]
fn test_gpu_probe_always_succeeds() {
    let report = stdout_json(hwprobe_cmd().arg("gpu"));
    assert!(report["supported"].is_boolean());
}

#[test]
fn test_cpu_report_from_fake_sysfs() {
    let tree = FakeCacheTree::typical();
    let report = stdout_json(
        hwprobe_cmd()
            .arg("cpu")
            .env("HWPROBE_CACHE_ROOT", tree.path_str())
            .env("HWPROBE_SOC_KEYS", "hwprobe.test.missing"),
    );

    assert_eq!(report["socName"], "Unknown SoC");
    assert!(report["abi"].is_string());
    assert!(report["simdSupport"].is_boolean());

    let caches = report["caches"].as_array().unwrap();
    assert_eq!(caches.len(), 4);
    assert_eq!(caches[0]["level"], "1");
    assert_eq!(caches[0]["type"], "Data");
    assert_eq!(caches[0]["size"], "64K");
    assert_eq!(caches[3]["size"], "2048K");
}

#[test]
fn test_cpu_pretty_output() {
    let tree = FakeCacheTree::typical();
    hwprobe_cmd()
        .arg("cpu")
        .arg("--pretty")
        .env("HWPROBE_CACHE_ROOT", tree.path_str())
        .assert()
        .success()
        .stdout(predicate::str::contains("\n  \"socName\": "));
}

#[test]
fn test_all_combines_reports() {
    let tree = FakeCacheTree::new(&[(0, "1", "Data", "32K")]);
    let report = stdout_json(
        hwprobe_cmd()
            .arg("all")
            .env("HWPROBE_CACHE_ROOT", tree.path_str())
            .env("HWPROBE_GPU_ENABLE", "0"),
    );

    assert_eq!(report["cpu"]["caches"].as_array().unwrap().len(), 1);
    assert_eq!(report["gpu"]["supported"], false);
    assert_eq!(report["gpu"]["error"], "GPU probing disabled");
}

#[test]
fn test_logs_stay_off_stdout() {
    let tree = FakeCacheTree::typical();
    let output = hwprobe_cmd()
        .arg("-vvv")
        .arg("all")
        .env("HWPROBE_CACHE_ROOT", tree.path_str())
        .env("HWPROBE_GPU_ENABLE", "false")
        .assert()
        .success()
        .get_output()
        .clone();

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 1);
    assert!(serde_json::from_str::<Value>(&stdout).is_ok());
    assert!(!output.stderr.is_empty());
}

// ─────────────────────────────────────────────────────────────────
// Config Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_default() {
    let workdir = TempDir::new().unwrap();
    hwprobe_cmd()
        .current_dir(workdir.path())
        .arg("config")
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("[cpu]"))
        .stdout(predicate::str::contains("[gpu]"))
        .stdout(predicate::str::contains("[output]"))
        .stdout(predicate::str::contains("[logging]"));
}

#[test]
fn test_config_validate_nonexistent_file() {
    hwprobe_cmd()
        .arg("config")
        .arg("validate")
        .arg("--config")
        .arg("/nonexistent/path/config.toml")
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_probe_with_missing_config_fails() {
    hwprobe_cmd()
        .arg("cpu")
        .env("HWPROBE_CONFIG", "/nonexistent/path/config.toml")
        .assert()
        .failure()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_config_init_help() {
    hwprobe_cmd()
        .arg("config")
        .arg("init")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialize"))
        .stdout(predicate::str::contains("--path"))
        .stdout(predicate::str::contains("--force"));
}
