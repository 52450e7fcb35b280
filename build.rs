//! Build script for hwprobe
//!
//! Embeds build-time information into the binary so probe reports can be
//! traced back to the exact build that produced them.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let git_hash = command_output("git", &["rev-parse", "--short=8", "HEAD"]);
    let git_branch = command_output("git", &["rev-parse", "--abbrev-ref", "HEAD"]);
    let git_dirty = is_git_dirty();

    let build_timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let target = env_or_unknown("TARGET");
    let profile = env_or_unknown("PROFILE");
    let host = env_or_unknown("HOST");
    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let rustc_version = command_output(&rustc, &["--version"]);
    let features = enabled_features();

    println!("cargo:rustc-env=HWPROBE_GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=HWPROBE_GIT_BRANCH={}", git_branch);
    println!("cargo:rustc-env=HWPROBE_GIT_DIRTY={}", git_dirty);
    println!("cargo:rustc-env=HWPROBE_BUILD_TIMESTAMP={}", build_timestamp);
    println!("cargo:rustc-env=HWPROBE_TARGET={}", target);
    println!("cargo:rustc-env=HWPROBE_PROFILE={}", profile);
    println!("cargo:rustc-env=HWPROBE_RUSTC_VERSION={}", rustc_version);
    println!("cargo:rustc-env=HWPROBE_HOST={}", host);
    println!("cargo:rustc-env=HWPROBE_FEATURES={}", features);
}

/// Run a command and return its trimmed stdout, or "unknown"
fn command_output(program: &str, args: &[&str]) -> String {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn env_or_unknown(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| "unknown".to_string())
}

/// Check if the git working directory is dirty
fn is_git_dirty() -> &'static str {
    Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .map(|output| {
            if output.status.success() && !output.stdout.is_empty() {
                "true"
            } else {
                "false"
            }
        })
        .unwrap_or("unknown")
}

/// Comma-separated list of enabled cargo features
fn enabled_features() -> String {
    let mut features: Vec<String> = env::vars()
        .filter_map(|(key, _)| key.strip_prefix("CARGO_FEATURE_").map(str::to_lowercase))
        .collect();
    features.sort();

    if features.is_empty() {
        "none".to_string()
    } else {
        features.join(",")
    }
}
