//! Configuration system for hwprobe
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (HWPROBE_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cpu::{DEFAULT_CACHE_SYSFS_ROOT, DEFAULT_SOC_KEYS};
use crate::error::{Error, Result};
use crate::gpu::DeviceSelection;

/// Main probe configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// CPU probe sources
    pub cpu: CpuSettings,

    /// GPU probe settings
    pub gpu: GpuSettings,

    /// Report output settings
    pub output: OutputSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// CPU probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuSettings {
    /// Property keys tried in order for the SoC name
    pub soc_property_keys: Vec<String>,

    /// Directory holding the `index{N}` cache descriptors
    pub cache_sysfs_root: String,
}

/// GPU probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuSettings {
    /// Probe the GPU at all
    pub enable: bool,

    /// Application name passed to the driver
    pub application_name: String,

    /// Device types to prefer, highest first (empty = first enumerated device)
    pub prefer_device_types: Vec<String>,
}

/// Report output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Pretty-print report JSON
    pub pretty: bool,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (unset = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// File rotation: never, hourly, daily
    pub rotation: String,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

impl Default for CpuSettings {
    fn default() -> Self {
        Self {
            soc_property_keys: DEFAULT_SOC_KEYS.iter().map(|k| k.to_string()).collect(),
            cache_sysfs_root: DEFAULT_CACHE_SYSFS_ROOT.to_string(),
        }
    }
}

impl Default for GpuSettings {
    fn default() -> Self {
        Self {
            enable: true,
            application_name: "hwprobe".to_string(),
            prefer_device_types: vec![],
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
            rotation: "daily".to_string(),
            max_files: 5,
            json_format: false,
        }
    }
}

impl GpuSettings {
    /// Device selection policy described by `prefer_device_types`
    pub fn selection(&self) -> Result<DeviceSelection> {
        DeviceSelection::from_names(&self.prefer_device_types)
    }
}

impl ProbeConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path).map_err(|e| Error::IoRead {
                path: path.clone(),
                source: e,
            })?;
            config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
                message: format!("{}: {}", path.display(), e.message()),
                source: Some(e),
            })?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        config.apply_env_overrides();
        config.expand_paths();
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            return if path.exists() {
                Ok(Some(path))
            } else {
                Err(Error::config_not_found(path))
            };
        }

        let search_paths = [
            Some(PathBuf::from("hwprobe.toml")),
            dirs::config_dir().map(|p| p.join("hwprobe").join("config.toml")),
            dirs::home_dir().map(|p| p.join(".hwprobe").join("config.toml")),
        ];

        for path in search_paths.into_iter().flatten() {
            if path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // CPU settings
        if let Ok(val) = std::env::var("HWPROBE_SOC_KEYS") {
            self.cpu.soc_property_keys = split_list(&val);
        }
        if let Ok(val) = std::env::var("HWPROBE_CACHE_ROOT") {
            self.cpu.cache_sysfs_root = val;
        }

        // GPU settings
        if let Ok(val) = std::env::var("HWPROBE_GPU_ENABLE") {
            self.gpu.enable = parse_bool(&val);
        }
        if let Ok(val) = std::env::var("HWPROBE_GPU_PREFER") {
            self.gpu.prefer_device_types = split_list(&val);
        }

        // Output settings
        if let Ok(val) = std::env::var("HWPROBE_PRETTY") {
            self.output.pretty = parse_bool(&val);
        }

        // Logging settings
        if let Ok(val) = std::env::var("HWPROBE_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("HWPROBE_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("HWPROBE_LOG_JSON") {
            self.logging.json_format = parse_bool(&val);
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        self.cpu.cache_sysfs_root = expand_path(&self.cpu.cache_sysfs_root);

        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.cpu.soc_property_keys.iter().all(|k| k.trim().is_empty()) {
            return Err(Error::config_field_invalid(
                "cpu.soc_property_keys",
                "At least one SoC property key is required",
            ));
        }

        if self.cpu.cache_sysfs_root.is_empty() {
            return Err(Error::config_field_invalid(
                "cpu.cache_sysfs_root",
                "Cache sysfs root cannot be empty",
            ));
        }

        self.gpu.selection()?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        let valid_rotations = ["never", "hourly", "daily"];
        if !valid_rotations.contains(&self.logging.rotation.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.rotation",
                format!(
                    "Invalid rotation '{}'. Must be one of: {}",
                    self.logging.rotation,
                    valid_rotations.join(", ")
                ),
            ));
        }

        Ok(())
    }
}

fn parse_bool(val: &str) -> bool {
    val.eq_ignore_ascii_case("true") || val == "1"
}

/// Split a comma separated list, dropping empty entries
fn split_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Default location written by `config init`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join("hwprobe"))
        .or_else(|| dirs::home_dir().map(|p| p.join(".hwprobe")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.toml")
}

/// Initialize a new configuration file, returning where it was written
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(default_config_path);

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    Ok(config_path)
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# hwprobe configuration

[cpu]
# Property keys tried in order for the SoC name; the first non-empty value wins
soc_property_keys = ["ro.soc.model", "ro.board.platform"]

# Directory holding the index0..index3 cache descriptors
cache_sysfs_root = "/sys/devices/system/cpu/cpu0/cache"

[gpu]
# Set to false to skip GPU probing entirely
enable = true

# Application name passed to the graphics driver
application_name = "hwprobe"

# Preferred device types, highest first: integrated, discrete, virtual, cpu, other
# Empty means the first device the driver enumerates
prefer_device_types = []

[output]
# Pretty-print report JSON
pretty = false

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log file path (uncomment to enable file logging)
# file = "~/.hwprobe/logs/hwprobe.log"

# File rotation: never, hourly, daily
rotation = "daily"

# Number of rotated log files to keep
max_files = 5

# JSON formatted logs
json_format = false
"#
    .to_string()
}
