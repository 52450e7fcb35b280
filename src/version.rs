//! Build information embedded at compile time by `build.rs`

use std::fmt;

use serde::Serialize;

/// Build information embedded at compile time
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    /// Git commit hash (short)
    pub git_hash: &'static str,
    pub git_branch: &'static str,
    #[serde(skip)]
    git_dirty_str: &'static str,
    pub build_timestamp: &'static str,
    /// Target triple (e.g., aarch64-linux-android)
    pub target: &'static str,
    pub profile: &'static str,
    pub rustc_version: &'static str,
    pub host: &'static str,
    /// Comma separated cargo features, "none" when empty
    pub features: &'static str,
}

impl BuildInfo {
    pub const fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            git_hash: env!("HWPROBE_GIT_HASH"),
            git_branch: env!("HWPROBE_GIT_BRANCH"),
            git_dirty_str: env!("HWPROBE_GIT_DIRTY"),
            build_timestamp: env!("HWPROBE_BUILD_TIMESTAMP"),
            target: env!("HWPROBE_TARGET"),
            profile: env!("HWPROBE_PROFILE"),
            rustc_version: env!("HWPROBE_RUSTC_VERSION"),
            host: env!("HWPROBE_HOST"),
            features: env!("HWPROBE_FEATURES"),
        }
    }

    pub fn git_dirty(&self) -> bool {
        self.git_dirty_str == "true"
    }

    /// Full version string (e.g., "0.1.0-abc1234-dirty")
    pub fn full_version(&self) -> String {
        if self.git_dirty() {
            format!("{}-{}-dirty", self.version, self.git_hash)
        } else {
            format!("{}-{}", self.version, self.git_hash)
        }
    }

    /// Whether GPU probing was compiled in
    pub fn has_gpu_backend(&self) -> bool {
        self.features.split(',').any(|f| f == "vulkan")
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.name, self.full_version())?;
        writeln!(f)?;
        writeln!(f, "Build Information:")?;
        writeln!(f, "  Version:    {}", self.version)?;
        writeln!(f, "  Git Hash:   {}{}", self.git_hash, if self.git_dirty() { " (dirty)" } else { "" })?;
        writeln!(f, "  Git Branch: {}", self.git_branch)?;
        writeln!(f, "  Built:      {}", self.build_timestamp)?;
        writeln!(f, "  Profile:    {}", self.profile)?;
        writeln!(f, "  Features:   {}", self.features)?;
        writeln!(f)?;
        writeln!(f, "Target:")?;
        writeln!(f, "  Triple:     {}", self.target)?;
        writeln!(f, "  Host:       {}", self.host)?;
        writeln!(f)?;
        writeln!(f, "Compiler:")?;
        writeln!(f, "  {}", self.rustc_version)?;
        Ok(())
    }
}

pub fn build_info() -> BuildInfo {
    BuildInfo::current()
}
