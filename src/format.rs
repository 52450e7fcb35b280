//! Shared formatting helpers for probe reports
//!
//! Packed driver version decoding and JSON rendering.

use std::fmt;

use serde::Serialize;

use crate::error::Result;

/// A `major.minor.patch` triple decoded from a packed 32-bit version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    /// Decode a packed version using the 10/10/12-bit split
    /// (`major << 22 | minor << 12 | patch`).
    ///
    /// Known limitation: driver versions are vendor-encoded. NVIDIA packs
    /// 10/8/8/6 bits and Intel's Windows drivers use 18/14, so for those
    /// vendors the decoded driver version does not match the marketing
    /// version. The same split is applied to every vendor regardless.
    pub const fn from_packed(packed: u32) -> Self {
        Self {
            major: packed >> 22,
            minor: (packed >> 12) & 0x3ff,
            patch: packed & 0xfff,
        }
    }

    /// Inverse of [`Version::from_packed`]; components are masked to their field widths.
    pub const fn to_packed(self) -> u32 {
        ((self.major & 0x3ff) << 22) | ((self.minor & 0x3ff) << 12) | (self.patch & 0xfff)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Decode a packed version straight to its display form
pub fn decode_version(packed: u32) -> String {
    Version::from_packed(packed).to_string()
}

/// Render a report as JSON, compact or pretty-printed
pub fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(rendered)
}

/// Human-readable byte size (binary units), used for log lines
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
