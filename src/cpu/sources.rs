//! OS data sources for CPU detection
//!
//! Every source is best-effort: a missing library, file or property reads
//! as an empty value, never as an error.

use std::collections::HashMap;
use std::ffi::{c_char, c_int, CStr, CString};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use tracing::{debug, trace};

/// Default sysfs directory holding `index{N}` cache descriptors
pub const DEFAULT_CACHE_SYSFS_ROOT: &str = "/sys/devices/system/cpu/cpu0/cache";

/// Auxiliary vector exposed by the kernel for the current process
pub const DEFAULT_AUXV_PATH: &str = "/proc/self/auxv";

/// Upper bound for single-line attribute reads
const MAX_LINE_BYTES: u64 = 256;

/// Upper bound for the auxiliary vector read
const MAX_AUXV_BYTES: u64 = 4096;

const AT_NULL: u64 = 0;
const AT_HWCAP: u64 = 16;

// ─────────────────────────────────────────────────────────────────
// Property Store
// ─────────────────────────────────────────────────────────────────

/// Key to string lookups against the OS property store
pub trait PropertyStore {
    /// Value for `key`, or an empty string when unset or unreadable
    fn get(&self, key: &str) -> String;
}

/// Signature of bionic's `__system_property_get`
type PropertyGetFn = unsafe extern "C" fn(*const c_char, *mut c_char) -> c_int;

const PROPERTY_GETTER: &[u8] = b"__system_property_get\0";

/// `PROP_VALUE_MAX` from `<sys/system_properties.h>`
const PROP_VALUE_MAX: usize = 92;

/// Android system properties, resolved from the platform libc at runtime.
///
/// On platforms without the property service the library or the symbol is
/// missing and every lookup returns an empty string.
pub struct SystemProperties {
    libc: Option<Library>,
}

impl SystemProperties {
    /// Name of the library exporting `__system_property_get`
    pub const LIBRARY: &'static str = "libc.so";

    /// Open the platform property store
    pub fn open() -> Self {
        // SAFETY: loading the C library runs no initialisers beyond the ones
        // already run for this process.
        let libc = match unsafe { Library::new(Self::LIBRARY) } {
            Ok(library) => Some(library),
            Err(e) => {
                debug!(library = Self::LIBRARY, error = %e, "System property store unavailable");
                None
            }
        };
        Self { libc }
    }

    /// Whether the property getter could be resolved
    pub fn is_available(&self) -> bool {
        self.libc
            .as_ref()
            .is_some_and(|lib| unsafe { lib.get::<PropertyGetFn>(PROPERTY_GETTER) }.is_ok())
    }
}

impl PropertyStore for SystemProperties {
    fn get(&self, key: &str) -> String {
        let Some(libc) = self.libc.as_ref() else {
            return String::new();
        };
        let Ok(c_key) = CString::new(key) else {
            return String::new();
        };

        // SAFETY: the symbol type matches the bionic declaration.
        let getter: Symbol<PropertyGetFn> = match unsafe { libc.get(PROPERTY_GETTER) } {
            Ok(getter) => getter,
            Err(_) => return String::new(),
        };

        let mut buffer: [c_char; PROP_VALUE_MAX] = [0; PROP_VALUE_MAX];
        // SAFETY: the buffer is PROP_VALUE_MAX bytes, the size the getter writes at most,
        // and the key is NUL-terminated.
        let len = unsafe { getter(c_key.as_ptr(), buffer.as_mut_ptr()) };
        if len <= 0 {
            return String::new();
        }

        // SAFETY: the getter always NUL-terminates within PROP_VALUE_MAX.
        let value = unsafe { CStr::from_ptr(buffer.as_ptr()) };
        value.to_string_lossy().trim().to_string()
    }
}

/// Fixed in-memory property store
#[derive(Debug, Clone, Default)]
pub struct StaticProperties {
    values: HashMap<String, String>,
}

impl StaticProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a property
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl PropertyStore for StaticProperties {
    fn get(&self, key: &str) -> String {
        self.values.get(key).cloned().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────
// Hardware Capabilities
// ─────────────────────────────────────────────────────────────────

/// Source of the `AT_HWCAP` hardware capability bitmask
pub trait HwcapSource {
    fn hwcap(&self) -> Option<u64>;
}

/// Reads `AT_HWCAP` from an auxiliary vector file (`/proc/self/auxv`)
#[derive(Debug, Clone)]
pub struct AuxvHwcap {
    path: PathBuf,
}

impl AuxvHwcap {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for AuxvHwcap {
    fn default() -> Self {
        Self::new(DEFAULT_AUXV_PATH)
    }
}

impl HwcapSource for AuxvHwcap {
    fn hwcap(&self) -> Option<u64> {
        let mut bytes = Vec::new();
        let read = File::open(&self.path)
            .and_then(|file| file.take(MAX_AUXV_BYTES).read_to_end(&mut bytes));
        if let Err(e) = read {
            debug!(path = %self.path.display(), error = %e, "Auxiliary vector unreadable");
            return None;
        }
        parse_auxv(&bytes, AT_HWCAP)
    }
}

/// Fixed bitmask, for tests and platforms without an auxiliary vector
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedHwcap(pub Option<u64>);

impl HwcapSource for FixedHwcap {
    fn hwcap(&self) -> Option<u64> {
        self.0
    }
}

/// Find `key` in a raw auxiliary vector of native-endian, native-word pairs.
pub fn parse_auxv(bytes: &[u8], key: u64) -> Option<u64> {
    const WORD: usize = std::mem::size_of::<usize>();

    let read_word = |chunk: &[u8]| -> u64 {
        let mut raw = [0u8; WORD];
        raw.copy_from_slice(chunk);
        usize::from_ne_bytes(raw) as u64
    };

    for entry in bytes.chunks_exact(WORD * 2) {
        let entry_key = read_word(&entry[..WORD]);
        if entry_key == AT_NULL {
            break;
        }
        if entry_key == key {
            return Some(read_word(&entry[WORD..]));
        }
    }
    None
}

// ─────────────────────────────────────────────────────────────────
// Cache Topology
// ─────────────────────────────────────────────────────────────────

/// Per-index cache attributes (`level`, `type`, `size`)
pub trait CacheTopology {
    /// Attribute value for a cache index, or an empty string
    fn attribute(&self, index: u32, name: &str) -> String;
}

/// Cache attributes read from sysfs `index{N}/{attribute}` files
#[derive(Debug, Clone)]
pub struct SysfsCacheTopology {
    root: PathBuf,
}

impl SysfsCacheTopology {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for SysfsCacheTopology {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SYSFS_ROOT)
    }
}

impl CacheTopology for SysfsCacheTopology {
    fn attribute(&self, index: u32, name: &str) -> String {
        let path = self.root.join(format!("index{}", index)).join(name);
        let value = read_first_line(&path);
        trace!(path = %path.display(), value = %value, "Read cache attribute");
        value
    }
}

/// First line of a small text file without its line terminator.
/// Missing or unreadable files read as an empty string.
pub fn read_first_line(path: &Path) -> String {
    let Ok(file) = File::open(path) else {
        return String::new();
    };

    let mut line = String::new();
    let mut reader = BufReader::new(file.take(MAX_LINE_BYTES));
    if reader.read_line(&mut line).is_err() {
        return String::new();
    }
    line.trim_end_matches(['\n', '\r']).to_string()
}
