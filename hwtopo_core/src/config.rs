//! hwtopo runtime configuration
//!
//! Options are layered: built-in defaults, then an optional YAML file, then
//! `HWTOPO_*` environment variables, then whatever the caller sets last.
//!
//! # Example hwtopo.yaml
//!
//! ```yaml
//! # Alternate filesystem root (a captured sysfs snapshot, a container rootfs)
//! root: /srv/snapshots/host-a
//!
//! # Diagnostic tool used for the PCIe ACS query
//! acs_tool: lspci
//! acs_timeout_ms: 2000
//!
//! # Resolve USB devices on this many worker threads
//! workers: 4
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{HwError, HwResult};

/// Environment variable overriding [`Options::root`]
pub const ENV_ROOT: &str = "HWTOPO_ROOT";
/// Environment variable overriding [`Options::acs_tool`]
pub const ENV_ACS_TOOL: &str = "HWTOPO_ACS_TOOL";
/// Environment variable overriding [`Options::acs_timeout_ms`]
pub const ENV_ACS_TIMEOUT_MS: &str = "HWTOPO_ACS_TIMEOUT_MS";
/// Environment variable overriding [`Options::workers`]
pub const ENV_WORKERS: &str = "HWTOPO_WORKERS";

/// Default diagnostic tool for the ACS query
pub const DEFAULT_ACS_TOOL: &str = "lspci";
/// Default bound on a single ACS query
pub const DEFAULT_ACS_TIMEOUT_MS: u64 = 5000;

/// Discovery options shared by every device class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Filesystem root that `sys/...` paths are resolved against
    pub root: PathBuf,

    /// Name or path of the diagnostic tool invoked for ACS queries
    pub acs_tool: String,

    /// Upper bound for one ACS query, in milliseconds
    pub acs_timeout_ms: u64,

    /// Number of threads used to resolve USB devices (1 = sequential)
    pub workers: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
            acs_tool: DEFAULT_ACS_TOOL.to_string(),
            acs_timeout_ms: DEFAULT_ACS_TIMEOUT_MS,
            workers: 1,
        }
    }
}

impl Options {
    /// Defaults with the environment applied on top
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// Load options from a YAML string
    pub fn from_yaml(content: &str) -> HwResult<Self> {
        let options: Options = serde_yaml::from_str(content)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a YAML file
    pub fn from_file(path: &Path) -> HwResult<Self> {
        log::debug!("loading config from {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Apply `HWTOPO_*` environment variables over these options.
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn merge_env(self) -> Self {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    fn merge_vars<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(ENV_ROOT).filter(|v| !v.is_empty()) {
            self.root = PathBuf::from(root);
        }
        if let Some(tool) = lookup(ENV_ACS_TOOL).filter(|v| !v.is_empty()) {
            self.acs_tool = tool;
        }
        if let Some(raw) = lookup(ENV_ACS_TIMEOUT_MS) {
            match raw.trim().parse() {
                Ok(ms) => self.acs_timeout_ms = ms,
                Err(e) => log::warn!("ignoring {}={:?}: {}", ENV_ACS_TIMEOUT_MS, raw, e),
            }
        }
        if let Some(raw) = lookup(ENV_WORKERS) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => self.workers = n,
                Ok(_) => log::warn!("ignoring {}=0", ENV_WORKERS),
                Err(e) => log::warn!("ignoring {}={:?}: {}", ENV_WORKERS, raw, e),
            }
        }
        self
    }

    /// Set the filesystem root
    pub fn with_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.root = root.into();
        self
    }

    /// Set the ACS diagnostic tool
    pub fn with_acs_tool<S: Into<String>>(mut self, tool: S) -> Self {
        self.acs_tool = tool.into();
        self
    }

    /// Set the worker count (clamped to at least one)
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// ACS query timeout as a [`Duration`]
    pub fn acs_timeout(&self) -> Duration {
        Duration::from_millis(self.acs_timeout_ms)
    }

    /// Reject values that cannot drive a scan
    pub fn validate(&self) -> HwResult<()> {
        if self.acs_tool.trim().is_empty() {
            return Err(HwError::config("acs_tool must not be empty"));
        }
        if self.workers == 0 {
            return Err(HwError::config("workers must be at least 1"));
        }
        Ok(())
    }
}
