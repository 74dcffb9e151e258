//! PCIe Access Control Services (ACS) lookup.
//!
//! The ACS capability is read from the output of an external diagnostic tool
//! (`lspci -vv -s <address>` by default). Spawning that tool is by far the
//! most expensive step of a scan, so results are memoized per PCI address for
//! the lifetime of one enumeration call.
//!
//! A failed lookup (tool missing, non-zero exit, timeout) is recorded as
//! `false`, the same as a confirmed "no ACS". The two cases are not
//! distinguished.

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::Options;

use super::address::PciAddress;

/// Substring that marks the capability in the tool output
pub const ACS_MARKER: &str = "Access Control Services";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Source of ACS answers for a single PCI address
pub trait AcsProbe: Sync {
    /// Return `true` when ACS is reported enabled for `address`
    /// (canonical `dddd:bb:dd.f`). Failures must map to `false`.
    fn query(&self, address: &str) -> bool;
}

/// Probe backed by an external diagnostic tool
#[derive(Debug, Clone)]
pub struct LspciProbe {
    tool: String,
    timeout: Duration,
}

impl LspciProbe {
    /// Create a probe running `tool` with a per-query timeout
    pub fn new<S: Into<String>>(tool: S, timeout: Duration) -> Self {
        Self {
            tool: tool.into(),
            timeout,
        }
    }

    /// Create a probe from discovery options
    pub fn from_options(options: &Options) -> Self {
        Self::new(options.acs_tool.clone(), options.acs_timeout())
    }

    fn locate(&self) -> Option<PathBuf> {
        match which::which(&self.tool) {
            Ok(path) => Some(path),
            Err(e) => {
                log::debug!("{} not available: {}", self.tool, e);
                None
            }
        }
    }

    fn run(&self, address: &str) -> Option<String> {
        let path = self.locate()?;
        let mut child = match Command::new(&path)
            .args(["-vv", "-s", address])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                log::warn!("failed to spawn {}: {}", path.display(), e);
                return None;
            }
        };

        // Drain stdout on a helper thread so a chatty tool cannot fill the
        // pipe and stall while we poll for exit.
        let reader = child.stdout.take().map(|mut stdout| {
            thread::spawn(move || {
                let mut out = String::new();
                let _ = stdout.read_to_string(&mut out);
                out
            })
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    log::warn!(
                        "{} -vv -s {} timed out after {:?}",
                        self.tool,
                        address,
                        self.timeout
                    );
                    let _ = child.kill();
                    let _ = child.wait();
                    return None;
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    log::warn!("failed to wait for {}: {}", self.tool, e);
                    let _ = child.kill();
                    let _ = child.wait();
                    return None;
                }
            }
        };

        let output = reader.and_then(|handle| handle.join().ok())?;
        if !status.success() {
            log::debug!("{} -vv -s {} exited with {}", self.tool, address, status);
            return None;
        }
        Some(output)
    }
}

impl AcsProbe for LspciProbe {
    fn query(&self, address: &str) -> bool {
        self.run(address)
            .map(|out| reports_acs(&out))
            .unwrap_or(false)
    }
}

/// Whether diagnostic tool output mentions the ACS capability
pub fn reports_acs(output: &str) -> bool {
    output.contains(ACS_MARKER)
}

/// Per-enumeration memo of ACS results, keyed by canonical PCI address
#[derive(Debug, Default, Clone)]
pub struct AcsCache {
    entries: HashMap<String, bool>,
}

impl AcsCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `address`, asking `probe` only on the first request
    pub fn is_enabled(&mut self, address: &PciAddress, probe: &dyn AcsProbe) -> bool {
        let key = address.canonical();
        if let Some(&enabled) = self.entries.get(&key) {
            log::debug!("acs cache hit for {}: {}", key, enabled);
            return enabled;
        }

        let enabled = probe.query(&key);
        log::debug!("acs probe for {}: {}", key, enabled);
        self.entries.insert(key, enabled);
        enabled
    }

    /// Cached result for `address`, without probing
    pub fn get(&self, address: &PciAddress) -> Option<bool> {
        self.entries.get(&address.canonical()).copied()
    }

    /// Number of addresses probed so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been probed yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// [`AcsCache`] shared between worker threads.
///
/// The lock is held across the probe so two workers asking for the same
/// address never both spawn the tool.
#[derive(Debug, Default)]
pub struct SharedAcsCache {
    inner: Mutex<AcsCache>,
}

impl SharedAcsCache {
    /// Create an empty shared cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Thread-safe [`AcsCache::is_enabled`]
    pub fn is_enabled(&self, address: &PciAddress, probe: &dyn AcsProbe) -> bool {
        self.inner.lock().is_enabled(address, probe)
    }

    /// Unwrap the underlying cache
    pub fn into_inner(self) -> AcsCache {
        self.inner.into_inner()
    }
}
