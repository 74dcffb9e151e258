//! Unified hardware discovery for hwtopo.
//!
//! Provides a single entry point that runs every device class against one
//! sysfs root and collects the results into a report.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::Options;
use crate::error::{HwError, HwResult};

use super::acs::{AcsProbe, LspciProbe};
use super::can::{CanDiscovery, CanInfo};
use super::serial::{SerialDiscovery, SerialInfo};
use super::tpm::{TpmDiscovery, TpmInfo};
use super::usb::{UsbDiscovery, UsbInfo};
use super::watchdog::{WatchdogDiscovery, WatchdogInfo};
use super::Enumeration;

/// Device class selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryFilter {
    Usb,
    Can,
    Serial,
    Tpm,
    Watchdog,
}

impl CategoryFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryFilter::Usb => "usb",
            CategoryFilter::Can => "can",
            CategoryFilter::Serial => "serial",
            CategoryFilter::Tpm => "tpm",
            CategoryFilter::Watchdog => "watchdog",
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryFilter {
    type Err = HwError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "usb" => Ok(CategoryFilter::Usb),
            "can" => Ok(CategoryFilter::Can),
            "serial" => Ok(CategoryFilter::Serial),
            "tpm" => Ok(CategoryFilter::Tpm),
            "watchdog" => Ok(CategoryFilter::Watchdog),
            other => Err(HwError::Parse(format!(
                "unknown device category '{}' (expected usb, can, serial, tpm or watchdog)",
                other
            ))),
        }
    }
}

/// Hardware discovery options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Scan USB devices (includes ACS lookups)
    pub scan_usb: bool,
    /// Scan CAN interfaces
    pub scan_can: bool,
    /// Scan legacy serial ports
    pub scan_serial: bool,
    /// Check for a TPM
    pub scan_tpm: bool,
    /// Scan watchdog timers
    pub scan_watchdog: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            scan_usb: true,
            scan_can: true,
            scan_serial: true,
            scan_tpm: true,
            scan_watchdog: true,
        }
    }
}

impl DiscoveryOptions {
    /// Options that scan only the listed classes. An empty list scans all.
    pub fn only(filters: &[CategoryFilter]) -> Self {
        if filters.is_empty() {
            return Self::default();
        }
        Self {
            scan_usb: filters.contains(&CategoryFilter::Usb),
            scan_can: filters.contains(&CategoryFilter::Can),
            scan_serial: filters.contains(&CategoryFilter::Serial),
            scan_tpm: filters.contains(&CategoryFilter::Tpm),
            scan_watchdog: filters.contains(&CategoryFilter::Watchdog),
        }
    }
}

/// Results of one discovery run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub usb: UsbInfo,
    pub can: CanInfo,
    pub serial: SerialInfo,
    pub tpm: TpmInfo,
    pub watchdog: WatchdogInfo,
    /// Problems met during the scan, fatal or not
    pub errors: Vec<String>,
    /// Wall time of the scan
    #[serde(skip)]
    pub duration: Duration,
}

impl DiscoveryReport {
    /// Get summary statistics
    pub fn summary(&self) -> DiscoverySummary {
        let usb_count = self.usb.devices.len();
        let can_count = self.can.devices.len();
        let serial_count = self.serial.devices.len();
        let tpm_count = usize::from(self.tpm.present);
        let watchdog_count = self.watchdog.devices.len();

        DiscoverySummary {
            usb_count,
            can_count,
            serial_count,
            tpm_count,
            watchdog_count,
            total_devices: usb_count + can_count + serial_count + tpm_count + watchdog_count,
            acs_enabled_count: self.usb.devices.iter().filter(|d| d.acs_enabled).count(),
            error_count: self.errors.len(),
            duration: self.duration,
        }
    }
}

/// Summary statistics for discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoverySummary {
    pub usb_count: usize,
    pub can_count: usize,
    pub serial_count: usize,
    /// 1 when a TPM is present
    pub tpm_count: usize,
    pub watchdog_count: usize,
    pub total_devices: usize,
    /// USB devices behind an ACS-enabled PCI function
    pub acs_enabled_count: usize,
    pub error_count: usize,
    #[serde(skip)]
    pub duration: Duration,
}

impl fmt::Display for DiscoverySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} devices (usb={} can={} serial={} tpm={} watchdog={}) in {:?}",
            self.total_devices,
            self.usb_count,
            self.can_count,
            self.serial_count,
            self.tpm_count,
            self.watchdog_count,
            self.duration
        )
    }
}

/// Main hardware discovery interface
pub struct HardwareDiscovery {
    settings: Options,
    usb_discovery: UsbDiscovery,
    options: DiscoveryOptions,
}

impl HardwareDiscovery {
    /// Create a discovery instance scanning every class
    pub fn new(settings: Options) -> Self {
        Self {
            usb_discovery: UsbDiscovery::new(settings.clone()),
            settings,
            options: DiscoveryOptions::default(),
        }
    }

    /// Create with custom options
    pub fn with_options(settings: Options, options: DiscoveryOptions) -> Self {
        let mut discovery = Self::new(settings);
        discovery.options = options;
        discovery
    }

    /// Scan all selected classes, querying ACS with the configured tool
    pub fn scan_all(&mut self) -> DiscoveryReport {
        let probe = LspciProbe::from_options(&self.settings);
        self.scan_all_with(&probe)
    }

    /// Scan all selected classes with a caller-supplied ACS probe.
    ///
    /// A class whose listing cannot be read is reported in
    /// [`DiscoveryReport::errors`] and the scan moves on.
    pub fn scan_all_with(&mut self, probe: &dyn AcsProbe) -> DiscoveryReport {
        let start = Instant::now();
        let mut report = DiscoveryReport::default();

        if self.options.scan_usb {
            let usb = self.usb_discovery.enumerate_with(probe);
            report.usb.devices = collect("usb", usb, &mut report.errors);
        }

        if self.options.scan_can {
            let can = CanDiscovery::new(&self.settings).enumerate();
            report.can.devices = collect("can", can, &mut report.errors);
        }

        if self.options.scan_serial {
            let serial = SerialDiscovery::new(&self.settings).enumerate();
            report.serial.devices = collect("serial", serial, &mut report.errors);
        }

        if self.options.scan_tpm {
            match TpmDiscovery::new(&self.settings).detect() {
                Ok(tpm) => report.tpm = tpm,
                Err(e) => {
                    log::warn!("tpm scan failed: {}", e);
                    report.errors.push(format!("tpm scan error: {}", e));
                }
            }
        }

        if self.options.scan_watchdog {
            let watchdog = WatchdogDiscovery::new(&self.settings).enumerate();
            report.watchdog.devices = collect("watchdog", watchdog, &mut report.errors);
        }

        report.duration = start.elapsed();
        log::debug!("discovery: {}", report.summary());
        report
    }
}

fn collect<T>(
    class: &str,
    result: HwResult<Enumeration<T>>,
    errors: &mut Vec<String>,
) -> Vec<T> {
    match result {
        Ok(found) => {
            errors.extend(found.errors.iter().map(|e| format!("{}: {}", class, e)));
            found.devices
        }
        Err(e) => {
            log::warn!("{} scan failed: {}", class, e);
            errors.push(format!("{} scan error: {}", class, e));
            Vec::new()
        }
    }
}
