//! Common sysfs path layout.
//!
//! Centralizes every `sys/...` path so discovery code never hard-codes `/sys`
//! and always honours [`Options::root`].

use std::path::{Path, PathBuf};

use crate::config::Options;

/// Resolved sysfs locations under a filesystem root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysfsPaths {
    /// `<root>/sys/bus/usb/devices`
    pub sys_bus_usb_devices: PathBuf,
    /// `<root>/sys/class/net`
    pub sys_class_net: PathBuf,
    /// `<root>/sys/class/tty`
    pub sys_class_tty: PathBuf,
    /// `<root>/sys/class/tpm`
    pub sys_class_tpm: PathBuf,
    /// `<root>/sys/class/watchdog`
    pub sys_class_watchdog: PathBuf,
}

impl SysfsPaths {
    /// Build the layout for the configured root
    pub fn new(options: &Options) -> Self {
        Self::under(&options.root)
    }

    /// Build the layout below an arbitrary root
    pub fn under(root: &Path) -> Self {
        let sys = root.join("sys");
        log::debug!("sysfs root: {:?}", sys);
        Self {
            sys_bus_usb_devices: sys.join("bus").join("usb").join("devices"),
            sys_class_net: sys.join("class").join("net"),
            sys_class_tty: sys.join("class").join("tty"),
            sys_class_tpm: sys.join("class").join("tpm"),
            sys_class_watchdog: sys.join("class").join("watchdog"),
        }
    }
}
