//! Watchdog timer discovery for hwtopo.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Options;
use crate::error::HwResult;
use crate::paths::SysfsPaths;

use super::address::BusParent;
use super::sysfs::read_attribute;
use super::{device_link_parent, list_class_dir, Enumeration, Presence};

/// Watchdog timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogDevice {
    /// Class entry name (`watchdog0`)
    pub name: String,
    /// Device node (`/dev/watchdog0`)
    pub device_path: String,
    /// Driver identity string
    pub identity: String,
    /// Current timeout in seconds
    pub timeout: String,
    /// `active` / `inactive`
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<BusParent>,
}

/// All watchdog timers on the host
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchdogInfo {
    pub devices: Vec<WatchdogDevice>,
}

impl fmt::Display for WatchdogInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watchdog ({} devices)", self.devices.len())
    }
}

/// Watchdog discovery
pub struct WatchdogDiscovery {
    paths: SysfsPaths,
}

impl WatchdogDiscovery {
    pub fn new(options: &Options) -> Self {
        Self {
            paths: SysfsPaths::new(options),
        }
    }

    pub fn enumerate(&self) -> HwResult<Enumeration<WatchdogDevice>> {
        let (entries, errors) =
            list_class_dir(&self.paths.sys_class_watchdog, "watchdog", Presence::Optional)?;

        let devices = entries
            .into_iter()
            .filter(|(name, _)| name.starts_with("watchdog"))
            .map(|(name, dir)| WatchdogDevice {
                device_path: format!("/dev/{}", name),
                identity: read_attribute(&dir.join("identity")),
                timeout: read_attribute(&dir.join("timeout")),
                state: read_attribute(&dir.join("state")),
                parent: device_link_parent(&dir),
                name,
            })
            .collect();

        Ok(Enumeration { devices, errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    #[test]
    fn test_watchdog_attributes() {
        let root = TempDir::new().unwrap();
        let class = root.path().join("sys/class/watchdog");
        let wd = class.join("watchdog0");
        fs::create_dir_all(&wd).unwrap();
        fs::write(wd.join("identity"), "iTCO_wdt\n").unwrap();
        fs::write(wd.join("timeout"), "30\n").unwrap();
        fs::write(wd.join("state"), "inactive\n").unwrap();

        let lpc = root.path().join("sys/devices/pci0000:00/0000:00:1f.0/iTCO_wdt");
        fs::create_dir_all(&lpc).unwrap();
        symlink(&lpc, wd.join("device")).unwrap();

        let result = WatchdogDiscovery::new(&Options::default().with_root(root.path()))
            .enumerate()
            .unwrap();
        assert_eq!(result.devices.len(), 1);

        let dev = &result.devices[0];
        assert_eq!(dev.device_path, "/dev/watchdog0");
        assert_eq!(dev.identity, "iTCO_wdt");
        assert_eq!(dev.timeout, "30");
        assert_eq!(dev.state, "inactive");
        assert_eq!(
            dev.parent.as_ref().and_then(BusParent::pci).unwrap().to_string(),
            "0000:00:1f.0"
        );
    }

    #[test]
    fn test_no_watchdog_class() {
        let root = TempDir::new().unwrap();
        let result = WatchdogDiscovery::new(&Options::default().with_root(root.path()))
            .enumerate()
            .unwrap();
        assert!(result.devices.is_empty());
        assert!(result.errors.is_empty());
    }
}
