//! SocketCAN interface discovery for hwtopo.
//!
//! CAN controllers show up as network interfaces whose `type` is
//! `ARPHRD_CAN` (280).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Options;
use crate::error::HwResult;
use crate::paths::SysfsPaths;

use super::address::BusParent;
use super::sysfs::read_attribute;
use super::{device_link_parent, list_class_dir, Enumeration, Presence};

/// `ARPHRD_CAN` from `<linux/if_arp.h>`
pub const ARPHRD_CAN: &str = "280";

/// CAN interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanDevice {
    /// Interface name (e.g. `can0`)
    pub name: String,
    /// Bus the controller is attached to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<BusParent>,
}

/// All CAN interfaces on the host
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanInfo {
    pub devices: Vec<CanDevice>,
}

impl fmt::Display for CanInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CAN ({} devices)", self.devices.len())
    }
}

/// CAN interface discovery
pub struct CanDiscovery {
    paths: SysfsPaths,
}

impl CanDiscovery {
    pub fn new(options: &Options) -> Self {
        Self {
            paths: SysfsPaths::new(options),
        }
    }

    /// Enumerate CAN interfaces. Hosts without `sys/class/net` have none.
    pub fn enumerate(&self) -> HwResult<Enumeration<CanDevice>> {
        let (entries, errors) =
            list_class_dir(&self.paths.sys_class_net, "can", Presence::Optional)?;

        let devices = entries
            .into_iter()
            .filter(|(_, path)| read_attribute(&path.join("type")) == ARPHRD_CAN)
            .map(|(name, path)| CanDevice {
                parent: device_link_parent(&path),
                name,
            })
            .collect();

        Ok(Enumeration { devices, errors })
    }
}
