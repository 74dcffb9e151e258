//! Legacy serial port discovery for hwtopo.
//!
//! Looks at `ttyS*` entries in `sys/class/tty`. The kernel registers far
//! more `ttyS` nodes than there are UARTs; only entries with a `device`
//! link are backed by hardware.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::Options;
use crate::error::HwResult;
use crate::paths::SysfsPaths;

use super::address::BusParent;
use super::sysfs::read_attribute;
use super::{device_link_parent, list_class_dir, Enumeration, Presence};

/// `UPIO_PORT`: the UART is reached through x86 port I/O
const UPIO_PORT: &str = "0";

/// Width of a 16550 register window
const UART_IO_SPAN: u64 = 8;

/// Highest x86 I/O port
const IO_PORT_MAX: u64 = 0xffff;

/// Serial port information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialDevice {
    /// DOS-style name (`COM1`, `COM2`, ...) in port order
    pub name: String,
    /// Device node (`/dev/ttyS0`)
    pub address: String,
    /// I/O port range (`03f8-03ff`), empty for memory-mapped UARTs
    pub io: String,
    /// Interrupt line, `0` when unknown
    pub irq: String,
    /// Bus the UART is attached to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<BusParent>,
}

/// All serial ports on the host
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SerialInfo {
    pub devices: Vec<SerialDevice>,
}

impl fmt::Display for SerialInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "serial ({} devices)", self.devices.len())
    }
}

/// Serial port discovery
pub struct SerialDiscovery {
    paths: SysfsPaths,
}

impl SerialDiscovery {
    pub fn new(options: &Options) -> Self {
        Self {
            paths: SysfsPaths::new(options),
        }
    }

    /// Enumerate hardware-backed `ttyS*` ports, numbered in port order
    pub fn enumerate(&self) -> HwResult<Enumeration<SerialDevice>> {
        let (entries, errors) =
            list_class_dir(&self.paths.sys_class_tty, "serial", Presence::Optional)?;

        let mut ports: Vec<(u32, String, PathBuf)> = entries
            .into_iter()
            .filter_map(|(name, path)| {
                let index: u32 = name.strip_prefix("ttyS")?.parse().ok()?;
                Some((index, name, path))
            })
            .filter(|(_, _, path)| path.join("device").exists())
            .collect();
        ports.sort_by_key(|(index, _, _)| *index);

        let devices = ports
            .into_iter()
            .enumerate()
            .map(|(i, (_, name, path))| read_port(i + 1, &name, &path))
            .collect();

        Ok(Enumeration { devices, errors })
    }
}

fn read_port(com: usize, name: &str, dir: &Path) -> SerialDevice {
    let irq = read_attribute(&dir.join("irq"));
    SerialDevice {
        name: format!("COM{}", com),
        address: format!("/dev/{}", name),
        io: io_range(dir),
        irq: if irq.is_empty() { "0".to_string() } else { irq },
        parent: device_link_parent(dir),
    }
}

/// `ssss-eeee` port range for port-I/O UARTs, empty otherwise
fn io_range(dir: &Path) -> String {
    if read_attribute(&dir.join("io_type")) != UPIO_PORT {
        return String::new();
    }
    let port = read_attribute(&dir.join("port"));
    let digits = port.trim_start_matches("0x").trim_start_matches("0X");
    let start = match u64::from_str_radix(digits, 16) {
        Ok(start) if start > 0 => start,
        _ => return String::new(),
    };
    match start.checked_add(UART_IO_SPAN - 1) {
        Some(end) if end <= IO_PORT_MAX => format!("{:04x}-{:04x}", start, end),
        _ => {
            log::debug!("{:?}: port {} outside the I/O space", dir, port);
            String::new()
        }
    }
}
