//! # hwtopo Hardware Discovery
//!
//! Reads the kernel device model exposed under `sys/` and assembles device
//! lists with their parent bus resolved.
//!
//! - **Addresses**: PCI `dddd:bb:dd.f` and USB `busnum`/`devnum` parsing
//! - **Parent resolution**: bounded ancestor walks deciding USB vs. PCI parents
//! - **ACS**: per-enumeration memo of the PCIe Access Control Services flag
//! - **USB Discovery**: root USB devices with identity, parent and ACS flag
//! - **CAN / Serial / TPM / Watchdog**: smaller classes sharing the same
//!   parent resolution
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hwtopo_core::config::Options;
//! use hwtopo_core::hardware::UsbDiscovery;
//!
//! let mut discovery = UsbDiscovery::new(Options::from_env());
//! let result = discovery.enumerate().unwrap();
//! for device in &result.devices {
//!     println!("{}", device);
//! }
//! for error in &result.errors {
//!     eprintln!("warning: {}", error);
//! }
//! ```

mod acs;
mod address;
mod can;
mod discovery;
mod parent;
mod serial;
mod sysfs;
mod tpm;
mod usb;
mod watchdog;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{HwError, HwResult};

pub use acs::{reports_acs, AcsCache, AcsProbe, LspciProbe, SharedAcsCache, ACS_MARKER};
pub use address::{BusParent, PciAddress, UsbAddress};
pub use can::{CanDevice, CanDiscovery, CanInfo};
pub use discovery::{
    CategoryFilter, DiscoveryOptions, DiscoveryReport, DiscoverySummary, HardwareDiscovery,
};
pub use parent::{find_pci_lineage, resolve_parent, PCI_LINEAGE_MAX_HOPS, USB_PARENT_MAX_HOPS};
pub use serial::{SerialDevice, SerialDiscovery, SerialInfo};
pub use sysfs::{read_attribute, read_key_value_block, read_optional};
pub use tpm::{TpmDiscovery, TpmInfo};
pub use usb::{UsbDevice, UsbDiscovery, UsbInfo};
pub use watchdog::{WatchdogDevice, WatchdogDiscovery, WatchdogInfo};

/// Devices found by one enumeration call plus the non-fatal errors met on
/// the way
#[derive(Debug)]
pub struct Enumeration<T> {
    /// Devices, in listing order
    pub devices: Vec<T>,
    /// Per-device problems that did not stop the scan
    pub errors: Vec<HwError>,
}

impl<T> Enumeration<T> {
    fn empty() -> Self {
        Self {
            devices: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<T> Default for Enumeration<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Whether a device class is expected on every host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Missing listing directory means "none of these here"
    Optional,
    /// Missing listing directory is reported as a non-fatal error
    Expected,
}

/// Entries of a class listing directory, sorted by name.
///
/// A missing directory yields no entries (plus one wrapped error for
/// [`Presence::Expected`] classes). Any other listing failure, such as a
/// permission problem, fails the call.
pub(crate) fn list_class_dir(
    dir: &Path,
    class: &str,
    presence: Presence,
) -> HwResult<(Vec<(String, PathBuf)>, Vec<HwError>)> {
    let read = match fs::read_dir(dir) {
        Ok(read) => read,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("{} listing {:?} not present", class, dir);
            let errors = match presence {
                Presence::Optional => Vec::new(),
                Presence::Expected => vec![HwError::enumeration(class, e)],
            };
            return Ok((Vec::new(), errors));
        }
        Err(e) => return Err(HwError::from_listing(class, dir, e)),
    };

    let mut entries: Vec<(String, PathBuf)> = read
        .filter_map(|entry| match entry {
            Ok(entry) => Some((entry.file_name().to_string_lossy().to_string(), entry.path())),
            Err(e) => {
                log::debug!("{} listing {:?}: skipping unreadable entry: {}", class, dir, e);
                None
            }
        })
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok((entries, Vec::new()))
}

/// Parent bus of a class device, via its `device` link.
///
/// A missing or dangling link simply means no parent.
pub(crate) fn device_link_parent(class_dir: &Path) -> Option<BusParent> {
    let real = fs::canonicalize(class_dir.join("device")).ok()?;
    resolve_parent(&real)
}
