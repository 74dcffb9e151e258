//! USB device discovery for hwtopo.
//!
//! Enumerates root USB devices under `sys/bus/usb/devices`, fills their
//! identity from `uevent` and attribute files, resolves the bus they hang
//! off and, for devices below a PCI host controller, the controller's ACS
//! capability.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;

use serde::{Deserialize, Serialize};

use crate::config::Options;
use crate::error::{HwError, HwResult};
use crate::hw_internal;
use crate::paths::SysfsPaths;

use super::acs::{AcsCache, AcsProbe, LspciProbe, SharedAcsCache};
use super::address::{BusParent, PciAddress};
use super::parent::{find_pci_lineage, resolve_parent};
use super::sysfs::{read_attribute, read_key_value_block, read_optional};
use super::{list_class_dir, Enumeration, Presence};

const CLASS: &str = "usb";

/// USB device information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbDevice {
    /// Listing entry name (e.g. `1-1.4`, `usb2`)
    pub name: String,
    /// Bound driver, from `uevent`
    pub driver: String,
    /// `TYPE` from `uevent` (class/subclass/protocol triple)
    #[serde(rename = "type")]
    pub device_type: String,
    /// USB Vendor ID, hex as reported
    pub vendor_id: String,
    /// USB Product ID, hex as reported
    pub product_id: String,
    /// Device release number
    pub revision_id: String,
    /// Interface description string
    pub interface: String,
    /// Product string
    pub product: String,
    /// Manufacturer string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    /// Device serial number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    /// Link speed in Mbps, as reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    /// Bus number
    pub busnum: String,
    /// Device number on the bus
    pub devnum: String,
    /// `bDeviceClass`
    pub class: String,
    /// `bDeviceSubClass`
    pub subclass: String,
    /// `bDeviceProtocol`
    pub protocol: String,
    /// Resolved sysfs directory
    pub sysfs_path: PathBuf,
    /// Bus this device is attached to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<BusParent>,
    /// ACS state of the PCI function this device sits below
    pub acs_enabled: bool,
}

impl UsbDevice {
    /// Get VID:PID string
    pub fn vid_pid_string(&self) -> String {
        format!("{}:{}", self.vendor_id, self.product_id)
    }

    /// Get display name (product or VID:PID)
    pub fn display_name(&self) -> String {
        if self.product.is_empty() {
            self.vid_pid_string()
        } else {
            self.product.clone()
        }
    }

    /// Port path on the bus (`1.4` for `1-1.4`); empty for root hubs
    pub fn port(&self) -> &str {
        self.name.split_once('-').map(|(_, port)| port).unwrap_or("")
    }

    /// `<busnum>-<port>`
    pub fn address(&self) -> String {
        format!("{}-{}", self.busnum, self.port())
    }

    /// Check if device is a hub
    pub fn is_hub(&self) -> bool {
        self.class == "09"
    }

    /// PCI parent address, if directly attached to a PCI function
    pub fn parent_pci(&self) -> Option<&PciAddress> {
        self.parent.as_ref().and_then(BusParent::pci)
    }
}

impl fmt::Display for UsbDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "USB device vendorID={} productID={} address={}",
            self.vendor_id,
            self.product_id,
            self.address()
        )?;
        if !self.product.is_empty() {
            write!(f, " product={:?}", self.product)?;
        }
        if let Some(parent) = &self.parent {
            write!(f, " {}", parent)?;
        }
        if self.acs_enabled {
            write!(f, " acs=enabled")?;
        }
        Ok(())
    }
}

/// All USB devices found on the host
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsbInfo {
    /// Root devices, in listing order
    pub devices: Vec<UsbDevice>,
}

impl fmt::Display for UsbInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "USB ({} devices)", self.devices.len())
    }
}

/// Fill identity fields from the `uevent` file in `dir`
pub fn fill_from_uevent(dir: &Path, dev: &mut UsbDevice) -> io::Result<()> {
    let props = read_key_value_block(&dir.join("uevent"))?;

    if let Some(driver) = props.get("DRIVER") {
        dev.driver = driver.clone();
    }
    if let Some(device_type) = props.get("TYPE") {
        dev.device_type = device_type.clone();
    }
    if let Some(product) = props.get("PRODUCT") {
        let ids: Vec<&str> = product.splitn(3, '/').collect();
        if let [vendor, product, revision] = ids[..] {
            dev.vendor_id = vendor.to_string();
            dev.product_id = product.to_string();
            dev.revision_id = revision.to_string();
        }
    }
    Ok(())
}

/// USB device discovery
pub struct UsbDiscovery {
    options: Options,
    paths: SysfsPaths,
    /// Devices from the last enumeration
    devices: Vec<UsbDevice>,
}

impl UsbDiscovery {
    /// Create a new USB discovery instance
    pub fn new(options: Options) -> Self {
        let paths = SysfsPaths::new(&options);
        Self {
            options,
            paths,
            devices: Vec::new(),
        }
    }

    /// Enumerate root USB devices, querying ACS with the configured tool
    pub fn enumerate(&mut self) -> HwResult<Enumeration<UsbDevice>> {
        let probe = LspciProbe::from_options(&self.options);
        self.enumerate_with(&probe)
    }

    /// Enumerate root USB devices with a caller-supplied ACS probe.
    ///
    /// The ACS cache lives for this call only. Per-device failures are
    /// collected in [`Enumeration::errors`]; only an unreadable listing
    /// directory fails the call.
    pub fn enumerate_with(&mut self, probe: &dyn AcsProbe) -> HwResult<Enumeration<UsbDevice>> {
        let dir = &self.paths.sys_bus_usb_devices;
        let (entries, errors) = list_class_dir(dir, CLASS, Presence::Expected)?;

        // Interfaces are named `<dev>:<config>.<iface>`; only devices count.
        let entries: Vec<(String, PathBuf)> = entries
            .into_iter()
            .filter(|(name, _)| !name.contains(':'))
            .collect();

        let resolved = if self.options.workers > 1 && entries.len() > 1 {
            resolve_parallel(&entries, probe, self.options.workers)?
        } else {
            let mut cache = AcsCache::new();
            let mut acs = |addr: &PciAddress| cache.is_enabled(addr, probe);
            entries
                .iter()
                .filter_map(|(name, link)| resolve_device(name, link, &mut acs))
                .collect()
        };

        let mut result = Enumeration {
            devices: Vec::with_capacity(resolved.len()),
            errors,
        };
        for (device, error) in resolved {
            if let Some(err) = error {
                log::warn!("usb {}: {}", device.name, err);
                result.errors.push(err);
            }
            result.devices.push(device);
        }

        log::debug!(
            "usb: {} devices, {} errors",
            result.devices.len(),
            result.errors.len()
        );
        self.devices = result.devices.clone();
        Ok(result)
    }

    /// Get devices from the last enumeration
    pub fn devices(&self) -> &[UsbDevice] {
        &self.devices
    }

    /// Find device by VID/PID (case-insensitive hex)
    pub fn find_by_vid_pid(&self, vid: &str, pid: &str) -> Option<&UsbDevice> {
        self.devices.iter().find(|d| {
            d.vendor_id.eq_ignore_ascii_case(vid) && d.product_id.eq_ignore_ascii_case(pid)
        })
    }

    /// Find all devices by vendor
    pub fn find_by_vendor(&self, vid: &str) -> Vec<&UsbDevice> {
        self.devices
            .iter()
            .filter(|d| d.vendor_id.eq_ignore_ascii_case(vid))
            .collect()
    }

    /// Find devices directly attached to a PCI function
    pub fn find_by_parent_pci(&self, address: &PciAddress) -> Vec<&UsbDevice> {
        let wanted = address.canonical();
        self.devices
            .iter()
            .filter(|d| {
                d.parent_pci()
                    .map(PciAddress::canonical)
                    .is_some_and(|addr| addr == wanted)
            })
            .collect()
    }
}

type Resolved = (UsbDevice, Option<HwError>);

/// Build one device from its listing entry.
///
/// Returns `None` when the entry cannot be resolved to a real directory.
fn resolve_device(
    name: &str,
    link: &Path,
    acs: &mut dyn FnMut(&PciAddress) -> bool,
) -> Option<Resolved> {
    let real = match fs::canonicalize(link) {
        Ok(real) => real,
        Err(e) => {
            log::debug!("skipping usb entry {}: {}", name, e);
            return None;
        }
    };

    let mut dev = UsbDevice {
        name: name.to_string(),
        ..Default::default()
    };

    let error = fill_from_uevent(&real, &mut dev)
        .err()
        .map(|e| HwError::attribute(real.join("uevent"), e));

    dev.interface = read_attribute(&real.join("interface"));
    dev.product = read_attribute(&real.join("product"));
    dev.manufacturer = read_optional(&real, "manufacturer");
    dev.serial = read_optional(&real, "serial");
    dev.speed = read_optional(&real, "speed");
    dev.busnum = read_attribute(&real.join("busnum"));
    dev.devnum = read_attribute(&real.join("devnum"));
    dev.class = read_attribute(&real.join("bDeviceClass"));
    dev.subclass = read_attribute(&real.join("bDeviceSubClass"));
    dev.protocol = read_attribute(&real.join("bDeviceProtocol"));

    // The device directory itself carries busnum/devnum, so resolution
    // starts one level up.
    dev.parent = real.parent().and_then(resolve_parent);

    if let Some(pci) = find_pci_lineage(&real) {
        dev.acs_enabled = acs(&pci);
    }

    dev.sysfs_path = real;
    Some((dev, error))
}

/// Resolve entries on scoped worker threads sharing one ACS cache.
///
/// Entries are split into contiguous chunks and results concatenated in
/// chunk order, so the output order matches the sequential path.
fn resolve_parallel(
    entries: &[(String, PathBuf)],
    probe: &dyn AcsProbe,
    workers: usize,
) -> HwResult<Vec<Resolved>> {
    let cache = SharedAcsCache::new();
    let chunk_size = entries.len().div_ceil(workers.min(entries.len()));

    thread::scope(|s| {
        let handles: Vec<_> = entries
            .chunks(chunk_size)
            .map(|chunk| {
                let cache = &cache;
                s.spawn(move || {
                    let mut acs = |addr: &PciAddress| cache.is_enabled(addr, probe);
                    chunk
                        .iter()
                        .filter_map(|(name, link)| resolve_device(name, link, &mut acs))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut resolved = Vec::with_capacity(entries.len());
        for handle in handles {
            let chunk = handle
                .join()
                .map_err(|_| hw_internal!("usb resolver thread panicked"))?;
            resolved.extend(chunk);
        }
        Ok(resolved)
    })
}
