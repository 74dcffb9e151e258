//! Bus address parsing.
//!
//! Two grammars show up in sysfs paths:
//!
//! - PCI functions are directories named `dddd:bb:dd.f` (domain, bus,
//!   device, function). The same text also shows up inside longer names
//!   such as `pci-0000:00:14.0-usb-0:2`.
//! - USB devices are identified by the `busnum` and `devnum` attribute files
//!   they carry, not by their directory name.

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::sysfs::read_attribute;

/// Length of `dddd:bb:dd.f`
const PCI_ADDRESS_LEN: usize = 12;

fn pci_bdf_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b([0-9a-f]{4}):([0-9a-f]{2}):([0-9a-f]{2})\.([0-7])\b")
            .expect("PCI address pattern is a valid regex")
    })
}

/// PCI function address (domain:bus:device.function)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PciAddress {
    /// 4 hex digits
    pub domain: String,
    /// 2 hex digits
    pub bus: String,
    /// 2 hex digits
    pub device: String,
    /// 1 digit, 0-7
    pub function: String,
}

impl PciAddress {
    /// Parse an exact `dddd:bb:dd.f` segment.
    ///
    /// Returns `None` for anything else; walking non-PCI ancestors hits this
    /// path constantly, so a mismatch is not an error.
    pub fn parse(segment: &str) -> Option<Self> {
        let bytes = segment.as_bytes();
        if bytes.len() != PCI_ADDRESS_LEN
            || bytes[4] != b':'
            || bytes[7] != b':'
            || bytes[10] != b'.'
        {
            return None;
        }

        let hex = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_hexdigit);
        if !hex(0..4) || !hex(5..7) || !hex(8..10) || !matches!(bytes[11], b'0'..=b'7') {
            return None;
        }

        Some(Self {
            domain: segment[0..4].to_string(),
            bus: segment[5..7].to_string(),
            device: segment[8..10].to_string(),
            function: segment[11..].to_string(),
        })
    }

    /// Find the first PCI address embedded anywhere in `text`
    pub fn search(text: &str) -> Option<Self> {
        let caps = pci_bdf_re().captures(text)?;
        Some(Self {
            domain: caps[1].to_string(),
            bus: caps[2].to_string(),
            device: caps[3].to_string(),
            function: caps[4].to_string(),
        })
    }

    /// Lower-cased `dddd:bb:dd.f`, used as the ACS cache key and as the
    /// argument handed to the diagnostic tool
    pub fn canonical(&self) -> String {
        self.to_string().to_ascii_lowercase()
    }
}

impl fmt::Display for PciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}.{}", self.domain, self.bus, self.device, self.function)
    }
}

/// USB device address as reported by the kernel
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsbAddress {
    /// Contents of `busnum`
    pub bus: String,
    /// Contents of `devnum`
    pub devnum: String,
}

impl UsbAddress {
    /// Read the address of the USB device living in `dir`.
    ///
    /// Both `busnum` and `devnum` must exist; their contents are taken
    /// verbatim (trimmed), without numeric validation.
    pub fn from_dir(dir: &Path) -> Option<Self> {
        let busnum = dir.join("busnum");
        let devnum = dir.join("devnum");
        if !busnum.is_file() || !devnum.is_file() {
            return None;
        }
        Some(Self {
            bus: read_attribute(&busnum),
            devnum: read_attribute(&devnum),
        })
    }
}

impl fmt::Display for UsbAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.bus, self.devnum)
    }
}

/// The bus a device is attached to.
///
/// Carried as `Option<BusParent>`: `None` means no parent bus could be
/// identified (platform devices, virtual devices).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusParent {
    /// Attached to a PCI function
    Pci(PciAddress),
    /// Attached to a USB device or hub
    Usb(UsbAddress),
}

impl BusParent {
    /// PCI address, if this is a PCI parent
    pub fn pci(&self) -> Option<&PciAddress> {
        match self {
            BusParent::Pci(addr) => Some(addr),
            BusParent::Usb(_) => None,
        }
    }

    /// USB address, if this is a USB parent
    pub fn usb(&self) -> Option<&UsbAddress> {
        match self {
            BusParent::Usb(addr) => Some(addr),
            BusParent::Pci(_) => None,
        }
    }
}

impl fmt::Display for BusParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusParent::Pci(addr) => write!(f, "parent-pci={}", addr),
            BusParent::Usb(addr) => write!(f, "parent-usb={}", addr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_valid_addresses() {
        for raw in ["0000:00:1f.6", "0000:3b:00.0", "ABCD:EF:1a.7", "10de:ff:00.1"] {
            let addr = PciAddress::parse(raw).unwrap_or_else(|| panic!("{raw} should parse"));
            assert_eq!(addr.to_string(), raw);
        }
    }

    #[test]
    fn test_parse_fields() {
        let addr = PciAddress::parse("0000:00:1f.6").unwrap();
        assert_eq!(addr.domain, "0000");
        assert_eq!(addr.bus, "00");
        assert_eq!(addr.device, "1f");
        assert_eq!(addr.function, "6");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        let bad = [
            "",
            "0000:00:1f",
            "0000:00:1f.60",
            "0000-00:1f.6",
            "0000:00-1f.6",
            "0000:00:1f-6",
            "0000:00:1f.8",
            "000g:00:1f.6",
            "usb1",
            "pci0000:00",
            "1-1.2:1.0000",
        ];
        for raw in bad {
            assert_eq!(PciAddress::parse(raw), None, "{raw:?} should not parse");
        }
    }

    #[test]
    fn test_search_finds_embedded_address() {
        let addr = PciAddress::search("pci-0000:00:14.0-usb-0:2:1.0").unwrap();
        assert_eq!(addr.to_string(), "0000:00:14.0");
        assert_eq!(PciAddress::search("pci0000:00"), None);
        assert_eq!(PciAddress::search("1-1.4"), None);
    }

    #[test]
    fn test_canonical_is_lowercase() {
        let addr = PciAddress::parse("0000:00:1F.6").unwrap();
        assert_eq!(addr.to_string(), "0000:00:1F.6");
        assert_eq!(addr.canonical(), "0000:00:1f.6");
    }

    #[test]
    fn test_usb_address_needs_both_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("busnum"), "3\n").unwrap();
        assert_eq!(UsbAddress::from_dir(dir.path()), None);

        fs::write(dir.path().join("devnum"), " 7 \n").unwrap();
        let addr = UsbAddress::from_dir(dir.path()).unwrap();
        assert_eq!(addr.bus, "3");
        assert_eq!(addr.devnum, "7");
        assert_eq!(addr.to_string(), "3-7");
    }

    #[test]
    fn test_bus_parent_json_shape() {
        let parent = BusParent::Pci(PciAddress::parse("0000:00:1f.6").unwrap());
        let json = serde_json::to_value(&parent).unwrap();
        assert_eq!(json["pci"]["domain"], "0000");
        assert_eq!(json["pci"]["function"], "6");
        assert_eq!(parent.to_string(), "parent-pci=0000:00:1f.6");
        assert!(parent.usb().is_none());
    }
}
