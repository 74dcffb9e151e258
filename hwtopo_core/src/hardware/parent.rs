//! Parent bus resolution.
//!
//! USB parents are recognised by the `busnum`/`devnum` files they carry,
//! PCI parents by their directory name. Both walks are bounded loops over
//! `Path::parent`, so odd or cyclic-looking hierarchies always terminate.

use std::path::{Component, Path};

use super::address::{BusParent, PciAddress, UsbAddress};

/// Maximum number of directories inspected when looking for a USB parent
pub const USB_PARENT_MAX_HOPS: usize = 5;

/// Maximum number of directories inspected when looking for the PCI
/// function a device ultimately hangs off
pub const PCI_LINEAGE_MAX_HOPS: usize = 32;

/// Resolve the bus a device path is attached to.
///
/// `path` should already be symlink-resolved. USB is tried first, then the
/// nearest PCI-shaped path segment.
pub fn resolve_parent(path: &Path) -> Option<BusParent> {
    if has_usb_segment(path) {
        if let Some(addr) = nearest_usb_device(path) {
            log::debug!("{:?}: usb parent {}", path, addr);
            return Some(BusParent::Usb(addr));
        }
    }

    let pci = segments(path).rev().find_map(PciAddress::parse)?;
    log::debug!("{:?}: pci parent {}", path, pci);
    Some(BusParent::Pci(pci))
}

/// Find the PCI function anywhere above `path`.
///
/// Stops at the `devices` directory (the top of the kernel device tree) or
/// the filesystem root.
pub fn find_pci_lineage(path: &Path) -> Option<PciAddress> {
    let mut current = Some(path);
    for _ in 0..PCI_LINEAGE_MAX_HOPS {
        let dir = current?;
        let base = dir.file_name()?.to_str()?;
        if let Some(addr) = PciAddress::search(base) {
            return Some(addr);
        }
        if base == "devices" {
            return None;
        }
        current = dir.parent();
    }
    None
}

fn nearest_usb_device(path: &Path) -> Option<UsbAddress> {
    let mut current = Some(path);
    for _ in 0..USB_PARENT_MAX_HOPS {
        let dir = current?;
        if let Some(addr) = UsbAddress::from_dir(dir) {
            return Some(addr);
        }
        current = dir.parent();
    }
    None
}

fn has_usb_segment(path: &Path) -> bool {
    segments(path).any(|s| s.starts_with("usb"))
}

fn segments(path: &Path) -> impl DoubleEndedIterator<Item = &str> {
    path.components().filter_map(|c| match c {
        Component::Normal(s) => s.to_str(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn usb_dir(path: &Path, bus: &str, dev: &str) {
        fs::create_dir_all(path).unwrap();
        fs::write(path.join("busnum"), bus).unwrap();
        fs::write(path.join("devnum"), dev).unwrap();
    }

    #[test]
    fn test_pci_parent_from_segment() {
        let path = PathBuf::from("/sys/devices/pci0000:00/0000:00:1f.6/net/eth0");
        let parent = resolve_parent(&path).unwrap();
        assert_eq!(
            parent,
            BusParent::Pci(PciAddress {
                domain: "0000".into(),
                bus: "00".into(),
                device: "1f".into(),
                function: "6".into(),
            })
        );
    }

    #[test]
    fn test_nearest_pci_segment_wins() {
        let path = PathBuf::from("/sys/devices/pci0000:00/0000:00:1c.0/0000:02:00.0/nvme/nvme0");
        let parent = resolve_parent(&path).unwrap();
        assert_eq!(parent.pci().unwrap().to_string(), "0000:02:00.0");
    }

    #[test]
    fn test_no_parent_for_platform_device() {
        let path = PathBuf::from("/sys/devices/platform/serial8250/tty/ttyS1");
        assert_eq!(resolve_parent(&path), None);
    }

    #[test]
    fn test_usb_wins_over_pci() {
        let root = TempDir::new().unwrap();
        let hub = root.path().join("sys/devices/pci0000:00/0000:00:14.0/usb1");
        usb_dir(&hub, "1", "1");
        let dev = hub.join("1-2");
        usb_dir(&dev, "1", "4");
        let iface = dev.join("1-2:1.0");
        fs::create_dir_all(&iface).unwrap();

        let parent = resolve_parent(&iface).unwrap();
        assert_eq!(
            parent,
            BusParent::Usb(UsbAddress {
                bus: "1".into(),
                devnum: "4".into()
            })
        );
    }

    #[test]
    fn test_usb_walk_is_bounded() {
        let root = TempDir::new().unwrap();
        let hub = root.path().join("sys/devices/pci0000:00/0000:00:14.0/usb1");
        usb_dir(&hub, "1", "1");
        let deep = hub.join("a/b/c/d/e/f");
        fs::create_dir_all(&deep).unwrap();

        // Six hops away from the hub: the USB walk gives up and the PCI
        // segment above it is used instead.
        let parent = resolve_parent(&deep).unwrap();
        assert_eq!(parent.pci().unwrap().to_string(), "0000:00:14.0");
    }

    #[test]
    fn test_usb_segment_without_attributes_falls_through() {
        let path = PathBuf::from("/nonexistent/devices/pci0000:00/0000:00:14.0/usb3/3-1");
        let parent = resolve_parent(&path).unwrap();
        assert_eq!(parent.pci().unwrap().to_string(), "0000:00:14.0");
    }

    #[test]
    fn test_pci_lineage() {
        let path = PathBuf::from("/sys/devices/pci0000:00/0000:00:14.0/usb1/1-1/1-1.3");
        assert_eq!(find_pci_lineage(&path).unwrap().canonical(), "0000:00:14.0");

        let platform = PathBuf::from("/sys/devices/platform/dwc3.0/usb1/1-1");
        assert_eq!(find_pci_lineage(&platform), None);
    }
}
