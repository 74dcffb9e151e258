//! # hwtopo Core
//!
//! Bus topology resolver for the Linux kernel device model.
//!
//! Walks a sysfs tree (the live `/sys` or any directory laid out like it) and
//! reports devices together with the bus they hang off:
//!
//! - **Addresses**: PCI `dddd:bb:dd.f` and USB `bus-devnum` types
//! - **Parent resolution**: nearest USB device or PCI function above a path
//! - **ACS**: PCIe Access Control Services flag, probed once per address
//! - **Discovery**: USB, CAN, serial, TPM and watchdog enumeration
//! - **Config**: layered options from defaults, YAML and `HWTOPO_*` variables
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hwtopo_core::{HardwareDiscovery, Options};
//!
//! let mut discovery = HardwareDiscovery::new(Options::from_env());
//! let report = discovery.scan_all();
//! println!("{}", report.summary());
//! ```

pub mod config;
pub mod error;
pub mod hardware;
pub mod paths;

// Re-export commonly used types for easy access
pub use config::Options;
pub use error::{HwError, HwResult};
pub use hardware::{
    BusParent, CategoryFilter, DiscoveryOptions, DiscoveryReport, Enumeration, HardwareDiscovery,
    PciAddress, UsbAddress, UsbDevice, UsbDiscovery,
};

// Re-export serde_json / serde_yaml for consistent type usage across crates
pub use serde_json;
pub use serde_yaml;
