//! TPM discovery for hwtopo.
//!
//! Only the first TPM (`tpm0`) is reported. Identity comes from the legacy
//! `caps` file when the driver provides it, falling back to the vendor ID of
//! the parent device.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::Options;
use crate::error::HwResult;
use crate::paths::SysfsPaths;

use super::address::BusParent;
use super::device_link_parent;
use super::sysfs::{read_attribute, read_key_value_block};

/// TPM presence and identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TpmInfo {
    /// Whether `tpm0` exists
    pub present: bool,
    pub manufacturer: String,
    /// TCG specification version
    pub spec_version: String,
    pub firmware_version: String,
    /// Bus the TPM is attached to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<BusParent>,
}

impl fmt::Display for TpmInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TPM ({} devices)", usize::from(self.present))
    }
}

/// TPM discovery
pub struct TpmDiscovery {
    paths: SysfsPaths,
}

impl TpmDiscovery {
    pub fn new(options: &Options) -> Self {
        Self {
            paths: SysfsPaths::new(options),
        }
    }

    fn tpm0(&self) -> PathBuf {
        self.paths.sys_class_tpm.join("tpm0")
    }

    /// Read TPM information. An absent TPM is not an error.
    pub fn detect(&self) -> HwResult<TpmInfo> {
        let dir = self.tpm0();
        if !dir.exists() {
            log::debug!("no TPM at {:?}", dir);
            return Ok(TpmInfo::default());
        }

        let mut info = TpmInfo {
            present: true,
            ..Default::default()
        };

        // `caps` only exists for TPM 1.2 drivers; its absence is normal.
        if let Ok(caps) = read_key_value_block(&dir.join("caps")) {
            for (key, value) in caps {
                match key.as_str() {
                    "MANUFACTURER" => info.manufacturer = value,
                    "TCG VERSION" => info.spec_version = value,
                    "FIRMWARE VERSION" => info.firmware_version = value,
                    _ => {}
                }
            }
        }

        if info.manufacturer.is_empty() {
            info.manufacturer = read_attribute(&dir.join("device").join("vendor"));
        }
        if info.spec_version.is_empty() {
            // TPM 2.0 drivers expose only the major version
            let major = read_attribute(&dir.join("tpm_version_major"));
            if !major.is_empty() {
                info.spec_version = format!("{}.0", major);
            }
        }
        info.parent = device_link_parent(&dir);

        Ok(info)
    }
}
