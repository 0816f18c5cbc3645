//! Driver configuration and module metadata

use crate::devnum::MINORMASK;
use crate::error::{Error, Result};

/// Default number of device-number slots reserved at load time
pub const LPS25HB_MAX_DEVICES: u32 = 10;

/// Module metadata, the equivalent of `MODULE_LICENSE` and friends
#[derive(Debug, Clone, Copy)]
pub struct ModuleInfo {
    /// Module license
    pub license: &'static str,
    /// Module author
    pub author: &'static str,
    /// Short description
    pub description: &'static str,
}

/// Metadata of the LPS25HB driver module
pub const MODULE_INFO: ModuleInfo = ModuleInfo {
    license: "GPL",
    author: "Maciej Rutkowski",
    description: "SPI driver for LPS25HB",
};

/// Names and limits used when the driver registers with the host
///
/// Deserializable from RON; missing fields take the defaults below.
///
/// ```ron
/// (
///     max_devices: 4,
///     enforce_capacity: true,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Name of the SPI driver (`spi_driver.driver.name`)
    pub driver_name: String,
    /// Name of the reserved char-device region
    pub region_name: String,
    /// Name of the device class
    pub class_name: String,
    /// Device node prefix, nodes are named `<prefix>N`
    pub node_prefix: String,
    /// First minor of the reserved region
    pub first_minor: u32,
    /// Number of reserved device-number slots
    pub max_devices: u32,
    /// Refuse to bind once all slots are used
    pub enforce_capacity: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            driver_name: "mr_lps25hb".into(),
            region_name: "lps25hbs".into(),
            class_name: "lps25hb".into(),
            node_prefix: "barometer".into(),
            first_minor: 0,
            max_devices: LPS25HB_MAX_DEVICES,
            enforce_capacity: true,
        }
    }
}

impl DriverConfig {
    /// Set the number of reserved slots
    pub fn with_max_devices(mut self, max_devices: u32) -> Self {
        self.max_devices = max_devices;
        self
    }

    /// Enable or disable the bind-time capacity check
    pub fn with_capacity_check(mut self, enforce: bool) -> Self {
        self.enforce_capacity = enforce;
        self
    }

    /// Node name for the device bound at `index`
    pub fn node_name(&self, index: u32) -> String {
        format!("{}{}", self.node_prefix, index)
    }

    /// Check names and limits before touching the host
    pub fn validate(&self) -> Result<()> {
        let names = [
            ("driver_name", &self.driver_name),
            ("region_name", &self.region_name),
            ("class_name", &self.class_name),
            ("node_prefix", &self.node_prefix),
        ];
        for (field, value) in names {
            if value.is_empty() {
                return Err(Error::InvalidArgument(format!("{} must not be empty", field)));
            }
            if value.contains('/') {
                return Err(Error::InvalidArgument(format!(
                    "{} must not contain '/': {}",
                    field, value
                )));
            }
        }

        if self.max_devices == 0 {
            return Err(Error::InvalidArgument("max_devices must be at least 1".into()));
        }

        let last_minor = u64::from(self.first_minor) + u64::from(self.max_devices) - 1;
        if last_minor > u64::from(MINORMASK) {
            return Err(Error::InvalidArgument(format!(
                "minor range {}..={} exceeds {}",
                self.first_minor, last_minor, MINORMASK
            )));
        }

        Ok(())
    }
}
