//! The host fabric interface service layer.

mod cca;
mod config;
mod device;
mod error;
mod gid;
mod paths;
mod stats;
mod sysfs;
mod topology;

pub use cca::{CcSettings, CcTable, CC_NUM_SLS, CC_SETTINGS_LEN};
pub use config::ServiceConfig;
pub use device::{wait_for_device, Device, Timeout, DEFAULT_WAIT_MS, RETRY_INTERVAL_MS};
pub use error::{Error, Result};
pub use gid::Gid;
pub use stats::NameList;
pub use topology::MAX_PORT;

use sysfs::SysClass;

/// Handle to the fabric service layer.
///
/// Holds the filesystem roots and nothing else; every query re-reads the
/// control plane, since units and links can come and go between calls.
pub struct Hfi {
    config: ServiceConfig,
    sysfs: SysClass,
}

impl Hfi {
    /// Service handle over the default driver paths.
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    /// Service handle over explicit filesystem roots.
    pub fn with_config(config: ServiceConfig) -> Self {
        let sysfs = SysClass::new(&config);
        Self { config, sysfs }
    }

    #[inline]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Wait for the device node of `unit` (`None` = any unit) and open it.
    pub fn open_device(&self, unit: Option<u32>, timeout: Timeout) -> Result<Device> {
        Device::open(&self.config.device_path, unit, timeout)
    }
}

impl Default for Hfi {
    fn default() -> Self {
        Self::new()
    }
}
