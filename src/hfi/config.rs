use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::error::{Error, Result};
use super::paths;

/// Filesystem roots the service layer operates on.
///
/// The defaults match a stock driver installation. Overriding them is mainly
/// for tests and for hosts that relocate debugfs.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Character device node, suffixed `_<unit>` for a specific unit.
    pub device_path: PathBuf,

    /// Sysfs class base; unit directories append `_<unit>`.
    pub class_path: PathBuf,

    /// Driver statistics filesystem mount.
    pub hfifs_path: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from(paths::DEVICE_PATH),
            class_path: PathBuf::from(paths::CLASS_PATH),
            hfifs_path: PathBuf::from(paths::HFIFS_PATH),
        }
    }
}

impl ServiceConfig {
    /// Load overrides from an `[opafab]` table in a TOML file.
    ///
    /// Keys not present keep their default values.
    pub fn load_toml(config_file: impl AsRef<Path>) -> Result<Self> {
        let toml_str = fs::read_to_string(config_file)?;
        let toml: toml::Value =
            toml::from_str(&toml_str).map_err(|e| Error::Parse(e.to_string()))?;

        let table = match toml.get("opafab") {
            Some(t) => t,
            None => return Err(Error::Parse("opafab configuration not found".into())),
        };
        table
            .clone()
            .try_into()
            .map_err(|e: toml::de::Error| Error::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use anyhow::Result;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.device_path, Path::new("/dev/hfi1"));
        assert_eq!(config.class_path, Path::new("/sys/class/infiniband/hfi1"));
        assert_eq!(config.hfifs_path, Path::new("/sys/kernel/debug/hfi1"));
    }

    #[test]
    fn test_load_toml() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(
            file,
            "[opafab]\ndevice_path = \"/tmp/fake/dev/hfi1\"\nclass_path = \"/tmp/fake/class/hfi1\""
        )?;

        let config = ServiceConfig::load_toml(file.path())?;
        assert_eq!(config.device_path, Path::new("/tmp/fake/dev/hfi1"));
        assert_eq!(config.class_path, Path::new("/tmp/fake/class/hfi1"));
        // Untouched key keeps its default.
        assert_eq!(config.hfifs_path, Path::new("/sys/kernel/debug/hfi1"));
        Ok(())
    }

    #[test]
    fn test_load_toml_missing_table() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "[other]\nkey = 1")?;

        let err = ServiceConfig::load_toml(file.path()).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        Ok(())
    }
}
