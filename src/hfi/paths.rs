//! The attribute path convention, as pure functions.
//!
//! Every path this crate touches is built here, so the convention is
//! testable without any I/O:
//!
//! - device node: `<dev_base>` or `<dev_base>_<unit>`;
//! - unit attributes: `<class_base>_<unit>/<attr>`;
//! - port attributes: `<class_base>_<unit>/ports/<port>/<attr>`;
//! - CCA blobs: `.../ports/<port>/CCMgtA/{cc_settings_bin,cc_table_bin}`;
//! - driver stats fs: `<hfifs_base>/<attr>` and `<hfifs_base>/<unit>/<attr>`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Default character device node the driver exposes.
pub const DEVICE_PATH: &str = "/dev/hfi1";

/// Default sysfs class base; unit directories are `hfi1_0`, `hfi1_1`, ...
pub const CLASS_PATH: &str = "/sys/class/infiniband/hfi1";

/// Default mount of the driver statistics filesystem.
pub const HFIFS_PATH: &str = "/sys/kernel/debug/hfi1";

/// Append `_<unit>` to the last path component.
fn with_unit_suffix(base: &Path, unit: u32) -> PathBuf {
    let mut s: OsString = base.as_os_str().to_os_string();
    s.push(format!("_{unit}"));
    PathBuf::from(s)
}

/// Device node path for a unit; `None` is the "any unit" node.
pub(crate) fn device(dev_base: &Path, unit: Option<u32>) -> PathBuf {
    match unit {
        Some(unit) => with_unit_suffix(dev_base, unit),
        None => dev_base.to_path_buf(),
    }
}

/// Class directory of a unit.
pub(crate) fn unit_dir(class_base: &Path, unit: u32) -> PathBuf {
    with_unit_suffix(class_base, unit)
}

/// Unit-scoped attribute file.
pub(crate) fn unit_attr(class_base: &Path, unit: u32, attr: &str) -> PathBuf {
    unit_dir(class_base, unit).join(attr)
}

/// Port-scoped attribute file.
pub(crate) fn port_attr(class_base: &Path, unit: u32, port: u8, attr: &str) -> PathBuf {
    unit_dir(class_base, unit)
        .join("ports")
        .join(port.to_string())
        .join(attr)
}

/// Indexed mapping attribute, e.g. `sl2sc/3`.
pub(crate) fn indexed_attr(table: &str, index: u32) -> String {
    format!("{table}/{index}")
}

pub(crate) fn cc_settings(class_base: &Path, unit: u32, port: u8) -> PathBuf {
    port_attr(class_base, unit, port, "CCMgtA/cc_settings_bin")
}

pub(crate) fn cc_table(class_base: &Path, unit: u32, port: u8) -> PathBuf {
    port_attr(class_base, unit, port, "CCMgtA/cc_table_bin")
}

/// Driver-wide stats attribute.
pub(crate) fn hfifs_attr(hfifs_base: &Path, attr: &str) -> PathBuf {
    hfifs_base.join(attr)
}

/// Per-unit stats attribute.
pub(crate) fn hfifs_unit_attr(hfifs_base: &Path, unit: u32, attr: &str) -> PathBuf {
    hfifs_base.join(unit.to_string()).join(attr)
}

/// Per-port counter blob name.
pub(crate) fn port_counters_attr(port: u8) -> String {
    format!("port{port}counters")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_path() {
        let base = Path::new("/dev/hfi1");
        assert_eq!(device(base, None), Path::new("/dev/hfi1"));
        assert_eq!(device(base, Some(0)), Path::new("/dev/hfi1_0"));
        assert_eq!(device(base, Some(3)), Path::new("/dev/hfi1_3"));
    }

    #[test]
    fn test_unit_and_port_attrs() {
        let base = Path::new("/sys/class/infiniband/hfi1");
        assert_eq!(
            unit_attr(base, 1, "nctxts"),
            Path::new("/sys/class/infiniband/hfi1_1/nctxts")
        );
        assert_eq!(
            port_attr(base, 0, 1, "phys_state"),
            Path::new("/sys/class/infiniband/hfi1_0/ports/1/phys_state")
        );
        assert_eq!(
            port_attr(base, 0, 1, "gids/0"),
            Path::new("/sys/class/infiniband/hfi1_0/ports/1/gids/0")
        );
    }

    #[test]
    fn test_cca_paths() {
        let base = Path::new("/sys/class/infiniband/hfi1");
        assert_eq!(
            cc_settings(base, 2, 1),
            Path::new("/sys/class/infiniband/hfi1_2/ports/1/CCMgtA/cc_settings_bin")
        );
        assert_eq!(
            cc_table(base, 2, 1),
            Path::new("/sys/class/infiniband/hfi1_2/ports/1/CCMgtA/cc_table_bin")
        );
    }

    #[test]
    fn test_indexed_and_counter_templates() {
        assert_eq!(indexed_attr("sl2sc", 7), "sl2sc/7");
        assert_eq!(indexed_attr("pkeys", 0), "pkeys/0");
        assert_eq!(port_counters_attr(1), "port1counters");
    }

    #[test]
    fn test_hfifs_paths() {
        let base = Path::new("/sys/kernel/debug/hfi1");
        assert_eq!(
            hfifs_attr(base, "driver_stats"),
            Path::new("/sys/kernel/debug/hfi1/driver_stats")
        );
        assert_eq!(
            hfifs_unit_attr(base, 0, "counters"),
            Path::new("/sys/kernel/debug/hfi1/0/counters")
        );
    }
}
