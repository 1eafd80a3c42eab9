//! Congestion-control blobs programmed by the fabric manager.
//!
//! Both loaders deliberately fold "file absent", "short read" and
//! "out-of-range header" into `Ok(None)`: callers fall back to their static
//! CCA tables in all of those cases, and depend on that. Only allocation
//! failure for the table is a genuine error.

use std::fs::File;
use std::io::Read;

use super::error::{Error, Result};
use super::paths;
use super::Hfi;

/// Log target of the CCA debug tier.
const CCA_TARGET: &str = "opafab::cca";

/// Size of the settings record: a 4-byte control map, a 2-byte port
/// control, and one 6-byte congestion setting per service level.
pub const CC_SETTINGS_LEN: usize = 4 + 2 + CC_NUM_SLS * CC_SL_ENTRY_LEN;

/// Service levels covered by the settings record.
pub const CC_NUM_SLS: usize = 32;

const CC_SL_ENTRY_LEN: usize = 6;

/// Verbatim copy of the driver's `cc_settings_bin` record.
///
/// The bytes are kept exactly as exported; accessors slice, they do not
/// decode.
#[derive(Clone)]
pub struct CcSettings {
    raw: [u8; CC_SETTINGS_LEN],
}

impl CcSettings {
    /// The whole record.
    #[inline]
    pub fn raw(&self) -> &[u8; CC_SETTINGS_LEN] {
        &self.raw
    }

    /// The 4-byte congestion control map.
    #[inline]
    pub fn control_map(&self) -> &[u8] {
        &self.raw[..4]
    }

    /// The 2-byte port control field.
    #[inline]
    pub fn port_control(&self) -> &[u8] {
        &self.raw[4..6]
    }

    /// The 6-byte congestion setting of a service level.
    ///
    /// # Panics
    ///
    /// Panics if `sl >= CC_NUM_SLS`.
    #[inline]
    pub fn sl_entry(&self, sl: usize) -> &[u8] {
        assert!(sl < CC_NUM_SLS);
        &self.raw[6 + sl * CC_SL_ENTRY_LEN..][..CC_SL_ENTRY_LEN]
    }
}

/// Congestion-control table programmed by the fabric manager.
#[derive(Debug, Clone)]
pub struct CcTable {
    entries: Vec<u16>,
}

impl CcTable {
    /// The table entries. Always `ccti_limit() + 1` of them.
    #[inline]
    pub fn entries(&self) -> &[u16] {
        &self.entries
    }

    /// Largest valid congestion-control table index.
    #[inline]
    pub fn ccti_limit(&self) -> u16 {
        (self.entries.len() - 1) as u16
    }
}

impl Hfi {
    /// Read the CCA settings blob of `unit:port`.
    ///
    /// `Ok(None)` means no usable custom CCA data; use the static settings.
    /// A missing file is the common case on fabrics without a configured
    /// manager and is not even logged.
    pub fn cc_settings(&self, unit: u32, port: u8) -> Result<Option<CcSettings>> {
        let path = paths::cc_settings(self.sysfs.class_base(), unit, port);
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(_) => return Ok(None),
        };

        let mut raw = [0u8; CC_SETTINGS_LEN];
        if let Err(e) = file.read_exact(&mut raw) {
            log::debug!(
                target: CCA_TARGET,
                "read cc_settings_bin failed ({e}); using static CCA"
            );
            return Ok(None);
        }

        Ok(Some(CcSettings { raw }))
    }

    /// Read the CCA table blob of `unit:port`.
    ///
    /// The blob is a 2-byte native-endian `ccti_limit` in [63, 65535]
    /// followed by `ccti_limit + 1` 16-bit entries. Any structural anomaly
    /// is `Ok(None)` (fall back to static CCA); the one genuine error is
    /// failing to allocate the table.
    pub fn cc_table(&self, unit: u32, port: u8) -> Result<Option<CcTable>> {
        let path = paths::cc_table(self.sysfs.class_base(), unit, port);
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) => {
                log::debug!(
                    target: CCA_TARGET,
                    "open cc_table_bin failed ({e}); using static CCA"
                );
                return Ok(None);
            }
        };

        let mut header = [0u8; 2];
        if let Err(e) = file.read_exact(&mut header) {
            log::debug!(
                target: CCA_TARGET,
                "read ccti_limit failed ({e}); using static CCA"
            );
            return Ok(None);
        }

        let ccti_limit = u16::from_ne_bytes(header);
        if ccti_limit < 63 {
            log::debug!(
                target: CCA_TARGET,
                "ccti_limit {ccti_limit} not in range [63, 65535]; using static CCA"
            );
            return Ok(None);
        }

        let n = ccti_limit as usize + 1;
        let mut body = Vec::new();
        if body.try_reserve_exact(n * 2).is_err() {
            return Err(Error::OutOfMemory);
        }
        body.resize(n * 2, 0);

        if let Err(e) = file.read_exact(&mut body) {
            log::debug!(
                target: CCA_TARGET,
                "read ccti_entry_list failed ({e}); using static CCA"
            );
            return Ok(None);
        }

        let mut entries = Vec::new();
        if entries.try_reserve_exact(n).is_err() {
            return Err(Error::OutOfMemory);
        }
        entries.extend(
            body.chunks_exact(2)
                .map(|pair| u16::from_ne_bytes([pair[0], pair[1]])),
        );

        Ok(Some(CcTable { entries }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::fake_service;
    use super::*;

    fn write_cc_blob(hfi: &Hfi, name: &str, contents: &[u8]) {
        hfi.write_port_attr(0, 1, &format!("CCMgtA/{name}"), contents);
    }

    #[test]
    fn test_settings_absent_is_fallback() {
        let (_tmp, hfi) = fake_service();
        assert!(hfi.cc_settings(0, 1).unwrap().is_none());
    }

    #[test]
    fn test_settings_short_file_is_fallback() {
        let (_tmp, hfi) = fake_service();
        write_cc_blob(&hfi, "cc_settings_bin", &[0u8; CC_SETTINGS_LEN - 1]);
        assert!(hfi.cc_settings(0, 1).unwrap().is_none());
    }

    #[test]
    fn test_settings_exact_file_copied_verbatim() {
        let (_tmp, hfi) = fake_service();
        let blob: Vec<u8> = (0..CC_SETTINGS_LEN).map(|i| i as u8).collect();
        write_cc_blob(&hfi, "cc_settings_bin", &blob);

        let settings = hfi.cc_settings(0, 1).unwrap().unwrap();
        assert_eq!(&settings.raw()[..], &blob[..]);
        assert_eq!(settings.control_map(), &blob[..4]);
        assert_eq!(settings.port_control(), &blob[4..6]);
        assert_eq!(settings.sl_entry(0), &blob[6..12]);
        assert_eq!(settings.sl_entry(31), &blob[CC_SETTINGS_LEN - 6..]);
    }

    fn table_blob(ccti_limit: u16, entries: usize) -> Vec<u8> {
        let mut blob = ccti_limit.to_ne_bytes().to_vec();
        for i in 0..entries {
            blob.extend_from_slice(&(i as u16).to_ne_bytes());
        }
        blob
    }

    #[test]
    fn test_table_absent_is_fallback() {
        let (_tmp, hfi) = fake_service();
        assert!(hfi.cc_table(0, 1).unwrap().is_none());
    }

    #[test]
    fn test_table_limit_below_range_is_fallback() {
        let (_tmp, hfi) = fake_service();
        write_cc_blob(&hfi, "cc_table_bin", &table_blob(62, 63));
        assert!(hfi.cc_table(0, 1).unwrap().is_none());
    }

    #[test]
    fn test_table_minimal_valid() {
        let (_tmp, hfi) = fake_service();
        write_cc_blob(&hfi, "cc_table_bin", &table_blob(63, 64));

        let table = hfi.cc_table(0, 1).unwrap().unwrap();
        assert_eq!(table.ccti_limit(), 63);
        assert_eq!(table.entries().len(), 64);
        assert_eq!(table.entries()[0], 0);
        assert_eq!(table.entries()[63], 63);
    }

    #[test]
    fn test_table_truncated_body_is_fallback() {
        let (_tmp, hfi) = fake_service();
        write_cc_blob(&hfi, "cc_table_bin", &table_blob(63, 10));
        assert!(hfi.cc_table(0, 1).unwrap().is_none());
    }

    #[test]
    fn test_table_truncated_header_is_fallback() {
        let (_tmp, hfi) = fake_service();
        write_cc_blob(&hfi, "cc_table_bin", &[0x3f]);
        assert!(hfi.cc_table(0, 1).unwrap().is_none());
    }
}
