//! Unit/port topology and addressing resolution.
//!
//! Everything here re-reads the control plane on every call; the driver can
//! hot-plug or reload between any two queries, so no snapshot is cached.

use std::fs;

use super::error::{Error, Result};
use super::paths;
use super::Hfi;

/// Ports per unit the hardware can expose. Port numbering is 1-based.
pub const MAX_PORT: u8 = 1;

/// Exact marker the driver reports while the physical link is up. Only the
/// marker-length prefix of `phys_state` is compared.
const LINK_UP_MARKER: &str = "5: LinkUp";

impl Hfi {
    /// Number of units the driver has registered.
    ///
    /// Probes `<class_base>_0`, `_1`, ... until a probe hits a missing or
    /// non-directory entry. Zero means none found; this never errors. A unit
    /// being counted does not guarantee working hardware behind it.
    pub fn num_units(&self) -> usize {
        let mut n = 0;
        loop {
            match fs::metadata(paths::unit_dir(self.sysfs.class_base(), n as u32)) {
                Ok(md) if md.is_dir() => n += 1,
                _ => break,
            }
        }
        n
    }

    /// Total context count for `unit`, or across all units for `None`.
    ///
    /// A unit contributes its `nctxts` value once iff some port of it has
    /// its link up. Unreadable attributes on a qualifying unit contribute
    /// nothing; the scan never aborts.
    pub fn num_contexts(&self, unit: Option<u32>) -> u32 {
        let units = self.num_units() as u32;
        if units == 0 {
            return 0;
        }

        match unit {
            Some(unit) => self.unit_contexts(unit),
            None => (0..units).map(|u| self.unit_contexts(u)).sum(),
        }
    }

    fn unit_contexts(&self, unit: u32) -> u32 {
        let link_up = (1..=MAX_PORT).any(|port| self.port_lid(unit, port).is_ok());
        if !link_up {
            return 0;
        }
        match self.sysfs.unit_read_s64(unit, "nctxts") {
            Ok(val) => val as u32,
            Err(_) => 0,
        }
    }

    /// LID assigned to `unit:port`.
    ///
    /// Gated on the physical link: anything but the link-up state is
    /// [`Error::LinkDown`] and the `lid` attribute is never touched. Zero is
    /// a valid "no LID assigned yet" result, not an error.
    ///
    /// Kept quiet on absent ports, since callers routinely probe both
    /// potential ports without knowing whether the second one exists.
    pub fn port_lid(&self, unit: u32, port: u8) -> Result<u32> {
        let state = match self.sysfs.port_read(unit, port, "phys_state") {
            Ok(state) => state,
            Err(e) => {
                if e.is_not_found() {
                    // normal for port != 1 on single-port silicon
                    log::trace!("failed to get phys_state for unit {unit}:{port}: {e}");
                } else {
                    log::debug!("failed to get phys_state for unit {unit}:{port}: {e}");
                }
                return Err(e);
            }
        };

        if !state.starts_with(LINK_UP_MARKER) {
            log::debug!("link is not up for unit {unit}:{port}");
            return Err(Error::LinkDown);
        }

        match self.sysfs.port_read_s64(unit, port, "lid") {
            Ok(val) => {
                log::trace!("got LID {val} for unit {unit}:{port}");
                Ok(val as u32)
            }
            Err(e) => {
                if e.is_not_found() {
                    log::trace!("failed to get LID for unit {unit}:{port}: {e}");
                } else {
                    log::debug!("failed to get LID for unit {unit}:{port}: {e}");
                }
                Err(e)
            }
        }
    }

    /// GID of `unit:port`, from the `gids/0` attribute.
    ///
    /// A malformed GID text is [`Error::Parse`], distinct from a read
    /// failure.
    pub fn port_gid(&self, unit: u32, port: u8) -> Result<super::Gid> {
        let text = match self.sysfs.port_read(unit, port, "gids/0") {
            Ok(text) => text,
            Err(e) => {
                if e.is_not_found() {
                    // normal for port != 1 on single-port silicon
                    log::trace!("failed to get GID for unit {unit}:{port}: {e}");
                } else {
                    log::debug!("failed to get GID for unit {unit}:{port}: {e}");
                }
                return Err(e);
            }
        };

        text.parse().map_err(|e| {
            log::debug!(
                "failed to parse GID for unit {unit}:{port}: {:?}",
                text.trim()
            );
            e
        })
    }

    /// LMC of `unit:port`.
    pub fn port_lmc(&self, unit: u32, port: u8) -> Result<u8> {
        match self.sysfs.port_read_s64(unit, port, "lid_mask_count") {
            Ok(val) => Ok(val as u8),
            Err(e) => {
                log::info!("failed to get LMC for unit {unit}:{port}: {e}");
                Err(e)
            }
        }
    }

    /// Link rate of `unit:port` in whole Gb/s, truncated to the nearest
    /// 0.5 Gb/s step first.
    pub fn port_rate(&self, unit: u32, port: u8) -> Result<i32> {
        let text = self.sysfs.port_read(unit, port, "rate").map_err(|e| {
            log::info!("failed to get link rate for unit {unit}:{port}: {e}");
            e
        })?;

        match parse_rate(&text) {
            Some(rate) => Ok(((rate * 2.0) as i32) >> 1),
            None => {
                log::info!("failed to get link rate for unit {unit}:{port}");
                Err(Error::Parse(format!("bad rate attribute: {:?}", text.trim())))
            }
        }
    }

    /// SC the subnet manager programmed for `sl` on `unit:port`.
    pub fn port_sl2sc(&self, unit: u32, port: u8, sl: u8) -> Result<i64> {
        self.indexed_lookup(unit, port, "sl2sc", sl as u32)
    }

    /// VL the subnet manager programmed for `sc` on `unit:port`.
    pub fn port_sc2vl(&self, unit: u32, port: u8, sc: u8) -> Result<i64> {
        self.indexed_lookup(unit, port, "sc2vl", sc as u32)
    }

    /// MTU the subnet manager programmed for `vl` on `unit:port`.
    pub fn port_vl2mtu(&self, unit: u32, port: u8, vl: u8) -> Result<i64> {
        self.indexed_lookup(unit, port, "vl2mtu", vl as u32)
    }

    /// Pkey at table position `index` on `unit:port`.
    pub fn port_index2pkey(&self, unit: u32, port: u8, index: u16) -> Result<i64> {
        self.indexed_lookup(unit, port, "pkeys", index as u32)
    }

    /// One indexed mapping read. No caching; the SM may reprogram the table
    /// between calls.
    fn indexed_lookup(&self, unit: u32, port: u8, table: &str, index: u32) -> Result<i64> {
        let attr = paths::indexed_attr(table, index);
        self.sysfs.port_read_s64(unit, port, &attr).map_err(|e| {
            log::debug!("failed to get {table} mapping for index {index} unit {unit}:{port}: {e}");
            e
        })
    }
}

/// strtod-style prefix parse: take the longest leading number, ignore the
/// rest (`"100 Gb/sec (4X EDR)"`), and fail when no digits were consumed.
fn parse_rate(text: &str) -> Option<f64> {
    let s = text.trim();
    let end = s
        .find(|c: char| !c.is_ascii_digit() && c != '.' && c != '-' && c != '+')
        .unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    s[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::super::testutil::fake_service;
    use super::*;

    #[test]
    fn test_num_units() {
        let (_tmp, hfi) = fake_service();
        assert_eq!(hfi.num_units(), 0);

        hfi.write_unit_attr(0, "nctxts", "160\n");
        hfi.write_unit_attr(1, "nctxts", "160\n");
        assert_eq!(hfi.num_units(), 2);

        // A gap stops the probe even if later units exist.
        hfi.write_unit_attr(3, "nctxts", "160\n");
        assert_eq!(hfi.num_units(), 2);
    }

    #[test]
    fn test_num_units_ignores_plain_files() {
        let (_tmp, hfi) = fake_service();
        let dir = paths::unit_dir(hfi.config().class_path.as_path(), 0);
        fs::create_dir_all(dir.parent().unwrap()).unwrap();
        fs::write(dir, b"not a directory").unwrap();
        assert_eq!(hfi.num_units(), 0);
    }

    #[test]
    fn test_port_lid_gated_on_link_state() {
        let (_tmp, hfi) = fake_service();

        // Link down: the lid attribute does not even exist, and must not
        // be touched.
        hfi.write_port_attr(0, 1, "phys_state", "2: Polling\n");
        assert!(matches!(hfi.port_lid(0, 1), Err(Error::LinkDown)));

        hfi.write_port_attr(0, 1, "phys_state", "5: LinkUp\n");
        hfi.write_port_attr(0, 1, "lid", "0x10\n");
        assert_eq!(hfi.port_lid(0, 1).unwrap(), 16);

        // Zero is a valid unassigned LID.
        hfi.write_port_attr(0, 1, "lid", "0\n");
        assert_eq!(hfi.port_lid(0, 1).unwrap(), 0);

        // Absent port is NotFound, not LinkDown.
        assert!(hfi.port_lid(0, 2).unwrap_err().is_not_found());
    }

    #[test]
    fn test_num_contexts() {
        let (_tmp, hfi) = fake_service();
        assert_eq!(hfi.num_contexts(None), 0);

        // Unit 0: link up, 160 contexts.
        hfi.write_unit_attr(0, "nctxts", "160\n");
        hfi.write_port_attr(0, 1, "phys_state", "5: LinkUp\n");
        hfi.write_port_attr(0, 1, "lid", "1\n");

        // Unit 1: link down, never counted.
        hfi.write_unit_attr(1, "nctxts", "160\n");
        hfi.write_port_attr(1, 1, "phys_state", "2: Polling\n");

        assert_eq!(hfi.num_contexts(None), 160);
        assert_eq!(hfi.num_contexts(Some(0)), 160);
        assert_eq!(hfi.num_contexts(Some(1)), 0);
    }

    #[test]
    fn test_num_contexts_skips_unreadable_nctxts() {
        let (_tmp, hfi) = fake_service();

        hfi.write_unit_attr(0, "nctxts", "64\n");
        hfi.write_port_attr(0, 1, "phys_state", "5: LinkUp\n");
        hfi.write_port_attr(0, 1, "lid", "1\n");

        // Unit 1 qualifies but has no readable nctxts; it contributes
        // nothing and does not abort the scan.
        hfi.write_port_attr(1, 1, "phys_state", "5: LinkUp\n");
        hfi.write_port_attr(1, 1, "lid", "2\n");

        assert_eq!(hfi.num_contexts(None), 64);
    }

    #[test]
    fn test_port_gid() {
        let (_tmp, hfi) = fake_service();

        hfi.write_port_attr(0, 1, "gids/0", "fe80:0000:0000:0000:0011:7501:0109:6c2e\n");
        let gid = hfi.port_gid(0, 1).unwrap();
        assert_eq!(gid.hi, 0xfe80_0000_0000_0000);
        assert_eq!(gid.lo, 0x0011_7501_0109_6c2e);

        hfi.write_port_attr(0, 1, "gids/0", "garbage\n");
        assert!(matches!(hfi.port_gid(0, 1), Err(Error::Parse(_))));

        assert!(hfi.port_gid(1, 1).unwrap_err().is_not_found());
    }

    #[test]
    fn test_port_lmc_and_rate() {
        let (_tmp, hfi) = fake_service();

        hfi.write_port_attr(0, 1, "lid_mask_count", "2\n");
        assert_eq!(hfi.port_lmc(0, 1).unwrap(), 2);

        hfi.write_port_attr(0, 1, "rate", "100 Gb/sec (4X EDR)\n");
        assert_eq!(hfi.port_rate(0, 1).unwrap(), 100);

        hfi.write_port_attr(0, 1, "rate", "Gb/sec\n");
        assert!(matches!(hfi.port_rate(0, 1), Err(Error::Parse(_))));
    }

    #[test]
    fn test_rate_prefix_parse() {
        assert_eq!(parse_rate("100 Gb/sec (4X EDR)\n"), Some(100.0));
        assert_eq!(parse_rate("56.25\n"), Some(56.25));
        assert_eq!(parse_rate("0\n"), Some(0.0));
        assert_eq!(parse_rate("Gb/sec"), None);
        assert_eq!(parse_rate(""), None);
    }

    #[test]
    fn test_mapping_lookups() {
        let (_tmp, hfi) = fake_service();

        hfi.write_port_attr(0, 1, "sl2sc/3", "7\n");
        hfi.write_port_attr(0, 1, "sc2vl/7", "1\n");
        hfi.write_port_attr(0, 1, "vl2mtu/1", "8192\n");
        hfi.write_port_attr(0, 1, "pkeys/0", "0x8001\n");

        assert_eq!(hfi.port_sl2sc(0, 1, 3).unwrap(), 7);
        assert_eq!(hfi.port_sc2vl(0, 1, 7).unwrap(), 1);
        assert_eq!(hfi.port_vl2mtu(0, 1, 1).unwrap(), 8192);
        assert_eq!(hfi.port_index2pkey(0, 1, 0).unwrap(), 0x8001);

        assert!(hfi.port_sl2sc(0, 1, 4).unwrap_err().is_not_found());
    }
}
