//! Raw attribute reads against the sysfs class tree and the driver
//! statistics filesystem.
//!
//! This is the primitive layer every resolver builds on. It knows nothing
//! about link state or blob layouts; it only turns attribute files into
//! owned strings, signed 64-bit scalars, or raw byte buffers, and maps I/O
//! failures into the service error taxonomy ("device absent" stays
//! distinguishable from everything else).

use std::fs;
use std::path::{Path, PathBuf};

use super::config::ServiceConfig;
use super::error::{Error, Result};
use super::paths;

pub(crate) struct SysClass {
    class_base: PathBuf,
    hfifs_base: PathBuf,
}

impl SysClass {
    pub(crate) fn new(config: &ServiceConfig) -> Self {
        Self {
            class_base: config.class_path.clone(),
            hfifs_base: config.hfifs_path.clone(),
        }
    }

    #[inline]
    pub(crate) fn class_base(&self) -> &Path {
        &self.class_base
    }

    /// Read a unit-scoped text attribute.
    pub(crate) fn unit_read(&self, unit: u32, attr: &str) -> Result<String> {
        read_text(&paths::unit_attr(&self.class_base, unit, attr))
    }

    /// Read a port-scoped text attribute.
    pub(crate) fn port_read(&self, unit: u32, port: u8, attr: &str) -> Result<String> {
        read_text(&paths::port_attr(&self.class_base, unit, port, attr))
    }

    /// Read a unit-scoped attribute as a signed 64-bit integer.
    pub(crate) fn unit_read_s64(&self, unit: u32, attr: &str) -> Result<i64> {
        parse_s64(&self.unit_read(unit, attr)?)
    }

    /// Read a port-scoped attribute as a signed 64-bit integer.
    pub(crate) fn port_read_s64(&self, unit: u32, port: u8, attr: &str) -> Result<i64> {
        parse_s64(&self.port_read(unit, port, attr)?)
    }

    /// Read a driver-wide stats attribute as text.
    pub(crate) fn hfifs_read(&self, attr: &str) -> Result<String> {
        read_text(&paths::hfifs_attr(&self.hfifs_base, attr))
    }

    /// Read a per-unit stats attribute as text.
    pub(crate) fn hfifs_unit_read(&self, unit: u32, attr: &str) -> Result<String> {
        read_text(&paths::hfifs_unit_attr(&self.hfifs_base, unit, attr))
    }

    /// Read a driver-wide stats attribute as raw bytes.
    pub(crate) fn hfifs_rd(&self, attr: &str) -> Result<Vec<u8>> {
        read_raw(&paths::hfifs_attr(&self.hfifs_base, attr))
    }

    /// Read a per-unit stats attribute as raw bytes.
    pub(crate) fn hfifs_unit_rd(&self, unit: u32, attr: &str) -> Result<Vec<u8>> {
        read_raw(&paths::hfifs_unit_attr(&self.hfifs_base, unit, attr))
    }
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(Error::from_io)
}

fn read_raw(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(Error::from_io)
}

/// Parse an optionally signed 64-bit attribute value.
///
/// Decimal, or hexadecimal with an `0x` prefix (the kernel exports a few
/// attributes, e.g. `lid`, that way).
fn parse_s64(text: &str) -> Result<i64> {
    let trimmed = text.trim();
    let bad = || Error::Parse(format!("bad numeric attribute: {trimmed:?}"));

    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).map_err(|_| bad())?,
        None => digits.parse().map_err(|_| bad())?,
    };
    Ok(if negative { -magnitude } else { magnitude })
}
