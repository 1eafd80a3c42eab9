//! Driver statistics and hardware counters.
//!
//! Names and values live in parallel files: a newline-delimited name list
//! and a flat array of 64-bit values in the same order.

use super::error::Result;
use super::paths;
use super::Hfi;

/// A newline-delimited counter/stat name list.
///
/// The length is the number of newline characters in the blob, so a final
/// unterminated name is not counted: `"a\nb\nc\n"` has three names but
/// `"a\nb\nc"` has two. Value arrays are indexed against this count, so the
/// convention must not change.
#[derive(Debug, Clone)]
pub struct NameList {
    text: String,
}

impl NameList {
    pub(crate) fn new(text: String) -> Self {
        Self { text }
    }

    /// Number of newline-terminated names.
    pub fn len(&self) -> usize {
        self.text.bytes().filter(|&b| b == b'\n').count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The names, in file order. Yields exactly [`NameList::len`] items.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.text.lines().take(self.len())
    }

    /// The raw blob.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Reinterpret a raw byte buffer as native-endian 64-bit counters.
/// A partial trailing element is silently dropped.
fn values_from_bytes(raw: &[u8]) -> Vec<u64> {
    raw.chunks_exact(8)
        .map(|chunk| u64::from_ne_bytes(chunk.try_into().unwrap()))
        .collect()
}

impl Hfi {
    /// Names of the driver-wide statistics.
    pub fn stats_names(&self) -> Result<NameList> {
        self.sysfs.hfifs_read("driver_stats_names").map(NameList::new)
    }

    /// Values of the driver-wide statistics, parallel to
    /// [`Hfi::stats_names`].
    pub fn stats_values(&self) -> Result<Vec<u64>> {
        self.sysfs
            .hfifs_rd("driver_stats")
            .map(|raw| values_from_bytes(&raw))
    }

    /// Names of a unit's counters.
    pub fn counter_names(&self, unit: u32) -> Result<NameList> {
        self.sysfs
            .hfifs_unit_read(unit, "counter_names")
            .map(NameList::new)
    }

    /// Values of a unit's counters, parallel to [`Hfi::counter_names`].
    pub fn counter_values(&self, unit: u32) -> Result<Vec<u64>> {
        self.sysfs
            .hfifs_unit_rd(unit, "counters")
            .map(|raw| values_from_bytes(&raw))
    }

    /// Names of a unit's per-port counters.
    pub fn port_counter_names(&self, unit: u32) -> Result<NameList> {
        self.sysfs
            .hfifs_unit_read(unit, "portcounter_names")
            .map(NameList::new)
    }

    /// Values of one port's counters, parallel to
    /// [`Hfi::port_counter_names`].
    pub fn port_counter_values(&self, unit: u32, port: u8) -> Result<Vec<u64>> {
        self.sysfs
            .hfifs_unit_rd(unit, &paths::port_counters_attr(port))
            .map(|raw| values_from_bytes(&raw))
    }
}
