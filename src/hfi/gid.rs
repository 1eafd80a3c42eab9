use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::Error;

/// A 128-bit identifier of a port on the fabric, kept as the two 64-bit
/// halves higher-level software consumes.
///
/// The sysfs text form is eight colon-separated hexadecimal groups of up to
/// four digits each. Group 0 lands in bits 48..=63 of `hi`, group 3 in bits
/// 0..=15 of `hi`, and groups 4..=7 fill `lo` the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gid {
    pub hi: u64,
    pub lo: u64,
}

impl Gid {
    #[inline]
    pub const fn new(hi: u64, lo: u64) -> Self {
        Self { hi, lo }
    }

    /// The eight 16-bit groups, in text order.
    fn groups(&self) -> [u16; 8] {
        let mut groups = [0u16; 8];
        for (i, g) in groups.iter_mut().enumerate() {
            let half = if i < 4 { self.hi } else { self.lo };
            *g = (half >> (48 - 16 * (i % 4))) as u16;
        }
        groups
    }
}

impl FromStr for Gid {
    type Err = Error;

    /// Parse the canonical colon-hex form.
    ///
    /// Exactly eight groups are required; anything else is a parse failure,
    /// never a partial result.
    fn from_str(s: &str) -> Result<Self, Error> {
        let bad = || Error::Parse(format!("bad GID text: {:?}", s.trim()));

        let mut parts = s.trim().split(':');
        let mut groups = [0u16; 8];
        for g in groups.iter_mut() {
            let part = parts.next().ok_or_else(bad)?;
            if part.is_empty() || part.len() > 4 {
                return Err(bad());
            }
            *g = u16::from_str_radix(part, 16).map_err(|_| bad())?;
        }
        if parts.next().is_some() {
            return Err(bad());
        }

        let pack = |g: &[u16]| {
            ((g[0] as u64) << 48) | ((g[1] as u64) << 32) | ((g[2] as u64) << 16) | (g[3] as u64)
        };
        Ok(Gid::new(pack(&groups[..4]), pack(&groups[4..])))
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let g = self.groups();
        write!(
            f,
            "{:04x}:{:04x}:{:04x}:{:04x}:{:04x}:{:04x}:{:04x}:{:04x}",
            g[0], g[1], g[2], g[3], g[4], g[5], g[6], g[7]
        )
    }
}

impl From<[u8; 16]> for Gid {
    #[inline]
    fn from(raw: [u8; 16]) -> Self {
        let hi = u64::from_be_bytes(raw[..8].try_into().unwrap());
        let lo = u64::from_be_bytes(raw[8..].try_into().unwrap());
        Self { hi, lo }
    }
}

impl From<Gid> for [u8; 16] {
    #[inline]
    fn from(gid: Gid) -> Self {
        let mut raw = [0u8; 16];
        raw[..8].copy_from_slice(&gid.hi.to_be_bytes());
        raw[8..].copy_from_slice(&gid.lo.to_be_bytes());
        raw
    }
}

impl From<Ipv6Addr> for Gid {
    #[inline]
    fn from(addr: Ipv6Addr) -> Self {
        Self::from(addr.octets())
    }
}

impl From<Gid> for Ipv6Addr {
    #[inline]
    fn from(gid: Gid) -> Self {
        Ipv6Addr::from(<[u8; 16]>::from(gid))
    }
}
