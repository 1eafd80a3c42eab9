//! A user-space service layer for host fabric interface (HFI) devices.
//!
//! The kernel driver exposes each fabric adapter as a character device node
//! plus a sysfs-style tree of attribute files. `opafab` sits between those
//! raw interfaces and higher-level fabric software (message-passing
//! runtimes and the like), turning them into typed queries: unit and port
//! topology, link-gated addressing (LID/GID/LMC/rate), SL/SC/VL mapping
//! tables, congestion-control blobs, and driver counters.
//!
//! Device nodes appear asynchronously after the driver loads, so opening a
//! unit tolerates that race with a bounded polling wait ([`wait_for_device`],
//! [`Timeout`]). Attribute queries distinguish "not present" (a normal
//! topology fact, e.g. the second port of single-port silicon) from genuine
//! I/O errors; see [`Error`].
//!
//! # Example
//!
//! ```no_run
//! use opafab::{Hfi, Timeout};
//!
//! fn main() -> opafab::Result<()> {
//!     let hfi = Hfi::new();
//!     println!("{} unit(s), {} context(s)", hfi.num_units(), hfi.num_contexts(None));
//!
//!     let device = hfi.open_device(Some(0), Timeout::Default)?;
//!     let lid = hfi.port_lid(0, 1)?;
//!     println!("unit 0 port 1: LID {lid} on {}", device.path().display());
//!     Ok(())
//! }
//! ```

mod hfi;

pub use hfi::{
    wait_for_device, CcSettings, CcTable, Device, Error, Gid, Hfi, NameList, Result,
    ServiceConfig, Timeout, CC_NUM_SLS, CC_SETTINGS_LEN, DEFAULT_WAIT_MS, MAX_PORT,
    RETRY_INTERVAL_MS,
};
