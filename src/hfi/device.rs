//! Device node discovery and descriptor management.
//!
//! In a udev-based world there can be an arbitrarily long (typically
//! sub-second) delay between the driver loading and its special files
//! turning up, so opening a unit first waits for the node with bounded
//! fixed-interval polling.

use std::fs::{self, File, OpenOptions};
use std::io::{self, IoSlice, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

use quanta::Instant;

use super::error::{Error, Result};
use super::paths;

/// Budget used when the caller passes [`Timeout::Default`] (or zero).
pub const DEFAULT_WAIT_MS: u64 = 15_000;

/// Fixed polling interval of the device wait loop.
pub const RETRY_INTERVAL_MS: u64 = 250;

const PACKET_POLL_MS: libc::c_int = 500;

/// Wait budget for device-node appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Let the service layer decide; behaves as 15 seconds.
    Default,

    /// Explicit budget in milliseconds. Zero behaves as [`Timeout::Default`].
    Millis(u64),

    /// Wait until the node appears or a signal arrives.
    Infinite,
}

impl Timeout {
    /// The effective budget; `None` means unbounded.
    pub(crate) fn budget_ms(self) -> Option<u64> {
        match self {
            Timeout::Default | Timeout::Millis(0) => Some(DEFAULT_WAIT_MS),
            Timeout::Millis(ms) => Some(ms),
            Timeout::Infinite => None,
        }
    }
}

/// Poll until `path` exists.
///
/// Existence, or any probe failure other than not-found, is terminal; the
/// latter is reported as-is. Exhausting the budget is [`Error::TimedOut`],
/// and a signal interrupting the retry sleep is [`Error::Interrupted`], so
/// callers can tell "retry with a larger budget" from "fatal".
pub fn wait_for_device(path: &Path, timeout: Timeout) -> Result<()> {
    let budget = timeout.budget_ms();
    let started = Instant::now();
    let mut elapsed: u64 = 0;

    loop {
        match fs::metadata(path) {
            Ok(_) => {
                log::debug!(
                    "found {} after {:.1} seconds",
                    path.display(),
                    started.elapsed().as_secs_f64()
                );
                return Ok(());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                log::info!(
                    "the {} device failed to appear after {:.1} seconds: {}",
                    path.display(),
                    started.elapsed().as_secs_f64(),
                    e
                );
                return Err(Error::from_io(e));
            }
        }

        if let Some(budget) = budget {
            if elapsed >= budget {
                log::info!(
                    "the {} device failed to appear after {:.1} seconds: timed out",
                    path.display(),
                    started.elapsed().as_secs_f64()
                );
                return Err(Error::TimedOut);
            }
        }

        if elapsed == 0 {
            match budget {
                Some(ms) => log::debug!(
                    "device file {} not present on first check; waiting up to {:.1} seconds",
                    path.display(),
                    ms as f64 / 1e3
                ),
                None => log::debug!(
                    "device file {} not present on first check; waiting indefinitely",
                    path.display()
                ),
            }
        }

        let ms = match budget {
            Some(budget) if budget - elapsed < RETRY_INTERVAL_MS => budget - elapsed,
            _ => RETRY_INTERVAL_MS,
        };
        elapsed += ms;

        sleep_ms(ms).map_err(|e| {
            log::info!(
                "the {} device failed to appear after {:.1} seconds: {}",
                path.display(),
                started.elapsed().as_secs_f64(),
                e
            );
            Error::from_io(e)
        })?;
    }
}

/// Sleep that surfaces signal interruption instead of silently resuming.
fn sleep_ms(ms: u64) -> io::Result<()> {
    let req = libc::timespec {
        tv_sec: (ms / 1000) as libc::time_t,
        tv_nsec: ((ms % 1000) * 1_000_000) as libc::c_long,
    };

    // SAFETY: FFI; `req` outlives the call and `rem` may be null.
    let ret = unsafe { libc::nanosleep(&req, std::ptr::null_mut()) };
    if ret == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// An opened fabric device node.
///
/// The descriptor is exclusively owned; dropping the value closes it. Raw
/// command writes and mappings are forwarded verbatim, their payloads are
/// the driver's business.
#[derive(Debug)]
pub struct Device {
    file: File,
    path: PathBuf,
}

impl Device {
    /// Wait for the device node of `unit` (`None` = any unit) and open it
    /// read-write.
    ///
    /// The descriptor is marked close-on-exec; failure to mark it is logged
    /// and ignored.
    pub fn open(dev_base: &Path, unit: Option<u32>, timeout: Timeout) -> Result<Self> {
        let path = paths::device(dev_base, unit);

        wait_for_device(&path, timeout).map_err(|e| {
            log::debug!("could not find a fabric unit on device {}", path.display());
            e
        })?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| {
                log::debug!("cannot open {} for reading and writing", path.display());
                Error::from_io(e)
            })?;

        // SAFETY: FFI on an owned, valid descriptor.
        let ret = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_SETFD, libc::FD_CLOEXEC) };
        if ret == -1 {
            log::info!(
                "failed to set close-on-exec for device: {}",
                io::Error::last_os_error()
            );
        }

        Ok(Self { file, path })
    }

    /// The node this device was opened from.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Explicitly close the device. Equivalent to dropping it.
    #[inline]
    pub fn close(self) {}

    /// Forward a raw command buffer to the driver.
    pub fn cmd_write(&self, cmd: &[u8]) -> Result<usize> {
        (&self.file).write(cmd).map_err(Error::from_io)
    }

    /// Forward a vector of raw command buffers to the driver.
    pub fn cmd_writev(&self, bufs: &[IoSlice<'_>]) -> Result<usize> {
        (&self.file).write_vectored(bufs).map_err(Error::from_io)
    }

    /// Map device memory.
    ///
    /// # Safety
    ///
    /// Plain `mmap` forwarding; the caller owns the mapping and all aliasing
    /// and lifetime obligations that come with it.
    pub unsafe fn mmap(
        &self,
        addr: *mut libc::c_void,
        length: usize,
        prot: libc::c_int,
        flags: libc::c_int,
        offset: u64,
    ) -> Result<*mut libc::c_void> {
        let ptr = libc::mmap(
            addr,
            length,
            prot,
            flags,
            self.file.as_raw_fd(),
            offset as libc::off_t,
        );
        if ptr == libc::MAP_FAILED {
            return Err(Error::from_io(io::Error::last_os_error()));
        }
        Ok(ptr)
    }

    /// Block until the device is readable, for at most 500 ms.
    ///
    /// Returns `Ok(true)` when a packet is ready and `Ok(false)` on timeout.
    /// Diagnostic use only.
    pub fn wait_for_packet(&self) -> Result<bool> {
        let mut pfd = libc::pollfd {
            fd: self.file.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };

        // SAFETY: FFI; `pfd` is valid for the duration of the call.
        let ret = unsafe { libc::poll(&mut pfd, 1, PACKET_POLL_MS) };
        match ret {
            -1 => Err(Error::from_io(io::Error::last_os_error())),
            0 => Ok(false),
            _ => Ok(true),
        }
    }
}

impl AsRawFd for Device {
    #[inline]
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}
