use std::io;

use thiserror::Error;

/// Service-layer error type.
///
/// The fabric control plane distinguishes three kinds of failure: expected
/// absence (a unit, port or attribute that simply is not there), genuine I/O
/// or parse errors, and resource exhaustion. Resolvers that scan multiple
/// sub-items treat [`Error::NotFound`] and [`Error::LinkDown`] as "this item
/// contributes nothing" and keep going.
#[derive(Debug, Error)]
pub enum Error {
    /// The device node, unit directory or attribute file does not exist.
    #[error("device or attribute not found")]
    NotFound,

    /// The device node did not appear within the wait budget.
    #[error("timed out waiting for device")]
    TimedOut,

    /// The caller may not access the device or attribute.
    #[error("permission denied")]
    PermissionDenied,

    /// Attribute contents did not match the expected text format.
    #[error("parse error: {0}")]
    Parse(String),

    /// Allocation failure while sizing the congestion-control table.
    #[error("out of memory")]
    OutOfMemory,

    /// A signal interrupted a blocking wait.
    #[error("interrupted")]
    Interrupted,

    /// The physical link of the queried port is not up, so its addressing
    /// attributes are meaningless.
    #[error("link is not up")]
    LinkDown,

    /// Any other I/O error.
    #[error(transparent)]
    Io(io::Error),
}

impl Error {
    /// Classify an `io::Error` into the service taxonomy.
    ///
    /// `ENODEV` folds into [`Error::NotFound`]: a vanished device and a
    /// missing attribute file mean the same thing to every caller here.
    pub(crate) fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Error::NotFound,
            io::ErrorKind::PermissionDenied => Error::PermissionDenied,
            io::ErrorKind::Interrupted => Error::Interrupted,
            _ if err.raw_os_error() == Some(libc::ENODEV) => Error::NotFound,
            _ => Error::Io(err),
        }
    }

    /// Whether this error means the device or attribute simply is not there.
    ///
    /// Such failures are normal topology facts, e.g. probing the second port
    /// of single-port silicon.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::from_io(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
