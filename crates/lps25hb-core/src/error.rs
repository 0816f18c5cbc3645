//! Error types for lps25hb-core
//!
//! Every error carries a kernel errno so it can be handed back to a host
//! framework as a negative return code.

use thiserror::Error;

/// Kernel errno values used by the driver
pub mod errno {
    /// Operation not permitted
    pub const EPERM: i32 = 1;
    /// No such device or address
    pub const ENXIO: i32 = 6;
    /// Bad file descriptor
    pub const EBADF: i32 = 9;
    /// Out of memory
    pub const ENOMEM: i32 = 12;
    /// Device or resource busy
    pub const EBUSY: i32 = 16;
    /// File exists
    pub const EEXIST: i32 = 17;
    /// No such device
    pub const ENODEV: i32 = 19;
    /// Invalid argument
    pub const EINVAL: i32 = 22;
    /// No space left on device
    pub const ENOSPC: i32 = 28;
}

/// Driver error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Allocation of driver private data failed
    #[error("out of memory")]
    OutOfMemory,

    /// Operation not allowed, e.g. opening the node for writing
    #[error("operation not permitted")]
    PermissionDenied,

    /// The device is not bound or no longer exists
    #[error("no such device")]
    NoDevice,

    /// No character device registered for the device number
    #[error("no such device or address")]
    NoDeviceOrAddress,

    /// Resource is already in use
    #[error("device or resource busy")]
    Busy,

    /// A resource with the same name already exists
    #[error("already exists")]
    AlreadyExists,

    /// All device-number slots are in use
    #[error("device capacity exceeded (max {max} devices)")]
    CapacityExceeded {
        /// Configured device limit
        max: u32,
    },

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// File handle is not associated with a device
    #[error("bad file descriptor")]
    BadFile,

    /// Raw errno reported by the host
    #[error("host error {0}")]
    Errno(i32),
}

impl Error {
    /// Negative errno for this error, as returned to a kernel caller
    pub fn to_errno(&self) -> i32 {
        -match self {
            Self::OutOfMemory => errno::ENOMEM,
            Self::PermissionDenied => errno::EPERM,
            Self::NoDevice => errno::ENODEV,
            Self::NoDeviceOrAddress => errno::ENXIO,
            Self::Busy => errno::EBUSY,
            Self::AlreadyExists => errno::EEXIST,
            Self::CapacityExceeded { .. } => errno::ENOSPC,
            Self::InvalidArgument(_) => errno::EINVAL,
            Self::BadFile => errno::EBADF,
            Self::Errno(code) => code.saturating_abs(),
        }
    }

    /// Convert a host return code (negative or positive errno) into an error
    pub fn from_errno(code: i32) -> Self {
        match code.saturating_abs() {
            errno::ENOMEM => Self::OutOfMemory,
            errno::EPERM => Self::PermissionDenied,
            errno::ENODEV => Self::NoDevice,
            errno::ENXIO => Self::NoDeviceOrAddress,
            errno::EBUSY => Self::Busy,
            errno::EEXIST => Self::AlreadyExists,
            errno::EBADF => Self::BadFile,
            errno::EINVAL => Self::InvalidArgument("host rejected argument".into()),
            other => Self::Errno(other),
        }
    }
}

/// Result type alias using the driver Error type
pub type Result<T> = core::result::Result<T, Error>;
