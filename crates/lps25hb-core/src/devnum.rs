//! Character device numbers
//!
//! A [`DevNum`] packs a 12-bit major and a 20-bit minor into a `u32`, the
//! same layout the kernel uses for its internal `dev_t`.

use core::fmt;

/// Number of bits used for the minor number
pub const MINORBITS: u32 = 20;
/// Mask selecting the minor number
pub const MINORMASK: u32 = (1 << MINORBITS) - 1;
/// Largest valid major number
pub const MAX_MAJOR: u32 = (1 << (32 - MINORBITS)) - 1;

/// Device number (major:minor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DevNum(u32);

impl DevNum {
    /// Build a device number from major and minor (`MKDEV`)
    pub const fn new(major: u32, minor: u32) -> Self {
        Self((major << MINORBITS) | (minor & MINORMASK))
    }

    /// Wrap a raw `dev_t` value
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw `dev_t` value
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Major number (`MAJOR`)
    pub const fn major(self) -> u32 {
        self.0 >> MINORBITS
    }

    /// Minor number (`MINOR`)
    pub const fn minor(self) -> u32 {
        self.0 & MINORMASK
    }

    /// Device number `n` slots after this one
    pub const fn offset(self, n: u32) -> Self {
        Self(self.0 + n)
    }

    /// Whether this number lies in the `count` slots starting at `base`
    pub fn in_range(self, base: DevNum, count: u32) -> bool {
        self.0 >= base.0 && (self.0 - base.0) < count
    }
}

impl fmt::Display for DevNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major(), self.minor())
    }
}
