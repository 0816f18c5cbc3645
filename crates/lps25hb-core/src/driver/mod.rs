//! The LPS25HB driver
//!
//! - [`DriverRegistry`] is the module context: it owns the device-number
//!   region and the device class for the lifetime of the module, and is the
//!   [`SpiDriver`](crate::host::SpiDriver) registered with the SPI core.
//! - [`DeviceRecord`] is created per bound peripheral and is the object the
//!   character device is embedded in.
//! - [`BarometerFile`] implements the file operations of `/dev/barometerN`.

mod fops;
mod record;
mod registry;

pub use fops::{BarometerFile, BAROMETER_FOPS};
pub use record::DeviceRecord;
pub use registry::DriverRegistry;
