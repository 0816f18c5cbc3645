//! lps25hb-core - Driver core for the LPS25HB SPI barometer
//!
//! This crate contains the driver side of a Linux-style SPI character-device
//! driver for the ST LPS25HB pressure sensor. The host kernel is abstracted
//! behind the traits in [`host`], so the same driver code can be bound to a
//! real kernel integration or to the in-memory kernel in `lps25hb-emul`.
//!
//! The driver registers interest in devicetree nodes compatible with
//! `"mr,lps25hb"` and exposes one `/dev/barometerN` node per bound peripheral.
//! Reads are a stub: they log the cached reading and return end-of-stream.
//!
//! # Example
//!
//! ```ignore
//! use lps25hb_core::{DriverConfig, DriverRegistry};
//!
//! fn load<H: lps25hb_core::host::Host + 'static>(host: std::sync::Arc<H>) {
//!     let registry = DriverRegistry::init(host, DriverConfig::default()).unwrap();
//!     println!("device numbers start at {}", registry.device_number_base());
//!     registry.exit();
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod devnum;
pub mod driver;
pub mod error;
pub mod host;
pub mod of;

pub use config::{DriverConfig, ModuleInfo, MODULE_INFO};
pub use devnum::DevNum;
pub use driver::{DeviceRecord, DriverRegistry};
pub use error::{Error, Result};
pub use of::{OfDeviceId, LPS25HB_OF_MATCH};
