//! Host kernel interface
//!
//! The driver never talks to a kernel directly. It is written against the
//! traits in this module, which cover the three subsystems it binds to:
//!
//! - [`CharDevHost`]: device-number regions and `cdev` registration
//! - [`ClassHost`]: device classes and the user-visible device nodes
//! - [`SpiHost`]: SPI driver registration and devicetree matching
//!
//! Callbacks flow the other way through [`SpiDriver`] (bind/unbind) and
//! [`FileOperations`] (open/read/release). Hosts decide on which thread
//! these run; the driver only assumes that each call is synchronous.

mod file;
mod spi;
mod traits;

pub use file::{File, FileMode, FileOperations, Inode};
pub use spi::{PeripheralId, SpiMode, SpiPeripheral};
pub use traits::{
    Cdev, CdevHandle, CharDevHost, ClassHandle, ClassHost, Host, NodeHandle, SpiDriver, SpiHost,
};
