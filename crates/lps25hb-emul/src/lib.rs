//! lps25hb-emul - In-memory kernel for hosting the LPS25HB driver
//!
//! This crate provides [`EmulatedKernel`], an implementation of the host
//! traits from `lps25hb-core` that keeps every kernel object in memory:
//! device-number regions, classes, device nodes, character devices, an SPI
//! bus with devicetree matching, and a small VFS for opening nodes. It's
//! useful for testing and development without a real kernel.
//!
//! # Example
//!
//! ```ignore
//! use lps25hb_core::{host::FileMode, DriverConfig, DriverRegistry};
//! use lps25hb_emul::{Board, EmulatedKernel};
//! use std::sync::Arc;
//!
//! let kernel = Arc::new(EmulatedKernel::new());
//! kernel.populate(&Board::default())?;
//! let driver = DriverRegistry::init(kernel.clone(), DriverConfig::default())?;
//!
//! let fd = kernel.open("/dev/barometer0", FileMode::READ)?;
//! let mut buf = [0u8; 64];
//! assert_eq!(kernel.read(fd, &mut buf)?, 0);
//! kernel.close(fd)?;
//!
//! driver.exit();
//! assert!(kernel.resources().is_empty());
//! ```

pub mod board;
pub mod kernel;

pub use board::{Board, BoardError, PeripheralDef};
pub use kernel::{EmulatedKernel, Fd, HostOp, NodeInfo, ResourceSummary};

#[cfg(test)]
mod tests;
