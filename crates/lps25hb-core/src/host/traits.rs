//! Host subsystem traits

use super::file::FileOperations;
use super::spi::{PeripheralId, SpiPeripheral};
use crate::devnum::DevNum;
use crate::error::Result;
use crate::of::OfDeviceId;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Handle to a device class created by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassHandle(pub u32);

/// Handle to a registered character device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CdevHandle(pub u32);

/// Handle to a device node created through a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(pub u32);

/// An initialised character device, ready for [`CharDevHost::cdev_add`]
///
/// `container` is the object the cdev is embedded in. The host hands it back
/// to [`FileOperations::open`] through the [`Inode`](super::Inode), which is
/// how an open file finds its owning device.
#[derive(Clone)]
pub struct Cdev {
    /// File operations serving this device
    pub ops: &'static dyn FileOperations,
    /// Object owning the cdev
    pub container: Arc<dyn Any + Send + Sync>,
}

impl Cdev {
    /// Equivalent of `cdev_init`
    pub fn new(ops: &'static dyn FileOperations, container: Arc<dyn Any + Send + Sync>) -> Self {
        Self { ops, container }
    }
}

impl fmt::Debug for Cdev {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cdev").finish_non_exhaustive()
    }
}

/// Character-device subsystem
pub trait CharDevHost: Send + Sync {
    /// Reserve `count` device numbers with a dynamically chosen major
    ///
    /// Returns the first number of the region.
    fn alloc_chrdev_region(&self, first_minor: u32, count: u32, name: &str) -> Result<DevNum>;

    /// Release a region reserved by [`alloc_chrdev_region`](Self::alloc_chrdev_region)
    fn unregister_chrdev_region(&self, base: DevNum, count: u32);

    /// Make `cdev` live for `count` numbers starting at `first`
    fn cdev_add(&self, cdev: Cdev, first: DevNum, count: u32) -> Result<CdevHandle>;

    /// Remove a character device added with [`cdev_add`](Self::cdev_add)
    fn cdev_del(&self, cdev: CdevHandle);
}

/// Device class and device-node subsystem
pub trait ClassHost: Send + Sync {
    /// Create a device class visible to user space
    fn class_create(&self, name: &str) -> Result<ClassHandle>;

    /// Destroy a class created with [`class_create`](Self::class_create)
    fn class_destroy(&self, class: ClassHandle);

    /// Create the device node `name` for `devt`, parented to `parent`
    fn device_create(
        &self,
        class: ClassHandle,
        parent: Option<PeripheralId>,
        devt: DevNum,
        name: &str,
    ) -> Result<NodeHandle>;

    /// Destroy the node created for `devt` in `class`
    fn device_destroy(&self, class: ClassHandle, devt: DevNum);
}

/// SPI core
pub trait SpiHost: Send + Sync {
    /// Register a driver; matching peripherals may be probed before this returns
    fn spi_register_driver(&self, driver: Arc<dyn SpiDriver>) -> Result<()>;

    /// Unregister a driver, unbinding every peripheral bound to it
    fn spi_unregister_driver(&self, name: &str);
}

/// Driver side of the SPI core
pub trait SpiDriver: Send + Sync {
    /// Driver name
    fn name(&self) -> &str;

    /// Devicetree match table
    fn of_match_table(&self) -> &[OfDeviceId];

    /// Bind to a matching peripheral
    fn probe(&self, spi: &SpiPeripheral) -> Result<()>;

    /// Unbind from a peripheral previously bound by [`probe`](Self::probe)
    fn remove(&self, spi: &SpiPeripheral) -> Result<()>;
}

/// Everything the driver needs from its host
pub trait Host: CharDevHost + ClassHost + SpiHost {}

impl<T: CharDevHost + ClassHost + SpiHost + ?Sized> Host for T {}
