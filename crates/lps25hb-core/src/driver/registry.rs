//! Module context: load/unload and bind/unbind
//!
//! [`DriverRegistry::init`] is the module init hook and
//! [`DriverRegistry::exit`] the exit hook. Between the two, the registry is
//! registered with the SPI core as the driver for `"mr,lps25hb"` and receives
//! [`probe`](SpiDriver::probe) and [`remove`](SpiDriver::remove) callbacks.
//!
//! Each acquisition is paired with a release that runs when a later step
//! fails, so a failed load or a failed bind leaves nothing behind.

use super::fops::BAROMETER_FOPS;
use super::record::DeviceRecord;
use crate::config::DriverConfig;
use crate::devnum::DevNum;
use crate::error::{Error, Result};
use crate::host::{Cdev, ClassHandle, Host, PeripheralId, SpiDriver, SpiPeripheral};
use crate::of::{OfDeviceId, LPS25HB_OF_MATCH};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Bind bookkeeping guarded by the registry mutex
#[derive(Debug, Default)]
struct BindState {
    /// Number of successful binds since load, never decremented
    device_count: u32,
    /// Records of currently bound peripherals (the drvdata)
    records: HashMap<PeripheralId, Arc<DeviceRecord>>,
}

/// The LPS25HB driver module
pub struct DriverRegistry<H: Host + ?Sized + 'static> {
    host: Arc<H>,
    config: DriverConfig,
    device_number_base: DevNum,
    device_class: ClassHandle,
    state: Mutex<BindState>,
    unloaded: AtomicBool,
}

impl<H: Host + ?Sized + 'static> DriverRegistry<H> {
    /// Load the driver into `host`
    ///
    /// Reserves `max_devices` device numbers, creates the device class and
    /// registers the SPI driver, in that order. Peripherals already known to
    /// the host may be bound before this returns.
    pub fn init(host: Arc<H>, config: DriverConfig) -> Result<Arc<Self>> {
        config.validate()?;

        let base = host
            .alloc_chrdev_region(config.first_minor, config.max_devices, &config.region_name)
            .map_err(|e| {
                log::error!("alloc chrdev region failed");
                e
            })?;
        log::debug!(
            "reserved {} device numbers at {} for {}",
            config.max_devices,
            base,
            config.region_name
        );

        let class = match host.class_create(&config.class_name) {
            Ok(class) => class,
            Err(e) => {
                log::error!("error while creating {} class", config.class_name);
                host.unregister_chrdev_region(base, config.max_devices);
                return Err(e);
            }
        };

        let registry = Arc::new(Self {
            host: Arc::clone(&host),
            config,
            device_number_base: base,
            device_class: class,
            state: Mutex::new(BindState::default()),
            unloaded: AtomicBool::new(false),
        });

        if let Err(e) = host.spi_register_driver(registry.clone()) {
            log::error!("error while registering spi driver for lps25hb");
            // Anything probed during the failed registration goes with it
            registry.release_all_records();
            host.class_destroy(class);
            host.unregister_chrdev_region(base, registry.config.max_devices);
            return Err(e);
        }

        log::info!("spi driver for lps25hb registered");
        Ok(registry)
    }

    /// Unload the driver
    ///
    /// Unregisters the SPI driver (which unbinds every bound peripheral),
    /// destroys the class and releases the device-number region. Calling
    /// this more than once has no further effect.
    pub fn exit(&self) {
        if self.unloaded.swap(true, Ordering::AcqRel) {
            log::debug!("{} already unloaded", self.config.driver_name);
            return;
        }

        self.host.spi_unregister_driver(&self.config.driver_name);
        self.release_all_records();
        self.host.class_destroy(self.device_class);
        self.host
            .unregister_chrdev_region(self.device_number_base, self.config.max_devices);
        log::info!("spi driver for lps25hb unregistered");
    }

    /// First device number of the reserved region
    pub fn device_number_base(&self) -> DevNum {
        self.device_number_base
    }

    /// Class the device nodes are created in
    pub fn device_class(&self) -> ClassHandle {
        self.device_class
    }

    /// Successful binds since load
    pub fn device_count(&self) -> u32 {
        self.lock_state().device_count
    }

    /// Configuration the driver was loaded with
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Whether [`exit`](Self::exit) has run
    pub fn is_unloaded(&self) -> bool {
        self.unloaded.load(Ordering::Acquire)
    }

    /// Record of the device bound to `peripheral`
    pub fn record(&self, peripheral: PeripheralId) -> Option<Arc<DeviceRecord>> {
        self.lock_state().records.get(&peripheral).cloned()
    }

    /// Records of all bound devices, ordered by bind index
    pub fn records(&self) -> Vec<Arc<DeviceRecord>> {
        let mut records: Vec<_> = self.lock_state().records.values().cloned().collect();
        records.sort_by_key(|r| r.index());
        records
    }

    fn lock_state(&self) -> MutexGuard<'_, BindState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Destroy the node and delete the char device of `record`
    fn release_record(&self, record: &DeviceRecord) {
        if record.node().is_some() {
            self.host
                .device_destroy(self.device_class, record.device_number());
        }
        if let Some(cdev) = record.cdev() {
            self.host.cdev_del(cdev);
        }
    }

    /// Tear down records the host did not unbind
    fn release_all_records(&self) {
        let leftovers: Vec<_> = self.lock_state().records.drain().map(|(_, r)| r).collect();
        for record in leftovers {
            log::warn!(
                "{}: still bound at unload, releasing {}",
                record.peripheral_name(),
                record.node_name()
            );
            self.release_record(&record);
        }
    }
}

impl<H: Host + ?Sized + 'static> SpiDriver for DriverRegistry<H> {
    fn name(&self) -> &str {
        &self.config.driver_name
    }

    fn of_match_table(&self) -> &[OfDeviceId] {
        LPS25HB_OF_MATCH
    }

    fn probe(&self, spi: &SpiPeripheral) -> Result<()> {
        log::info!("{}: probe called", spi.name());

        let mut state = self.lock_state();

        // exit drains the table under this lock after setting the flag
        if self.is_unloaded() {
            log::error!("{}: driver is unloading", spi.name());
            return Err(Error::NoDevice);
        }

        if state.records.contains_key(&spi.id()) {
            log::error!("{}: already bound", spi.name());
            return Err(Error::Busy);
        }

        let index = state.device_count;
        if self.config.enforce_capacity && index >= self.config.max_devices {
            log::error!(
                "{}: all {} device numbers in use",
                spi.name(),
                self.config.max_devices
            );
            return Err(Error::CapacityExceeded {
                max: self.config.max_devices,
            });
        }

        // Record allocation is the only allocation a bind makes; report its
        // failure as -ENOMEM with the private-data diagnostic
        if state.records.try_reserve(1).is_err() {
            log::error!("{}: error while allocating device private data", spi.name());
            return Err(Error::OutOfMemory);
        }

        let devt = self.device_number_base.offset(index);
        let record = Arc::new(DeviceRecord::new(
            devt,
            index,
            self.config.node_name(index),
            spi.id(),
            spi.name(),
        ));

        let cdev = Cdev::new(&BAROMETER_FOPS, record.clone());
        let cdev = self.host.cdev_add(cdev, devt, 1).map_err(|e| {
            log::error!("{}: cdev add failed", spi.name());
            e
        })?;

        let node = match self.host.device_create(
            self.device_class,
            Some(spi.id()),
            devt,
            record.node_name(),
        ) {
            Ok(node) => node,
            Err(e) => {
                log::error!("{}: error while creating device", spi.name());
                self.host.cdev_del(cdev);
                return Err(e);
            }
        };

        record.attach(cdev, node);
        log::debug!(
            "{}: bound as /dev/{} ({})",
            spi.name(),
            record.node_name(),
            devt
        );
        state.records.insert(spi.id(), record);
        state.device_count += 1;

        Ok(())
    }

    fn remove(&self, spi: &SpiPeripheral) -> Result<()> {
        log::info!("remove called");

        let record = self
            .lock_state()
            .records
            .remove(&spi.id())
            .ok_or(Error::NoDevice)?;
        self.release_record(&record);
        log::debug!("{}: released /dev/{}", spi.name(), record.node_name());
        Ok(())
    }
}
