//! The emulated kernel
//!
//! All kernel objects live in one table behind a mutex. The mutex is never
//! held while a driver callback runs, so probe/remove may call back into the
//! char-device and class subsystems, and open/read/release may take as long
//! as they like.

use lps25hb_core::host::{
    Cdev, CdevHandle, CharDevHost, ClassHandle, ClassHost, File, FileMode, FileOperations, Inode,
    NodeHandle, PeripheralId, SpiDriver, SpiHost, SpiPeripheral,
};
use lps25hb_core::of::of_match_device;
use lps25hb_core::{devnum::MINORMASK, DevNum, Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::board::{Board, PeripheralDef};

/// Dynamic char majors, searched in this order (as `alloc_chrdev_region` does)
const DYNAMIC_MAJORS: [std::ops::RangeInclusive<u32>; 2] = [234..=254, 384..=511];

/// Host operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOp {
    /// `alloc_chrdev_region`
    AllocChrdevRegion,
    /// `cdev_add`
    CdevAdd,
    /// `class_create`
    ClassCreate,
    /// `device_create`
    DeviceCreate,
    /// `spi_register_driver`
    SpiRegisterDriver,
}

/// Open file descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fd(pub u32);

impl fmt::Display for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fd{}", self.0)
    }
}

/// A device node as listed under `/dev`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    /// Node name (`/dev/<name>`)
    pub name: String,
    /// Device number
    pub devt: DevNum,
    /// Name of the class the node belongs to
    pub class: String,
    /// Name of the parent peripheral, if any
    pub parent: Option<String>,
}

/// Count of live kernel objects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceSummary {
    /// Reserved char-device regions
    pub regions: usize,
    /// Device classes
    pub classes: usize,
    /// Registered character devices
    pub cdevs: usize,
    /// Device nodes
    pub nodes: usize,
    /// Registered SPI drivers
    pub drivers: usize,
    /// Open files
    pub open_files: usize,
}

impl ResourceSummary {
    /// Whether no driver-owned object is left (peripherals don't count)
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for ResourceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} regions, {} classes, {} cdevs, {} nodes, {} drivers, {} open files",
            self.regions, self.classes, self.cdevs, self.nodes, self.drivers, self.open_files
        )
    }
}

#[derive(Debug)]
struct RegionEntry {
    base: DevNum,
    count: u32,
    name: String,
}

#[derive(Debug)]
struct CdevEntry {
    first: DevNum,
    count: u32,
    cdev: Cdev,
}

#[derive(Debug)]
struct NodeEntry {
    handle: NodeHandle,
    class: ClassHandle,
    devt: DevNum,
    parent: Option<PeripheralId>,
}

#[derive(Debug)]
struct PeripheralEntry {
    spi: SpiPeripheral,
    driver: Option<String>,
}

struct OpenFile {
    file: File,
    inode: Inode,
    ops: &'static dyn FileOperations,
}

#[derive(Default)]
struct KernelState {
    next_handle: u32,
    regions: Vec<RegionEntry>,
    cdevs: BTreeMap<u32, CdevEntry>,
    classes: BTreeMap<u32, String>,
    nodes: BTreeMap<String, NodeEntry>,
    drivers: Vec<Arc<dyn SpiDriver>>,
    peripherals: BTreeMap<PeripheralId, PeripheralEntry>,
    next_peripheral: u32,
    files: BTreeMap<Fd, Arc<Mutex<OpenFile>>>,
    next_fd: u32,
}

impl KernelState {
    fn alloc_handle(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    fn major_in_use(&self, major: u32) -> bool {
        self.regions.iter().any(|r| r.base.major() == major)
    }

    fn find_dynamic_major(&self) -> Option<u32> {
        DYNAMIC_MAJORS
            .iter()
            .flat_map(|range| range.clone().rev())
            .find(|&major| !self.major_in_use(major))
    }

    fn cdev_for(&self, devt: DevNum) -> Option<&CdevEntry> {
        self.cdevs.values().find(|c| devt.in_range(c.first, c.count))
    }

    fn matching_driver(&self, spi: &SpiPeripheral) -> Option<Arc<dyn SpiDriver>> {
        self.drivers
            .iter()
            .find(|d| of_match_device(d.of_match_table(), spi.compatible()).is_some())
            .cloned()
    }
}

/// In-memory kernel implementing the host traits
#[derive(Default)]
pub struct EmulatedKernel {
    state: Mutex<KernelState>,
    faults: Mutex<HashMap<HostOp, Error>>,
}

impl EmulatedKernel {
    /// Create an empty kernel: no peripherals, no drivers
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, KernelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next call of `op` fail with `error`
    pub fn fail_next(&self, op: HostOp, error: Error) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(op, error);
    }

    fn check_fault(&self, op: HostOp) -> Result<()> {
        match self
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&op)
        {
            Some(error) => {
                log::debug!("injected fault in {:?}: {}", op, error);
                Err(error)
            }
            None => Ok(()),
        }
    }

    // =========================================================================
    // SPI bus
    // =========================================================================

    /// Plug a peripheral into the bus and bind it if a driver matches
    ///
    /// A failed probe leaves the peripheral present but unbound.
    pub fn add_peripheral(&self, def: &PeripheralDef) -> Result<PeripheralId> {
        let id = {
            let mut state = self.lock();
            let taken = state
                .peripherals
                .values()
                .any(|p| p.spi.bus_num() == def.bus && p.spi.chip_select() == def.chip_select);
            if taken {
                return Err(Error::AlreadyExists);
            }

            let id = PeripheralId(state.next_peripheral);
            state.next_peripheral += 1;
            let spi = def.to_peripheral(id);
            log::debug!("{}: added ({:?})", spi.name(), spi.compatible());
            state
                .peripherals
                .insert(id, PeripheralEntry { spi, driver: None });
            id
        };

        if let Err(e) = self.bind(id) {
            log::debug!("spi peripheral {:?} left unbound: {}", id, e);
        }
        Ok(id)
    }

    /// Add every peripheral of `board`
    pub fn populate(&self, board: &Board) -> Result<Vec<PeripheralId>> {
        log::debug!(
            "populating board '{}' ({} peripherals)",
            board.display_name(),
            board.peripherals.len()
        );
        board
            .peripherals
            .iter()
            .map(|def| self.add_peripheral(def))
            .collect()
    }

    /// Unplug a peripheral, unbinding it first
    pub fn remove_peripheral(&self, id: PeripheralId) -> Result<()> {
        if self.bound_driver(id).is_some() {
            // remove errors don't stop the unplug
            let _ = self.unbind(id);
        }
        self.lock()
            .peripherals
            .remove(&id)
            .map(|_| ())
            .ok_or(Error::NoDevice)
    }

    /// Bind a peripheral to the first matching driver
    pub fn bind(&self, id: PeripheralId) -> Result<()> {
        let (spi, driver) = {
            let state = self.lock();
            let entry = state.peripherals.get(&id).ok_or(Error::NoDevice)?;
            if entry.driver.is_some() {
                return Err(Error::Busy);
            }
            let driver = state.matching_driver(&entry.spi).ok_or(Error::NoDevice)?;
            (entry.spi.clone(), driver)
        };
        self.probe_with(&spi, driver)
    }

    fn probe_with(&self, spi: &SpiPeripheral, driver: Arc<dyn SpiDriver>) -> Result<()> {
        if let Err(e) = driver.probe(spi) {
            log::warn!(
                "{}: probe of {} failed with error {}",
                driver.name(),
                spi.name(),
                e.to_errno()
            );
            return Err(e);
        }

        let registered = {
            let mut state = self.lock();
            let registered = state.drivers.iter().any(|d| d.name() == driver.name());
            if registered {
                if let Some(entry) = state.peripherals.get_mut(&spi.id()) {
                    entry.driver = Some(driver.name().to_string());
                }
            }
            registered
        };

        if !registered {
            // Unregistered while probing: nothing will unbind this later
            log::warn!(
                "{}: driver {} unregistered during probe",
                spi.name(),
                driver.name()
            );
            let _ = driver.remove(spi);
            return Err(Error::NoDevice);
        }
        Ok(())
    }

    /// Unbind a peripheral from its driver
    pub fn unbind(&self, id: PeripheralId) -> Result<()> {
        let (spi, driver) = {
            let mut state = self.lock();
            let entry = state.peripherals.get_mut(&id).ok_or(Error::NoDevice)?;
            let name = entry.driver.take().ok_or(Error::NoDevice)?;
            let spi = entry.spi.clone();
            let driver = state
                .drivers
                .iter()
                .find(|d| d.name() == name)
                .cloned()
                .ok_or(Error::NoDevice)?;
            (spi, driver)
        };

        driver.remove(&spi).map_err(|e| {
            log::warn!(
                "{}: remove of {} failed with error {}",
                driver.name(),
                spi.name(),
                e.to_errno()
            );
            e
        })
    }

    /// Name of the driver bound to a peripheral
    pub fn bound_driver(&self, id: PeripheralId) -> Option<String> {
        self.lock()
            .peripherals
            .get(&id)
            .and_then(|p| p.driver.clone())
    }

    /// All peripherals on the bus, by id
    pub fn peripherals(&self) -> Vec<SpiPeripheral> {
        self.lock()
            .peripherals
            .values()
            .map(|p| p.spi.clone())
            .collect()
    }

    // =========================================================================
    // VFS
    // =========================================================================

    /// Open `/dev/<name>` (the `/dev/` prefix is optional)
    pub fn open(&self, path: &str, mode: FileMode) -> Result<Fd> {
        let name = path.strip_prefix("/dev/").unwrap_or(path);

        let (inode, ops) = {
            let state = self.lock();
            let node = state.nodes.get(name).ok_or(Error::NoDevice)?;
            let cdev = state
                .cdev_for(node.devt)
                .ok_or(Error::NoDeviceOrAddress)?;
            (
                Inode::new(node.devt, Arc::clone(&cdev.cdev.container)),
                cdev.cdev.ops,
            )
        };

        let mut file = File::new(mode);
        ops.open(&inode, &mut file)?;

        let mut state = self.lock();
        state.next_fd += 1;
        let fd = Fd(state.next_fd);
        state
            .files
            .insert(fd, Arc::new(Mutex::new(OpenFile { file, inode, ops })));
        log::trace!("open {} ({:?}) -> {}", path, mode, fd);
        Ok(fd)
    }

    /// Read from an open file into `buf`, returning the bytes transferred
    pub fn read(&self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        let entry = self.lock().files.get(&fd).cloned().ok_or(Error::BadFile)?;
        let mut entry = entry.lock().unwrap_or_else(PoisonError::into_inner);
        let OpenFile { file, ops, .. } = &mut *entry;

        let mut pos = file.pos();
        let count = ops.read(file, buf, &mut pos)?;
        file.set_pos(pos);
        Ok(count)
    }

    /// Close an open file, running the driver's release
    pub fn close(&self, fd: Fd) -> Result<()> {
        let entry = self.lock().files.remove(&fd).ok_or(Error::BadFile)?;
        let mut entry = entry.lock().unwrap_or_else(PoisonError::into_inner);
        let OpenFile { file, inode, ops } = &mut *entry;
        ops.release(inode, file)
    }

    /// Device nodes, by name
    pub fn nodes(&self) -> Vec<NodeInfo> {
        let state = self.lock();
        state
            .nodes
            .iter()
            .map(|(name, node)| NodeInfo {
                name: name.clone(),
                devt: node.devt,
                class: state.classes.get(&node.class.0).cloned().unwrap_or_default(),
                parent: node
                    .parent
                    .and_then(|id| state.peripherals.get(&id))
                    .map(|p| p.spi.name().to_string()),
            })
            .collect()
    }

    /// Count live kernel objects
    pub fn resources(&self) -> ResourceSummary {
        let state = self.lock();
        ResourceSummary {
            regions: state.regions.len(),
            classes: state.classes.len(),
            cdevs: state.cdevs.len(),
            nodes: state.nodes.len(),
            drivers: state.drivers.len(),
            open_files: state.files.len(),
        }
    }
}

impl CharDevHost for EmulatedKernel {
    fn alloc_chrdev_region(&self, first_minor: u32, count: u32, name: &str) -> Result<DevNum> {
        self.check_fault(HostOp::AllocChrdevRegion)?;

        if count == 0 || u64::from(first_minor) + u64::from(count) > u64::from(MINORMASK) + 1 {
            return Err(Error::InvalidArgument(format!(
                "bad minor range {}+{}",
                first_minor, count
            )));
        }

        let mut state = self.lock();
        let major = state.find_dynamic_major().ok_or(Error::Busy)?;
        let base = DevNum::new(major, first_minor);
        state.regions.push(RegionEntry {
            base,
            count,
            name: name.to_string(),
        });
        log::debug!("chrdev region {} ({} minors) -> {}", name, count, base);
        Ok(base)
    }

    fn unregister_chrdev_region(&self, base: DevNum, count: u32) {
        let mut state = self.lock();
        match state
            .regions
            .iter()
            .position(|r| r.base == base && r.count == count)
        {
            Some(pos) => {
                let region = state.regions.remove(pos);
                log::debug!("chrdev region {} released", region.name);
            }
            None => log::warn!("unregister of unknown chrdev region {}+{}", base, count),
        }
    }

    fn cdev_add(&self, cdev: Cdev, first: DevNum, count: u32) -> Result<CdevHandle> {
        self.check_fault(HostOp::CdevAdd)?;

        if count == 0 {
            return Err(Error::InvalidArgument("cdev_add with zero count".into()));
        }

        let mut state = self.lock();
        let overlaps = state.cdevs.values().any(|c| {
            first.in_range(c.first, c.count) || c.first.in_range(first, count)
        });
        if overlaps {
            return Err(Error::Busy);
        }

        let handle = state.alloc_handle();
        state.cdevs.insert(handle, CdevEntry { first, count, cdev });
        Ok(CdevHandle(handle))
    }

    fn cdev_del(&self, cdev: CdevHandle) {
        if self.lock().cdevs.remove(&cdev.0).is_none() {
            log::warn!("cdev_del of unknown cdev {:?}", cdev);
        }
    }
}

impl ClassHost for EmulatedKernel {
    fn class_create(&self, name: &str) -> Result<ClassHandle> {
        self.check_fault(HostOp::ClassCreate)?;

        let mut state = self.lock();
        if state.classes.values().any(|c| c == name) {
            return Err(Error::AlreadyExists);
        }
        let handle = state.alloc_handle();
        state.classes.insert(handle, name.to_string());
        Ok(ClassHandle(handle))
    }

    fn class_destroy(&self, class: ClassHandle) {
        let mut state = self.lock();
        let Some(name) = state.classes.remove(&class.0) else {
            log::warn!("class_destroy of unknown class {:?}", class);
            return;
        };
        let orphans = state.nodes.values().filter(|n| n.class == class).count();
        if orphans > 0 {
            log::warn!("class {} destroyed with {} nodes left", name, orphans);
            state.nodes.retain(|_, n| n.class != class);
        }
    }

    fn device_create(
        &self,
        class: ClassHandle,
        parent: Option<PeripheralId>,
        devt: DevNum,
        name: &str,
    ) -> Result<NodeHandle> {
        self.check_fault(HostOp::DeviceCreate)?;

        let mut state = self.lock();
        if !state.classes.contains_key(&class.0) {
            return Err(Error::InvalidArgument(format!("unknown class {:?}", class)));
        }
        if state.nodes.contains_key(name) || state.nodes.values().any(|n| n.devt == devt) {
            return Err(Error::AlreadyExists);
        }

        let handle = NodeHandle(state.alloc_handle());
        state.nodes.insert(
            name.to_string(),
            NodeEntry {
                handle,
                class,
                devt,
                parent,
            },
        );
        log::debug!("/dev/{} created ({})", name, devt);
        Ok(handle)
    }

    fn device_destroy(&self, class: ClassHandle, devt: DevNum) {
        let mut state = self.lock();
        let name = state
            .nodes
            .iter()
            .find(|(_, n)| n.class == class && n.devt == devt)
            .map(|(name, _)| name.clone());
        match name {
            Some(name) => {
                let node = state.nodes.remove(&name);
                log::debug!(
                    "/dev/{} destroyed ({:?})",
                    name,
                    node.map(|n| n.handle)
                );
            }
            None => log::warn!("device_destroy of unknown node {}", devt),
        }
    }
}

impl SpiHost for EmulatedKernel {
    fn spi_register_driver(&self, driver: Arc<dyn SpiDriver>) -> Result<()> {
        self.check_fault(HostOp::SpiRegisterDriver)?;

        let candidates: Vec<SpiPeripheral> = {
            let mut state = self.lock();
            if state.drivers.iter().any(|d| d.name() == driver.name()) {
                return Err(Error::Busy);
            }
            state.drivers.push(Arc::clone(&driver));
            state
                .peripherals
                .values()
                .filter(|p| p.driver.is_none())
                .filter(|p| of_match_device(driver.of_match_table(), p.spi.compatible()).is_some())
                .map(|p| p.spi.clone())
                .collect()
        };
        log::debug!(
            "driver {} registered, {} matching peripherals",
            driver.name(),
            candidates.len()
        );

        for spi in &candidates {
            // A failed probe leaves that peripheral unbound; registration still succeeds
            let _ = self.probe_with(spi, Arc::clone(&driver));
        }
        Ok(())
    }

    fn spi_unregister_driver(&self, name: &str) {
        let bound: Vec<PeripheralId> = self
            .lock()
            .peripherals
            .iter()
            .filter(|(_, p)| p.driver.as_deref() == Some(name))
            .map(|(id, _)| *id)
            .collect();

        for id in bound {
            let _ = self.unbind(id);
        }

        let mut state = self.lock();
        let before = state.drivers.len();
        state.drivers.retain(|d| d.name() != name);
        if state.drivers.len() == before {
            log::warn!("unregister of unknown driver {}", name);
        }
    }
}

impl fmt::Debug for EmulatedKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmulatedKernel")
            .field("resources", &self.resources())
            .finish_non_exhaustive()
    }
}

