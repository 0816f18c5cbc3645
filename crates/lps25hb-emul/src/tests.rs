//! Driver scenarios run against the emulated kernel

use crate::board::{Board, PeripheralDef};
use crate::kernel::{EmulatedKernel, HostOp};
use lps25hb_core::host::{FileMode, PeripheralId, SpiDriver, SpiHost, SpiPeripheral};
use lps25hb_core::{DevNum, DriverConfig, DriverRegistry, Error, OfDeviceId, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

/// Logger that keeps every record so tests can look for driver diagnostics
struct CaptureLogger {
    lines: Mutex<Vec<String>>,
}

impl log::Log for CaptureLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::Level::Info
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.enabled(record.metadata()) {
            if let Ok(mut lines) = self.lines.lock() {
                lines.push(record.args().to_string());
            }
        }
    }

    fn flush(&self) {}
}

fn capture_logger() -> &'static CaptureLogger {
    static LOGGER: OnceLock<&'static CaptureLogger> = OnceLock::new();
    LOGGER.get_or_init(|| {
        let logger: &'static CaptureLogger = Box::leak(Box::new(CaptureLogger {
            lines: Mutex::new(Vec::new()),
        }));
        let _ = log::set_logger(logger);
        log::set_max_level(log::LevelFilter::Info);
        logger
    })
}

fn logged(needle: &str) -> bool {
    capture_logger()
        .lines
        .lock()
        .map(|lines| lines.iter().any(|l| l.contains(needle)))
        .unwrap_or(false)
}

type Driver = Arc<DriverRegistry<EmulatedKernel>>;

fn load(kernel: &Arc<EmulatedKernel>) -> Driver {
    DriverRegistry::init(kernel.clone(), DriverConfig::default()).unwrap()
}

fn board(count: u8) -> Board {
    Board {
        name: None,
        peripherals: (0..count).map(|cs| PeripheralDef::lps25hb(0, cs)).collect(),
    }
}

#[test]
fn test_bind_open_read_unbind() {
    capture_logger();
    let kernel = Arc::new(EmulatedKernel::new());
    let driver = load(&kernel);

    let a = kernel.add_peripheral(&PeripheralDef::lps25hb(0, 0)).unwrap();
    assert_eq!(kernel.bound_driver(a).as_deref(), Some("mr_lps25hb"));

    let fd = kernel.open("/dev/barometer0", FileMode::READ).unwrap();
    let mut buf = [0u8; 64];
    assert_eq!(kernel.read(fd, &mut buf), Ok(0));
    assert!(logged("lps25hb read called, value: 0"));
    kernel.close(fd).unwrap();

    kernel.unbind(a).unwrap();
    assert_eq!(
        kernel.open("/dev/barometer0", FileMode::READ),
        Err(Error::NoDevice)
    );
    assert!(kernel.nodes().is_empty());

    driver.exit();
    assert!(kernel.resources().is_empty());
}

#[test]
fn test_nth_bind_gets_nth_number() {
    let kernel = Arc::new(EmulatedKernel::new());
    let driver = load(&kernel);
    let base = driver.device_number_base();

    kernel.populate(&board(10)).unwrap();

    let nodes = kernel.nodes();
    assert_eq!(nodes.len(), 10);
    for n in 0..10u32 {
        let name = format!("barometer{}", n);
        let node = nodes.iter().find(|node| node.name == name).unwrap();
        assert_eq!(node.devt, base.offset(n));
        assert_eq!(node.class, "lps25hb");
        assert_eq!(node.parent.as_deref(), Some(format!("spi0.{}", n).as_str()));
    }
    assert_eq!(driver.device_count(), 10);

    driver.exit();
}

#[test]
fn test_eleventh_bind_fails() {
    let kernel = Arc::new(EmulatedKernel::new());
    let driver = load(&kernel);
    kernel.populate(&board(10)).unwrap();

    let extra = kernel.add_peripheral(&PeripheralDef::lps25hb(1, 0)).unwrap();
    assert_eq!(kernel.bound_driver(extra), None);
    assert_eq!(
        kernel.bind(extra),
        Err(Error::CapacityExceeded { max: 10 })
    );
    assert_eq!(kernel.nodes().len(), 10);
    assert_eq!(driver.device_count(), 10);

    driver.exit();
    assert!(kernel.resources().is_empty());
}

#[test]
fn test_write_open_rejected_everywhere() {
    let kernel = Arc::new(EmulatedKernel::new());
    let driver = load(&kernel);
    kernel.populate(&board(3)).unwrap();

    for n in 0..3 {
        let path = format!("/dev/barometer{}", n);
        for mode in [FileMode::WRITE, FileMode::READ | FileMode::WRITE] {
            assert_eq!(kernel.open(&path, mode), Err(Error::PermissionDenied));
        }
    }
    assert_eq!(Error::PermissionDenied.to_errno(), -1);
    assert_eq!(kernel.resources().open_files, 0);

    driver.exit();
}

#[test]
fn test_reads_always_return_zero() {
    let kernel = Arc::new(EmulatedKernel::new());
    let driver = load(&kernel);
    kernel.populate(&board(1)).unwrap();

    let fd = kernel.open("barometer0", FileMode::READ).unwrap();
    let mut big = vec![0x55u8; 4096];
    for len in [0usize, 1, 2, 64, 4096] {
        assert_eq!(kernel.read(fd, &mut big[..len]), Ok(0));
    }
    assert!(big.iter().all(|&b| b == 0x55));
    kernel.close(fd).unwrap();
    assert_eq!(kernel.read(fd, &mut big), Err(Error::BadFile));
    assert_eq!(kernel.close(fd), Err(Error::BadFile));

    driver.exit();
}

#[test]
fn test_init_exit_round_trip() {
    let kernel = Arc::new(EmulatedKernel::new());
    let driver = load(&kernel);

    let loaded = kernel.resources();
    assert_eq!(loaded.regions, 1);
    assert_eq!(loaded.classes, 1);
    assert_eq!(loaded.drivers, 1);
    assert_eq!(loaded.cdevs, 0);

    driver.exit();
    assert!(kernel.resources().is_empty());

    // The same kernel can load the driver again
    let driver = load(&kernel);
    driver.exit();
    assert!(kernel.resources().is_empty());
}

#[test]
fn test_dynamic_major() {
    let kernel = Arc::new(EmulatedKernel::new());
    let driver = load(&kernel);
    assert_eq!(driver.device_number_base(), DevNum::new(254, 0));
    driver.exit();
}

#[test]
fn test_peripherals_present_before_load_are_bound() {
    let kernel = Arc::new(EmulatedKernel::new());
    let ids = kernel.populate(&board(2)).unwrap();
    assert!(ids.iter().all(|&id| kernel.bound_driver(id).is_none()));

    let driver = load(&kernel);
    assert!(ids.iter().all(|&id| kernel.bound_driver(id).is_some()));
    assert_eq!(kernel.nodes().len(), 2);

    driver.exit();
    assert!(ids.iter().all(|&id| kernel.bound_driver(id).is_none()));
    assert!(kernel.resources().is_empty());
    assert_eq!(kernel.peripherals().len(), 2);
}

#[test]
fn test_non_matching_peripheral_ignored() {
    let kernel = Arc::new(EmulatedKernel::new());
    let driver = load(&kernel);

    let other = PeripheralDef {
        compatible: vec!["st,lps22hb".into()],
        ..PeripheralDef::lps25hb(0, 1)
    };
    let id = kernel.add_peripheral(&other).unwrap();
    assert_eq!(kernel.bound_driver(id), None);
    assert_eq!(kernel.bind(id), Err(Error::NoDevice));
    assert_eq!(driver.device_count(), 0);
    assert!(kernel.nodes().is_empty());

    driver.exit();
}

#[test]
fn test_region_failure_aborts_load() {
    let kernel = Arc::new(EmulatedKernel::new());
    kernel.fail_next(HostOp::AllocChrdevRegion, Error::Busy);
    assert_eq!(
        DriverRegistry::init(kernel.clone(), DriverConfig::default()).err(),
        Some(Error::Busy)
    );
    assert!(kernel.resources().is_empty());
}

#[test]
fn test_class_failure_leaks_nothing() {
    let kernel = Arc::new(EmulatedKernel::new());
    kernel.fail_next(HostOp::ClassCreate, Error::OutOfMemory);
    let err = DriverRegistry::init(kernel.clone(), DriverConfig::default()).err();
    assert_eq!(err.map(|e| e.to_errno()), Some(-12));
    assert!(kernel.resources().is_empty());
}

#[test]
fn test_register_failure_leaks_nothing() {
    let kernel = Arc::new(EmulatedKernel::new());
    kernel.fail_next(HostOp::SpiRegisterDriver, Error::Busy);
    assert!(DriverRegistry::init(kernel.clone(), DriverConfig::default()).is_err());
    assert!(kernel.resources().is_empty());
}

#[test]
fn test_duplicate_class_rejected() {
    let kernel = Arc::new(EmulatedKernel::new());
    let first = load(&kernel);
    let second = DriverRegistry::init(kernel.clone(), DriverConfig::default());
    assert_eq!(second.err(), Some(Error::AlreadyExists));

    first.exit();
    assert!(kernel.resources().is_empty());
}

#[test]
fn test_node_failure_rolls_back_probe() {
    let kernel = Arc::new(EmulatedKernel::new());
    let driver = load(&kernel);

    kernel.fail_next(HostOp::DeviceCreate, Error::OutOfMemory);
    let a = kernel.add_peripheral(&PeripheralDef::lps25hb(0, 0)).unwrap();
    assert_eq!(kernel.bound_driver(a), None);
    assert_eq!(kernel.resources().cdevs, 0);
    assert_eq!(driver.device_count(), 0);

    // The slot was not consumed: a retry gets barometer0
    kernel.bind(a).unwrap();
    assert_eq!(kernel.nodes()[0].name, "barometer0");

    driver.exit();
    assert!(kernel.resources().is_empty());
}

#[test]
fn test_cdev_failure_rolls_back_probe() {
    let kernel = Arc::new(EmulatedKernel::new());
    let driver = load(&kernel);

    kernel.fail_next(HostOp::CdevAdd, Error::Busy);
    let a = kernel.add_peripheral(&PeripheralDef::lps25hb(0, 0)).unwrap();
    assert_eq!(kernel.bound_driver(a), None);
    assert_eq!(kernel.resources().cdevs, 0);
    assert!(kernel.nodes().is_empty());

    driver.exit();
    assert!(kernel.resources().is_empty());
}

#[test]
fn test_unbind_keeps_counter_and_names() {
    let kernel = Arc::new(EmulatedKernel::new());
    let driver = load(&kernel);
    let a = kernel.add_peripheral(&PeripheralDef::lps25hb(0, 0)).unwrap();

    kernel.unbind(a).unwrap();
    kernel.bind(a).unwrap();

    // device_count only grows, so the rebind is the second device
    let nodes = kernel.nodes();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].name, "barometer1");
    assert_eq!(nodes[0].devt, driver.device_number_base().offset(1));
    assert_eq!(kernel.bind(a), Err(Error::Busy));

    driver.exit();
}

#[test]
fn test_open_file_survives_unbind() {
    let kernel = Arc::new(EmulatedKernel::new());
    let driver = load(&kernel);
    let a = kernel.add_peripheral(&PeripheralDef::lps25hb(0, 0)).unwrap();

    let fd = kernel.open("/dev/barometer0", FileMode::READ).unwrap();
    kernel.remove_peripheral(a).unwrap();
    assert!(kernel.peripherals().is_empty());

    let mut buf = [0u8; 16];
    assert_eq!(kernel.read(fd, &mut buf), Ok(0));
    kernel.close(fd).unwrap();

    driver.exit();
    assert!(kernel.resources().is_empty());
}

#[test]
fn test_concurrent_binds_get_distinct_numbers() {
    let kernel = Arc::new(EmulatedKernel::new());
    let driver = load(&kernel);

    let handles: Vec<_> = (0..8u8)
        .map(|cs| {
            let kernel = Arc::clone(&kernel);
            std::thread::spawn(move || kernel.add_peripheral(&PeripheralDef::lps25hb(2, cs)))
        })
        .collect();
    let ids: Vec<PeripheralId> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();
    assert_eq!(ids.len(), 8);

    let mut minors: Vec<u32> = kernel.nodes().iter().map(|n| n.devt.minor()).collect();
    minors.sort_unstable();
    assert_eq!(minors, (0..8).collect::<Vec<_>>());
    assert_eq!(driver.device_count(), 8);

    driver.exit();
    assert!(kernel.resources().is_empty());
}

#[test]
fn test_unchecked_capacity_config() {
    let kernel = Arc::new(EmulatedKernel::new());
    let config = DriverConfig::default()
        .with_max_devices(2)
        .with_capacity_check(false);
    let driver = DriverRegistry::init(kernel.clone(), config).unwrap();

    kernel.populate(&board(3)).unwrap();
    assert_eq!(kernel.nodes().len(), 3);
    assert_eq!(driver.device_count(), 3);

    driver.exit();
    assert!(kernel.resources().is_empty());
}

/// Driver that unregisters itself from inside its own probe
struct VanishingDriver {
    kernel: Weak<EmulatedKernel>,
    removed: AtomicUsize,
}

const VANISHING_MATCH: &[OfDeviceId] = &[OfDeviceId::new("test,vanishing")];

impl SpiDriver for VanishingDriver {
    fn name(&self) -> &str {
        "vanishing"
    }

    fn of_match_table(&self) -> &[OfDeviceId] {
        VANISHING_MATCH
    }

    fn probe(&self, _spi: &SpiPeripheral) -> Result<()> {
        if let Some(kernel) = self.kernel.upgrade() {
            kernel.spi_unregister_driver("vanishing");
        }
        Ok(())
    }

    fn remove(&self, _spi: &SpiPeripheral) -> Result<()> {
        self.removed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_driver_unregistered_during_probe_is_not_bound() {
    let kernel = Arc::new(EmulatedKernel::new());
    let driver = Arc::new(VanishingDriver {
        kernel: Arc::downgrade(&kernel),
        removed: AtomicUsize::new(0),
    });
    kernel.spi_register_driver(driver.clone()).unwrap();

    let def = PeripheralDef {
        compatible: vec!["test,vanishing".into()],
        ..PeripheralDef::lps25hb(0, 0)
    };
    let id = kernel.add_peripheral(&def).unwrap();

    assert_eq!(kernel.bound_driver(id), None);
    assert_eq!(driver.removed.load(Ordering::SeqCst), 1);
    assert_eq!(kernel.resources().drivers, 0);
    assert_eq!(kernel.bind(id), Err(Error::NoDevice));
}
