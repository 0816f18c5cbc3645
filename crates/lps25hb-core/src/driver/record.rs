//! Per-device state

use crate::devnum::DevNum;
use crate::host::{CdevHandle, NodeHandle, PeripheralId};
use std::sync::OnceLock;

/// State of one bound LPS25HB
///
/// Shared between the registry and every open file of the node. The char
/// device and node handles are set once both exist; a record whose handles
/// are unset never leaves probe.
#[derive(Debug)]
pub struct DeviceRecord {
    devt: DevNum,
    index: u32,
    node_name: String,
    peripheral: PeripheralId,
    peripheral_name: String,
    cdev: OnceLock<CdevHandle>,
    node: OnceLock<NodeHandle>,
    last_reading: u16,
}

impl DeviceRecord {
    pub(crate) fn new(
        devt: DevNum,
        index: u32,
        node_name: String,
        peripheral: PeripheralId,
        peripheral_name: &str,
    ) -> Self {
        Self {
            devt,
            index,
            node_name,
            peripheral,
            peripheral_name: peripheral_name.to_string(),
            cdev: OnceLock::new(),
            node: OnceLock::new(),
            last_reading: 0,
        }
    }

    pub(crate) fn attach(&self, cdev: CdevHandle, node: NodeHandle) {
        let _ = self.cdev.set(cdev);
        let _ = self.node.set(node);
    }

    /// Device number of the node
    pub fn device_number(&self) -> DevNum {
        self.devt
    }

    /// Bind index, the `N` in `barometerN`
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Node name
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// The peripheral this record is bound to
    pub fn peripheral(&self) -> PeripheralId {
        self.peripheral
    }

    /// Name of the bound peripheral
    pub fn peripheral_name(&self) -> &str {
        &self.peripheral_name
    }

    /// Handle of the registered character device
    pub fn cdev(&self) -> Option<CdevHandle> {
        self.cdev.get().copied()
    }

    /// Handle of the device node
    pub fn node(&self) -> Option<NodeHandle> {
        self.node.get().copied()
    }

    /// Last sensor reading
    ///
    /// No SPI transfer is ever issued, so this stays 0.
    pub fn last_reading(&self) -> u16 {
        self.last_reading
    }
}
