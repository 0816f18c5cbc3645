//! CLI command implementations
//!
//! Each command boots a fresh [`EmulatedKernel`], plugs in the board, loads
//! the driver and unloads it again before returning.

pub mod cycle;
pub mod info;
pub mod nodes;
pub mod read;

use lps25hb_core::{DriverConfig, DriverRegistry};
use lps25hb_emul::{Board, EmulatedKernel, NodeInfo};
use std::sync::Arc;

/// A kernel with the board plugged in and the driver loaded
pub struct Session {
    pub kernel: Arc<EmulatedKernel>,
    pub driver: Arc<DriverRegistry<EmulatedKernel>>,
}

impl Session {
    /// Plug in `board`, then load the driver so it binds at registration
    pub fn start(board: &Board, config: DriverConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let kernel = Arc::new(EmulatedKernel::new());
        kernel.populate(board)?;
        let driver = DriverRegistry::init(Arc::clone(&kernel), config)?;
        Ok(Self { kernel, driver })
    }

    /// Unload the driver
    pub fn finish(self) {
        self.driver.exit();
    }
}

/// Print device nodes as a table
pub fn print_nodes(nodes: &[NodeInfo]) {
    if nodes.is_empty() {
        println!("No device nodes.");
        return;
    }

    println!("{:<16} {:<10} {:<10} PARENT", "NODE", "DEVT", "CLASS");
    println!("{}", "-".repeat(48));
    for node in nodes {
        println!(
            "{:<16} {:<10} {:<10} {}",
            format!("/dev/{}", node.name),
            node.devt.to_string(),
            node.class,
            node.parent.as_deref().unwrap_or("-")
        );
    }
}
