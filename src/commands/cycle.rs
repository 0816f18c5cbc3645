//! Cycle command implementation
//!
//! Exercises the whole driver lifetime once and checks that unloading leaves
//! no kernel object behind.

use super::{print_nodes, Session};
use lps25hb_core::host::FileMode;
use lps25hb_core::DriverConfig;
use lps25hb_emul::Board;

/// Run the cycle command
pub fn run(board: &Board, config: DriverConfig) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::start(board, config)?;
    let kernel = &session.kernel;

    println!("Loaded: {}", kernel.resources());
    let nodes = kernel.nodes();
    print_nodes(&nodes);

    let mut buf = [0u8; 64];
    for node in &nodes {
        let fd = kernel.open(&node.name, FileMode::READ)?;
        let n = kernel.read(fd, &mut buf)?;
        kernel.close(fd)?;
        println!("/dev/{}: read {} bytes", node.name, n);
    }

    for spi in kernel.peripherals() {
        if kernel.bound_driver(spi.id()).is_some() {
            kernel.unbind(spi.id())?;
            println!("{}: unbound", spi.name());
        }
    }

    let kernel = session.kernel.clone();
    session.finish();

    let left = kernel.resources();
    if !left.is_empty() {
        return Err(format!("Resources left after unload: {}", left).into());
    }
    println!("Unloaded cleanly.");
    Ok(())
}
