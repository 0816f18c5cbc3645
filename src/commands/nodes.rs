//! Nodes command implementation

use super::{print_nodes, Session};
use lps25hb_core::DriverConfig;
use lps25hb_emul::Board;

/// Run the nodes command
pub fn run(board: &Board, config: DriverConfig) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::start(board, config)?;

    let bound = session
        .kernel
        .peripherals()
        .iter()
        .filter(|spi| session.kernel.bound_driver(spi.id()).is_some())
        .count();
    println!(
        "Board '{}': {} peripherals, {} bound to {}",
        board.display_name(),
        board.peripherals.len(),
        bound,
        session.driver.config().driver_name
    );
    println!();
    print_nodes(&session.kernel.nodes());

    session.finish();
    Ok(())
}
