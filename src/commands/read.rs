//! Read command implementation

use super::Session;
use lps25hb_core::host::FileMode;
use lps25hb_core::DriverConfig;
use lps25hb_emul::Board;

/// Run the read command
pub fn run(
    board: &Board,
    config: DriverConfig,
    node: &str,
    count: usize,
    write: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::start(board, config)?;

    let mode = if write {
        FileMode::READ | FileMode::WRITE
    } else {
        FileMode::READ
    };

    let result = read_node(&session, node, mode, count);
    session.finish();

    let transferred = result?;
    println!("Read {} of {} bytes from {}", transferred, count, node);
    Ok(())
}

fn read_node(
    session: &Session,
    node: &str,
    mode: FileMode,
    count: usize,
) -> Result<usize, Box<dyn std::error::Error>> {
    let fd = session.kernel.open(node, mode).map_err(|e| {
        format!("Failed to open {}: {} (errno {})", node, e, e.to_errno())
    })?;

    let mut buf = vec![0u8; count];
    let result = session.kernel.read(fd, &mut buf);
    session.kernel.close(fd)?;
    Ok(result?)
}
