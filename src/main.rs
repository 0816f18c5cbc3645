//! lps25hb - LPS25HB SPI character-device driver
//!
//! Runs the driver against an emulated kernel. A board file describes the SPI
//! peripherals present; the driver binds the ones compatible with
//! `mr,lps25hb` and exposes them as `/dev/barometerN`.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use lps25hb_core::DriverConfig;
use lps25hb_emul::board::driver_config_from_file;
use lps25hb_emul::Board;
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Nodes => {
            let board = load_board(cli.board.as_deref())?;
            commands::nodes::run(&board, config)
        }
        Commands::Read { node, count, write } => {
            let board = load_board(cli.board.as_deref())?;
            commands::read::run(&board, config, &node, count, write)
        }
        Commands::Cycle => {
            let board = load_board(cli.board.as_deref())?;
            commands::cycle::run(&board, config)
        }
        Commands::Info => {
            commands::info::run(&config);
            Ok(())
        }
    }
}

/// Load the board file, or the built-in single-sensor board
fn load_board(path: Option<&Path>) -> Result<Board, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let board = Board::from_file(path)?;
            log::info!(
                "Loaded board '{}' from {:?} ({} peripherals)",
                board.display_name(),
                path,
                board.peripherals.len()
            );
            Ok(board)
        }
        None => {
            log::debug!("No board file given, using the built-in board");
            Ok(Board::default())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<DriverConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let config = driver_config_from_file(path)?;
            log::info!("Loaded driver config from {:?}", path);
            Ok(config)
        }
        None => Ok(DriverConfig::default()),
    }
}
