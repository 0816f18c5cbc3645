//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lps25hb")]
#[command(author, version, about = "LPS25HB SPI driver on an emulated kernel", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Board file (RON) listing the SPI peripherals to plug in.
    /// Defaults to a single LPS25HB on spi0.0
    #[arg(short, long, global = true)]
    pub board: Option<PathBuf>,

    /// Driver configuration file (RON), overrides names and limits
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load the driver, bind the board and list the device nodes
    Nodes,

    /// Open a device node and read from it
    Read {
        /// Node name, with or without /dev/
        #[arg(short, long, default_value = "barometer0")]
        node: String,

        /// Number of bytes to request
        #[arg(short, long, default_value = "64")]
        count: usize,

        /// Open with write intent
        #[arg(long)]
        write: bool,
    },

    /// Load, bind, read every node, unbind and unload, then check for leaks
    Cycle,

    /// Show module metadata, configuration and match table
    Info,
}
