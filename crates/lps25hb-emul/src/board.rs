//! Board description files
//!
//! A board file lists the SPI peripherals the devicetree would declare, in
//! RON format:
//!
//! ```ron
//! (
//!     name: Some("rpi-baro-hat"),
//!     peripherals: [
//!         (bus: 0, chip_select: 0, compatible: ["mr,lps25hb"], max_speed_hz: 1000000, mode: 3),
//!         (bus: 0, chip_select: 1, compatible: ["mr,lps25hb"]),
//!     ],
//! )
//! ```

use lps25hb_core::host::{PeripheralId, SpiMode, SpiPeripheral};
use lps25hb_core::DriverConfig;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors while loading a board or driver configuration file
#[derive(Debug, Error)]
pub enum BoardError {
    /// Failed to read the file
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// RON syntax or schema error
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// The file parsed but describes an impossible board
    #[error("Invalid board: {0}")]
    Validation(String),
}

/// One SPI peripheral declared on the board
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct PeripheralDef {
    /// SPI bus number
    pub bus: u16,
    /// Chip select on that bus
    pub chip_select: u8,
    /// Devicetree compatible list, most specific first
    pub compatible: Vec<String>,
    /// Maximum clock speed in Hz
    #[serde(default)]
    pub max_speed_hz: u32,
    /// Raw SPI mode bits (CPHA=1, CPOL=2, CS_HIGH=4, LSB_FIRST=8, 3WIRE=16)
    #[serde(default)]
    pub mode: u32,
}

impl PeripheralDef {
    /// An LPS25HB at `bus`/`chip_select`, 1 MHz, mode 3
    pub fn lps25hb(bus: u16, chip_select: u8) -> Self {
        Self {
            bus,
            chip_select,
            compatible: vec!["mr,lps25hb".into()],
            max_speed_hz: 1_000_000,
            mode: SpiMode::MODE_3.bits(),
        }
    }

    /// Build the host-side peripheral with the given identity
    pub fn to_peripheral(&self, id: PeripheralId) -> SpiPeripheral {
        let mode = SpiMode::from_bits_truncate(self.mode);
        self.compatible.iter().fold(
            SpiPeripheral::new(id, self.bus, self.chip_select)
                .with_speed(self.max_speed_hz)
                .with_mode(mode),
            |spi, compat| spi.with_compatible(compat.as_str()),
        )
    }
}

/// A set of peripherals to plug into the emulated kernel
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct Board {
    /// Board name, for display
    #[serde(default)]
    pub name: Option<String>,
    /// Declared SPI peripherals
    pub peripherals: Vec<PeripheralDef>,
}

impl Default for Board {
    /// One LPS25HB on `spi0.0`
    fn default() -> Self {
        Self {
            name: Some("default".into()),
            peripherals: vec![PeripheralDef::lps25hb(0, 0)],
        }
    }
}

impl Board {
    /// Parse a board from RON text
    pub fn from_ron_str(s: &str) -> Result<Self, BoardError> {
        let board: Board = ron::from_str(s)?;
        board.validate()?;
        Ok(board)
    }

    /// Load a board from a RON file
    pub fn from_file(path: &Path) -> Result<Self, BoardError> {
        let content = fs::read_to_string(path).map_err(|source| BoardError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&content)
    }

    /// Check for duplicate chip selects and unknown mode bits
    pub fn validate(&self) -> Result<(), BoardError> {
        let mut seen = HashSet::new();
        for def in &self.peripherals {
            if !seen.insert((def.bus, def.chip_select)) {
                return Err(BoardError::Validation(format!(
                    "duplicate peripheral spi{}.{}",
                    def.bus, def.chip_select
                )));
            }
            if SpiMode::from_bits(def.mode).is_none() {
                return Err(BoardError::Validation(format!(
                    "spi{}.{}: unknown mode bits 0x{:x}",
                    def.bus, def.chip_select, def.mode
                )));
            }
            if def.compatible.is_empty() {
                return Err(BoardError::Validation(format!(
                    "spi{}.{}: empty compatible list",
                    def.bus, def.chip_select
                )));
            }
        }
        Ok(())
    }

    /// Display name
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }
}

/// Parse a driver configuration from RON text
pub fn driver_config_from_ron_str(s: &str) -> Result<DriverConfig, BoardError> {
    let config: DriverConfig = ron::from_str(s)?;
    config
        .validate()
        .map_err(|e| BoardError::Validation(e.to_string()))?;
    Ok(config)
}

/// Load a driver configuration from a RON file
pub fn driver_config_from_file(path: &Path) -> Result<DriverConfig, BoardError> {
    let content = fs::read_to_string(path).map_err(|source| BoardError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    driver_config_from_ron_str(&content)
}
