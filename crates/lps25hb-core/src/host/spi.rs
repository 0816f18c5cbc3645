//! SPI peripheral description

use bitflags::bitflags;

bitflags! {
    /// SPI mode flags, as in `spi_device.mode`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SpiMode: u32 {
        /// Clock phase
        const CPHA       = 1 << 0;
        /// Clock polarity
        const CPOL       = 1 << 1;
        /// Chip select active high
        const CS_HIGH    = 1 << 2;
        /// Least significant bit first
        const LSB_FIRST  = 1 << 3;
        /// SI/SO signals shared
        const THREE_WIRE = 1 << 4;

        /// SPI mode 0: CPOL=0, CPHA=0
        const MODE_0 = 0;
        /// SPI mode 1: CPOL=0, CPHA=1
        const MODE_1 = Self::CPHA.bits();
        /// SPI mode 2: CPOL=1, CPHA=0
        const MODE_2 = Self::CPOL.bits();
        /// SPI mode 3: CPOL=1, CPHA=1
        const MODE_3 = Self::CPOL.bits() | Self::CPHA.bits();
    }
}

impl Default for SpiMode {
    fn default() -> Self {
        SpiMode::empty()
    }
}

/// Host-assigned identity of a peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeripheralId(pub u32);

/// An SPI peripheral as described by the devicetree
///
/// The host owns the peripheral; drivers only keep its [`PeripheralId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiPeripheral {
    id: PeripheralId,
    name: String,
    bus_num: u16,
    chip_select: u8,
    max_speed_hz: u32,
    mode: SpiMode,
    compatible: Vec<String>,
}

impl SpiPeripheral {
    /// Describe the peripheral on `bus_num` behind `chip_select`
    pub fn new(id: PeripheralId, bus_num: u16, chip_select: u8) -> Self {
        Self {
            id,
            name: format!("spi{}.{}", bus_num, chip_select),
            bus_num,
            chip_select,
            max_speed_hz: 0,
            mode: SpiMode::MODE_0,
            compatible: Vec::new(),
        }
    }

    /// Append a devicetree compatible string
    pub fn with_compatible(mut self, compatible: impl Into<String>) -> Self {
        self.compatible.push(compatible.into());
        self
    }

    /// Set the maximum clock speed in Hz
    pub fn with_speed(mut self, max_speed_hz: u32) -> Self {
        self.max_speed_hz = max_speed_hz;
        self
    }

    /// Set the SPI mode flags
    pub fn with_mode(mut self, mode: SpiMode) -> Self {
        self.mode = mode;
        self
    }

    /// Peripheral identity
    pub fn id(&self) -> PeripheralId {
        self.id
    }

    /// Kernel-style device name, `spiB.C`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bus number
    pub fn bus_num(&self) -> u16 {
        self.bus_num
    }

    /// Chip select
    pub fn chip_select(&self) -> u8 {
        self.chip_select
    }

    /// Maximum clock speed in Hz (0 if unspecified)
    pub fn max_speed_hz(&self) -> u32 {
        self.max_speed_hz
    }

    /// SPI mode flags
    pub fn mode(&self) -> SpiMode {
        self.mode
    }

    /// Devicetree compatible list, most specific first
    pub fn compatible(&self) -> &[String] {
        &self.compatible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let spi = SpiPeripheral::new(PeripheralId(7), 1, 2)
            .with_compatible("mr,lps25hb")
            .with_speed(1_000_000)
            .with_mode(SpiMode::MODE_3);
        assert_eq!(spi.name(), "spi1.2");
        assert_eq!(spi.id(), PeripheralId(7));
        assert_eq!(spi.compatible(), ["mr,lps25hb".to_string()]);
        assert_eq!(spi.max_speed_hz(), 1_000_000);
        assert!(spi.mode().contains(SpiMode::CPOL | SpiMode::CPHA));
    }
}
