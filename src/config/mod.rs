//! Radio configuration
//!
//! Board level settings live in [`Config`]. Modem settings are expressed as
//! [`ModulationParams`] and [`PacketParams`], tagged by packet type, and
//! serialized into the variable-length layouts SetModulationParams and
//! SetPacketParams expect.

use crate::commands::{ImageCalibConfig, PacketType, RegulatorMode, TcxoVoltage};

pub mod gfsk;
pub mod lora;

pub use gfsk::*;
pub use lora::*;

/// Crystal frequency in Hz
pub const XTAL_FREQ: u32 = 32_000_000;

/// Exponent of the PLL step, FREQ_STEP = XTAL_FREQ / 2^25
pub const FREQ_DIV_SHIFT: u32 = 25;

/// Converts a frequency in Hz into a PLL word, truncating.
pub const fn frequency_to_word(hz: u32) -> u32 {
    (((hz as u64) << FREQ_DIV_SHIFT) / XTAL_FREQ as u64) as u32
}

/// Chip variant, selects the power amplifier
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipVariant {
    /// Low power PA, up to +15 dBm
    Sx1261,
    /// High power PA, up to +22 dBm
    #[default]
    Sx1262,
}

/// Reference clock
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSource {
    /// Crystal on XTA/XTB
    #[default]
    Xtal,
    /// TCXO powered from DIO3
    Tcxo {
        voltage: TcxoVoltage,
        /// Start-up delay in 15.625 μs steps
        startup_delay: u32,
    },
}

/// LoRa sync word flavour
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NetworkSyncWord {
    #[default]
    Private,
    Public,
}

impl NetworkSyncWord {
    /// Register value for 0x0740/0x0741
    pub fn word(self) -> u16 {
        match self {
            Self::Private => 0x1424,
            Self::Public => 0x3444,
        }
    }
}

/// When the image rejection is calibrated
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ImageCalibration {
    /// On the first frequency set only, until explicitly invalidated
    #[default]
    Once,
    /// Whenever the frequency moves to another band
    PerBand,
}

/// Board configuration
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub chip: ChipVariant,
    pub clock: ClockSource,
    /// Regulator to select during init, `None` keeps the chip default
    pub regulator: Option<RegulatorMode>,
    pub dio2_as_rf_switch: bool,
    pub sync_word: NetworkSyncWord,
    pub image_calibration: ImageCalibration,
}

/// Image calibration band
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationBand {
    /// 430 - 440 MHz, also used below 425 MHz
    Band430,
    /// 470 - 510 MHz
    Band470,
    /// 779 - 787 MHz
    Band779,
    /// 863 - 870 MHz
    Band863,
    /// 902 - 928 MHz
    Band902,
}

impl CalibrationBand {
    pub fn from_frequency(hz: u32) -> Self {
        match hz {
            f if f > 900_000_000 => Self::Band902,
            f if f > 850_000_000 => Self::Band863,
            f if f > 770_000_000 => Self::Band779,
            f if f > 460_000_000 => Self::Band470,
            _ => Self::Band430,
        }
    }

    /// CalibrateImage parameters for this band
    pub fn config(self) -> ImageCalibConfig {
        let (freq1, freq2) = match self {
            Self::Band902 => (0xE1, 0xE9),
            Self::Band863 => (0xD7, 0xDB),
            Self::Band779 => (0xC1, 0xC5),
            Self::Band470 => (0x75, 0x81),
            Self::Band430 => (0x6B, 0x6F),
        };
        ImageCalibConfig { freq1, freq2 }
    }
}

/// Serialized parameter block of at most 9 bytes
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ParamBytes {
    bytes: [u8; 9],
    len: usize,
}

impl ParamBytes {
    pub(crate) fn new(src: &[u8]) -> Self {
        let mut bytes = [0u8; 9];
        let len = src.len().min(bytes.len());
        bytes[..len].copy_from_slice(&src[..len]);
        Self { bytes, len }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// Modulation parameters
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModulationParams {
    Gfsk(GfskModulationParams),
    LoRa(LoRaModulationParams),
}

impl ModulationParams {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Self::Gfsk(_) => PacketType::Gfsk,
            Self::LoRa(_) => PacketType::LoRa,
        }
    }

    /// SetModulationParams payload: 8 bytes for GFSK, 4 for LoRa
    pub fn layout(&self) -> ParamBytes {
        match self {
            Self::Gfsk(params) => ParamBytes::new(&params.as_bytes()),
            Self::LoRa(params) => ParamBytes::new(&params.as_bytes()),
        }
    }
}

/// CRC seed and polynomial written to 0x06BC / 0x06BE ahead of the packet params
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CrcRegisters {
    pub seed: u16,
    pub polynomial: u16,
}

/// Packet parameters
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketParams {
    Gfsk(GfskPacketParams),
    LoRa(LoRaPacketParams),
}

impl PacketParams {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Self::Gfsk(_) => PacketType::Gfsk,
            Self::LoRa(_) => PacketType::LoRa,
        }
    }

    /// SetPacketParams payload: 9 bytes for GFSK, 6 for LoRa
    pub fn layout(&self) -> ParamBytes {
        match self {
            Self::Gfsk(params) => ParamBytes::new(&params.as_bytes()),
            Self::LoRa(params) => ParamBytes::new(&params.as_bytes()),
        }
    }

    /// CRC registers implied by a named GFSK CRC variant
    pub fn crc_registers(&self) -> Option<CrcRegisters> {
        match self {
            Self::Gfsk(params) => params.crc.registers(),
            Self::LoRa(_) => None,
        }
    }
}
