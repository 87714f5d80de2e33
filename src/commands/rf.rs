//! RF, packet type and buffer commands
//!
//! Most of these are only accepted in STDBY_RC. The packet type has to be
//! selected first: the chip drops modulation and packet parameters when it
//! changes.

use core::convert::Infallible;

use regiface::{Command, NoParameters, ToByteArray};

use super::Opcode;
use crate::{config::frequency_to_word, Error};

/// RF frequency in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RfFrequencyConfig {
    /// Carrier frequency, 150 MHz to 960 MHz
    pub frequency: u32,
}

impl ToByteArray for RfFrequencyConfig {
    type Error = Infallible;
    type Array = [u8; 4];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(frequency_to_word(self.frequency).to_be_bytes())
    }
}

/// SetRfFrequency command (0x86)
///
/// The frequency is sent as a PLL word of 32 MHz / 2^25 steps.
#[derive(Debug, Clone)]
pub struct SetRfFrequency {
    /// RF frequency configuration
    pub config: RfFrequencyConfig,
}

impl Command for SetRfFrequency {
    type IdType = u8;
    type CommandParameters = RfFrequencyConfig;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::SetRfFrequency as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.config
    }
}

/// Modem selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketType {
    /// (G)FSK, 0.6 to 300 kbps
    Gfsk = 0x00,
    /// LoRa, SF5 to SF12
    LoRa = 0x01,
    /// No modem selected yet
    #[default]
    None = 0x0F,
}

impl TryFrom<u8> for PacketType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Gfsk),
            0x01 => Ok(Self::LoRa),
            0x0F => Ok(Self::None),
            other => Err(Error::UnsupportedPacketType(other)),
        }
    }
}

impl ToByteArray for PacketType {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self as u8])
    }
}

/// SetPacketType command (0x8A)
#[derive(Debug, Clone)]
pub struct SetPacketType {
    /// Packet type selection
    pub packet_type: PacketType,
}

impl Command for SetPacketType {
    type IdType = u8;
    type CommandParameters = PacketType;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::SetPacketType as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.packet_type
    }
}

/// Power amplifier ramp time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RampTime {
    Micros10 = 0x00,
    Micros20 = 0x01,
    Micros40 = 0x02,
    Micros80 = 0x03,
    #[default]
    Micros200 = 0x04,
    Micros800 = 0x05,
    Micros1700 = 0x06,
    Micros3400 = 0x07,
}

/// TX power and ramp time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxParams {
    /// Output power in dBm, range depends on the selected PA
    pub power: i8,
    /// PA ramp time
    pub ramp_time: RampTime,
}

impl ToByteArray for TxParams {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.power as u8, self.ramp_time as u8])
    }
}

/// SetTxParams command (0x8E)
///
/// Must follow SetPaConfig.
#[derive(Debug, Clone)]
pub struct SetTxParams {
    /// TX parameters
    pub params: TxParams,
}

impl Command for SetTxParams {
    type IdType = u8;
    type CommandParameters = TxParams;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::SetTxParams as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.params
    }
}

/// Number of symbols used for channel activity detection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CadSymbols {
    One = 0x00,
    #[default]
    Two = 0x01,
    Four = 0x02,
    Eight = 0x03,
    Sixteen = 0x04,
}

/// What the chip does once CAD completes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CadExitMode {
    /// Return to STDBY_RC
    #[default]
    CadOnly = 0x00,
    /// Stay in RX when activity was detected
    CadRx = 0x01,
}

/// Channel activity detection parameters, LoRa only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CadParams {
    /// Symbols to listen for
    pub symbols: CadSymbols,
    /// Detection peak threshold
    pub detect_peak: u8,
    /// Detection minimum threshold
    pub detect_min: u8,
    /// Exit behaviour
    pub exit_mode: CadExitMode,
    /// RX timeout after detection in [`CadExitMode::CadRx`], 24-bit, 15.625 μs steps
    pub timeout: u32,
}

impl ToByteArray for CadParams {
    type Error = Infallible;
    type Array = [u8; 7];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let [_, t2, t1, t0] = self.timeout.to_be_bytes();
        Ok([
            self.symbols as u8,
            self.detect_peak,
            self.detect_min,
            self.exit_mode as u8,
            t2,
            t1,
            t0,
        ])
    }
}

/// SetCadParams command (0x88)
#[derive(Debug, Clone)]
pub struct SetCadParams {
    /// CAD parameters
    pub params: CadParams,
}

impl Command for SetCadParams {
    type IdType = u8;
    type CommandParameters = CadParams;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::SetCadParams as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.params
    }
}

/// Buffer base addresses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BufferBaseAddressConfig {
    /// Start of the TX payload
    pub tx_base_addr: u8,
    /// Start of the RX payload
    pub rx_base_addr: u8,
}

impl ToByteArray for BufferBaseAddressConfig {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.tx_base_addr, self.rx_base_addr])
    }
}

/// SetBufferBaseAddress command (0x8F)
///
/// The 256-byte buffer is shared; an oversized RX packet can run into the TX area.
#[derive(Debug, Clone)]
pub struct SetBufferBaseAddress {
    /// Base addresses
    pub config: BufferBaseAddressConfig,
}

impl Command for SetBufferBaseAddress {
    type IdType = u8;
    type CommandParameters = BufferBaseAddressConfig;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::SetBufferBaseAddress as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.config
    }
}

/// SetLoRaSymbNumTimeout command (0xA0)
///
/// Number of symbols the modem waits for before validating a reception.
/// Zero validates on the first detected symbol.
#[derive(Debug, Clone)]
pub struct SetLoRaSymbNumTimeout {
    /// Symbol count
    pub symbols: u8,
}

impl ToByteArray for SetLoRaSymbNumTimeout {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.symbols])
    }
}

impl Command for SetLoRaSymbNumTimeout {
    type IdType = u8;
    type CommandParameters = Self;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::SetLoRaSymbTimeout as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self
    }
}
