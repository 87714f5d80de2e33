//! Status commands
//!
//! Status byte, signal measurements, error flags and packet statistics.
//! None of these change the operating mode.

use bitflags::bitflags;
use core::convert::Infallible;

use regiface::{Command, FromByteArray, NoParameters, ToByteArray};

use super::Opcode;

/// Chip mode reported in bits 6:4 of the status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipMode {
    StandbyRc,
    StandbyXosc,
    FrequencySynthesizer,
    Receive,
    Transmit,
    /// Unused or RFU encoding
    Reserved(u8),
}

impl From<u8> for ChipMode {
    fn from(value: u8) -> Self {
        match value {
            0x2 => Self::StandbyRc,
            0x3 => Self::StandbyXosc,
            0x4 => Self::FrequencySynthesizer,
            0x5 => Self::Receive,
            0x6 => Self::Transmit,
            other => Self::Reserved(other),
        }
    }
}

/// Outcome of the last command, bits 3:1 of the status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandStatus {
    /// Data is available to be read from the radio
    DataAvailable,
    /// Command timed out
    Timeout,
    /// Invalid opcode or parameters
    ProcessingError,
    /// Command could not be executed
    ExecutionFailure,
    /// Transmission complete
    TxDone,
    /// Unused or RFU encoding
    Reserved(u8),
}

impl From<u8> for CommandStatus {
    fn from(value: u8) -> Self {
        match value {
            0x2 => Self::DataAvailable,
            0x3 => Self::Timeout,
            0x4 => Self::ProcessingError,
            0x5 => Self::ExecutionFailure,
            0x6 => Self::TxDone,
            other => Self::Reserved(other),
        }
    }
}

/// Decoded status byte
///
/// # Status Byte Format
/// - Bit 7: CPU busy
/// - Bits 6:4: Chip mode
/// - Bits 3:1: Command status
/// - Bit 0: Reserved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioStatus {
    /// Current chip mode
    pub chip_mode: ChipMode,
    /// Status of the last command
    pub command_status: CommandStatus,
    /// Internal CPU busy flag
    pub cpu_busy: bool,
    /// Raw status byte
    pub raw: u8,
}

impl From<u8> for RadioStatus {
    fn from(raw: u8) -> Self {
        Self {
            chip_mode: ChipMode::from((raw >> 4) & 0x7),
            command_status: CommandStatus::from((raw >> 1) & 0x7),
            cpu_busy: raw & 0x80 != 0,
            raw,
        }
    }
}

impl FromByteArray for RadioStatus {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self::from(bytes[0]))
    }
}

/// GetStatus command (0xC0)
///
/// The status byte returned right after the opcode is the payload.
#[derive(Debug, Clone)]
pub struct GetStatus;

impl Command for GetStatus {
    type IdType = u8;
    type CommandParameters = NoParameters;
    type ResponseParameters = RadioStatus;

    fn id() -> Self::IdType {
        Opcode::GetStatus as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// Raw instantaneous RSSI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RssiInst(pub u8);

impl RssiInst {
    /// Signal power in dBm, `-raw / 2`
    pub fn dbm(self) -> i16 {
        -((self.0 / 2) as i16)
    }
}

impl FromByteArray for RssiInst {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self(bytes[0]))
    }
}

/// GetRssiInst command (0x15)
///
/// Only meaningful in RX.
#[derive(Debug, Clone)]
pub struct GetRssiInst;

impl Command for GetRssiInst {
    type IdType = u8;
    type CommandParameters = NoParameters;
    type ResponseParameters = RssiInst;

    fn id() -> Self::IdType {
        Opcode::GetRssiInst as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// Last received packet in the data buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxBufferStatus {
    /// Payload length in bytes
    pub payload_length: u8,
    /// Buffer offset of the first payload byte
    pub buffer_pointer: u8,
}

impl FromByteArray for RxBufferStatus {
    type Error = Infallible;
    type Array = [u8; 2];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            payload_length: bytes[0],
            buffer_pointer: bytes[1],
        })
    }
}

/// GetRxBufferStatus command (0x13)
#[derive(Debug, Clone)]
pub struct GetRxBufferStatus;

impl Command for GetRxBufferStatus {
    type IdType = u8;
    type CommandParameters = NoParameters;
    type ResponseParameters = RxBufferStatus;

    fn id() -> Self::IdType {
        Opcode::GetRxBufferStatus as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// Undecoded packet status
///
/// The three bytes mean different things per packet type; see
/// [`PacketStatus`](crate::radio::PacketStatus) for the decoded form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawPacketStatus(pub [u8; 3]);

impl FromByteArray for RawPacketStatus {
    type Error = Infallible;
    type Array = [u8; 3];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self(bytes))
    }
}

/// GetPacketStatus command (0x14)
#[derive(Debug, Clone)]
pub struct GetPacketStatus;

impl Command for GetPacketStatus {
    type IdType = u8;
    type CommandParameters = NoParameters;
    type ResponseParameters = RawPacketStatus;

    fn id() -> Self::IdType {
        Opcode::GetPacketStatus as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

bitflags! {
    /// Device error flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DeviceErrors: u16 {
        /// RC64k calibration failed
        const RC64K_CALIB = 1 << 0;
        /// RC13M calibration failed
        const RC13M_CALIB = 1 << 1;
        /// PLL calibration failed
        const PLL_CALIB = 1 << 2;
        /// ADC calibration failed
        const ADC_CALIB = 1 << 3;
        /// Image calibration failed
        const IMG_CALIB = 1 << 4;
        /// XOSC failed to start, expected at power-up with a TCXO
        const XOSC_START = 1 << 5;
        /// PLL failed to lock
        const PLL_LOCK = 1 << 6;
        /// PA ramp failed
        const PA_RAMP = 1 << 8;
    }
}

impl FromByteArray for DeviceErrors {
    type Error = Infallible;
    type Array = [u8; 2];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self::from_bits_retain(u16::from_be_bytes(bytes)))
    }
}

/// GetDeviceErrors command (0x17)
#[derive(Debug, Clone)]
pub struct GetDeviceErrors;

impl Command for GetDeviceErrors {
    type IdType = u8;
    type CommandParameters = NoParameters;
    type ResponseParameters = DeviceErrors;

    fn id() -> Self::IdType {
        Opcode::GetError as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// Zero filled parameter block required by some commands
#[derive(Debug, Clone, Copy, Default)]
pub struct Zeroes<const N: usize>;

impl<const N: usize> ToByteArray for Zeroes<N> {
    type Error = Infallible;
    type Array = [u8; N];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([0u8; N])
    }
}

/// ClearDeviceErrors command (0x07)
///
/// Clears every error flag at once.
#[derive(Debug, Clone)]
pub struct ClearDeviceErrors;

impl Command for ClearDeviceErrors {
    type IdType = u8;
    type CommandParameters = Zeroes<2>;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::ClearDeviceErrors as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        Zeroes
    }
}

/// Packet reception statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stats {
    /// Packets received
    pub packets_received: u16,
    /// Packets with a CRC error
    pub packets_crc_error: u16,
    /// LoRa header errors, or FSK length errors
    pub packets_header_error: u16,
}

impl FromByteArray for Stats {
    type Error = Infallible;
    type Array = [u8; 6];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            packets_received: u16::from_be_bytes([bytes[0], bytes[1]]),
            packets_crc_error: u16::from_be_bytes([bytes[2], bytes[3]]),
            packets_header_error: u16::from_be_bytes([bytes[4], bytes[5]]),
        })
    }
}

/// GetStats command (0x10)
#[derive(Debug, Clone)]
pub struct GetStats;

impl Command for GetStats {
    type IdType = u8;
    type CommandParameters = NoParameters;
    type ResponseParameters = Stats;

    fn id() -> Self::IdType {
        Opcode::GetStats as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// ResetStats command (0x00)
#[derive(Debug, Clone)]
pub struct ResetStats;

impl Command for ResetStats {
    type IdType = u8;
    type CommandParameters = Zeroes<6>;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::ResetStats as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        Zeroes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_byte_fields() {
        let status = RadioStatus::from(0b1101_1100);
        assert_eq!(status.chip_mode, ChipMode::Receive);
        assert_eq!(status.command_status, CommandStatus::TxDone);
        assert!(status.cpu_busy);

        let status = RadioStatus::from(0x22);
        assert_eq!(status.chip_mode, ChipMode::StandbyRc);
        assert_eq!(status.command_status, CommandStatus::Reserved(1));
        assert!(!status.cpu_busy);
    }

    #[test]
    fn rssi_is_negative_half() {
        assert_eq!(RssiInst(0).dbm(), 0);
        assert_eq!(RssiInst(0xB4).dbm(), -90);
        assert_eq!(RssiInst(0xFF).dbm(), -127);
    }

    #[test]
    fn device_errors_span_both_bytes() {
        let errors = DeviceErrors::from_bytes([0x01, 0x20]).unwrap();
        assert_eq!(errors, DeviceErrors::PA_RAMP | DeviceErrors::XOSC_START);
    }
}
