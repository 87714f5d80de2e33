//! Radio command implementations
//!
//! Every fixed-format SX126x command is a `regiface` [`Command`](regiface::Command)
//! whose parameters serialize to the exact byte layout the chip expects.
//! Responses never include the status byte the chip shifts out ahead of the
//! payload; [`Device`](crate::Device) consumes it before decoding.
//!
//! # Command Categories
//! - [`dio`]: IRQ mapping, IRQ status, RF switch and TCXO control
//! - [`operational`]: operating modes, calibration, regulator and PA setup
//! - [`rf`]: frequency, packet type, TX power, CAD and buffer layout
//! - [`status`]: status byte, RSSI, packet status, errors and statistics
//!
//! Modulation and packet parameters depend on the packet type and have no
//! fixed length, so they are built by [`config`](crate::config) and written
//! through [`Opcode::SetModulationParams`] and [`Opcode::SetPacketParams`].

pub mod dio;
pub mod operational;
pub mod rf;
pub mod status;

pub use dio::*;
pub use operational::*;
pub use rf::*;
pub use status::*;

/// SX126x command opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Opcode {
    GetStatus = 0xC0,
    WriteRegister = 0x0D,
    ReadRegister = 0x1D,
    WriteBuffer = 0x0E,
    ReadBuffer = 0x1E,
    SetSleep = 0x84,
    SetStandby = 0x80,
    SetFs = 0xC1,
    SetTx = 0x83,
    SetRx = 0x82,
    SetRxDutyCycle = 0x94,
    SetCad = 0xC5,
    SetTxContinuousWave = 0xD1,
    SetTxInfinitePreamble = 0xD2,
    SetPacketType = 0x8A,
    GetPacketType = 0x11,
    SetRfFrequency = 0x86,
    SetTxParams = 0x8E,
    SetPaConfig = 0x95,
    SetCadParams = 0x88,
    SetBufferBaseAddress = 0x8F,
    SetModulationParams = 0x8B,
    SetPacketParams = 0x8C,
    GetRxBufferStatus = 0x13,
    GetPacketStatus = 0x14,
    GetRssiInst = 0x15,
    GetStats = 0x10,
    ResetStats = 0x00,
    ConfigDioIrq = 0x08,
    GetIrqStatus = 0x12,
    ClearIrqStatus = 0x02,
    Calibrate = 0x89,
    CalibrateImage = 0x98,
    SetRegulatorMode = 0x96,
    GetError = 0x17,
    ClearDeviceErrors = 0x07,
    SetTcxoMode = 0x97,
    SetTxFallbackMode = 0x93,
    SetRfSwitchMode = 0x9D,
    SetStopRxTimerOnPreamble = 0x9F,
    SetLoRaSymbTimeout = 0xA0,
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        const ALL: [Opcode; 41] = [
            Opcode::GetStatus,
            Opcode::WriteRegister,
            Opcode::ReadRegister,
            Opcode::WriteBuffer,
            Opcode::ReadBuffer,
            Opcode::SetSleep,
            Opcode::SetStandby,
            Opcode::SetFs,
            Opcode::SetTx,
            Opcode::SetRx,
            Opcode::SetRxDutyCycle,
            Opcode::SetCad,
            Opcode::SetTxContinuousWave,
            Opcode::SetTxInfinitePreamble,
            Opcode::SetPacketType,
            Opcode::GetPacketType,
            Opcode::SetRfFrequency,
            Opcode::SetTxParams,
            Opcode::SetPaConfig,
            Opcode::SetCadParams,
            Opcode::SetBufferBaseAddress,
            Opcode::SetModulationParams,
            Opcode::SetPacketParams,
            Opcode::GetRxBufferStatus,
            Opcode::GetPacketStatus,
            Opcode::GetRssiInst,
            Opcode::GetStats,
            Opcode::ResetStats,
            Opcode::ConfigDioIrq,
            Opcode::GetIrqStatus,
            Opcode::ClearIrqStatus,
            Opcode::Calibrate,
            Opcode::CalibrateImage,
            Opcode::SetRegulatorMode,
            Opcode::GetError,
            Opcode::ClearDeviceErrors,
            Opcode::SetTcxoMode,
            Opcode::SetTxFallbackMode,
            Opcode::SetRfSwitchMode,
            Opcode::SetStopRxTimerOnPreamble,
            Opcode::SetLoRaSymbTimeout,
        ];
        ALL.into_iter()
            .find(|opcode| *opcode as u8 == value)
            .ok_or(value)
    }
}
