//! DIO and IRQ control commands
//!
//! The SX126x has 3 DIO pins and 10 interrupt sources. Any interrupt can be
//! routed to any DIO; several interrupts on one pin are OR-ed together.
//! DIO2 and DIO3 can instead be dedicated to the RF switch and the TCXO
//! supply respectively.

use core::convert::Infallible;

use regiface::{Command, NoParameters, ToByteArray};

use super::Opcode;
use crate::irq::IrqMask;

/// Interrupt enable and routing masks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DioIrqConfig {
    /// Interrupts latched in the IRQ status register
    pub irq_mask: IrqMask,
    /// Interrupts routed to DIO1
    pub dio1_mask: IrqMask,
    /// Interrupts routed to DIO2, ignored when DIO2 drives the RF switch
    pub dio2_mask: IrqMask,
    /// Interrupts routed to DIO3, ignored when DIO3 drives the TCXO
    pub dio3_mask: IrqMask,
}

impl DioIrqConfig {
    /// Enables `mask` and routes it to DIO1 only
    pub fn dio1(mask: IrqMask) -> Self {
        Self {
            irq_mask: mask,
            dio1_mask: mask,
            dio2_mask: IrqMask::empty(),
            dio3_mask: IrqMask::empty(),
        }
    }
}

impl ToByteArray for DioIrqConfig {
    type Error = Infallible;
    type Array = [u8; 8];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let mut bytes = [0u8; 8];
        bytes[0..2].copy_from_slice(&self.irq_mask.bits().to_be_bytes());
        bytes[2..4].copy_from_slice(&self.dio1_mask.bits().to_be_bytes());
        bytes[4..6].copy_from_slice(&self.dio2_mask.bits().to_be_bytes());
        bytes[6..8].copy_from_slice(&self.dio3_mask.bits().to_be_bytes());
        Ok(bytes)
    }
}

/// SetDioIrqParams command (0x08)
#[derive(Debug, Clone)]
pub struct SetDioIrqParams {
    /// Enable and routing masks
    pub config: DioIrqConfig,
}

impl Command for SetDioIrqParams {
    type IdType = u8;
    type CommandParameters = DioIrqConfig;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::ConfigDioIrq as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.config
    }
}

/// GetIrqStatus command (0x12)
///
/// Reading does not clear anything; use [`ClearIrqStatus`].
#[derive(Debug, Clone)]
pub struct GetIrqStatus;

impl Command for GetIrqStatus {
    type IdType = u8;
    type CommandParameters = NoParameters;
    type ResponseParameters = IrqMask;

    fn id() -> Self::IdType {
        Opcode::GetIrqStatus as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

impl ToByteArray for IrqMask {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.bits().to_be_bytes())
    }
}

/// ClearIrqStatus command (0x02)
#[derive(Debug, Clone)]
pub struct ClearIrqStatus {
    /// Flags to clear
    pub mask: IrqMask,
}

impl Command for ClearIrqStatus {
    type IdType = u8;
    type CommandParameters = IrqMask;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::ClearIrqStatus as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.mask
    }
}

/// SetDio2AsRfSwitchCtrl command (0x9D)
///
/// When enabled DIO2 is high in TX and low otherwise, overriding any IRQ
/// routing on DIO2.
#[derive(Debug, Clone)]
pub struct SetDio2AsRfSwitchCtrl {
    /// Drive the RF switch from DIO2
    pub enable: bool,
}

impl ToByteArray for SetDio2AsRfSwitchCtrl {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.enable as u8])
    }
}

impl Command for SetDio2AsRfSwitchCtrl {
    type IdType = u8;
    type CommandParameters = Self;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::SetRfSwitchMode as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self
    }
}

/// TCXO supply voltage on DIO3
///
/// VBAT must be at least 200mV above the selected voltage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TcxoVoltage {
    V1_6 = 0x00,
    V1_7 = 0x01,
    #[default]
    V1_8 = 0x02,
    V2_2 = 0x03,
    V2_4 = 0x04,
    V2_7 = 0x05,
    V3_0 = 0x06,
    V3_3 = 0x07,
}

/// TCXO control configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TcxoConfig {
    /// Supply voltage
    pub voltage: TcxoVoltage,
    /// Start-up delay, a 24-bit count of 15.625 μs steps
    pub delay: u32,
}

impl ToByteArray for TcxoConfig {
    type Error = Infallible;
    type Array = [u8; 4];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let [_, d2, d1, d0] = self.delay.to_be_bytes();
        Ok([self.voltage as u8, d2, d1, d0])
    }
}

/// SetDio3AsTcxoCtrl command (0x97)
///
/// Once enabled, only a full reset returns the chip to XOSC operation.
#[derive(Debug, Clone)]
pub struct SetDio3AsTcxoCtrl {
    /// TCXO configuration
    pub config: TcxoConfig,
}

impl Command for SetDio3AsTcxoCtrl {
    type IdType = u8;
    type CommandParameters = TcxoConfig;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::SetTcxoMode as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dio_masks_are_big_endian() {
        let config = DioIrqConfig::dio1(IrqMask::TX_DONE | IrqMask::RX_TX_TIMEOUT);
        assert_eq!(
            config.to_bytes(),
            Ok([0x02, 0x01, 0x02, 0x01, 0x00, 0x00, 0x00, 0x00])
        );
    }

    #[test]
    fn tcxo_delay_is_24_bit() {
        let config = TcxoConfig {
            voltage: TcxoVoltage::V3_3,
            delay: 0x000140,
        };
        assert_eq!(config.to_bytes(), Ok([0x07, 0x00, 0x01, 0x40]));
    }
}
