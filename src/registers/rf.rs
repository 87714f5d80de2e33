//! RF-related registers
//!
//! Random number generation, RX gain and PA over-current protection.

use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// Random number generator register (address: 0x0819)
///
/// Only produces entropy while the receiver is running.
#[register(0x0819u16)]
#[derive(Debug, Clone, Copy, ReadableRegister)]
pub struct RandomNumber {
    pub value: u32,
}

/// Error type for RX gain mode conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidGainMode(pub u8);

/// RX gain register (address: 0x08AC)
///
/// Not retained in sleep.
#[register(0x08ACu16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ReadableRegister, WritableRegister)]
pub enum RxGain {
    /// Lower current, ~3dB less sensitivity
    #[default]
    PowerSaving,
    /// Maximum sensitivity
    Boosted,
}

impl RxGain {
    pub fn from_byte(value: u8) -> Result<Self, InvalidGainMode> {
        match value {
            0x94 => Ok(Self::PowerSaving),
            0x96 => Ok(Self::Boosted),
            invalid => Err(InvalidGainMode(invalid)),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Self::PowerSaving => 0x94,
            Self::Boosted => 0x96,
        }
    }
}

/// OCP configuration register (address: 0x08E7)
///
/// Current limit in steps of 2.5mA. SetPaConfig resets it to the chip
/// default, so it has to be written afterwards.
#[register(0x08E7u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct OcpConfiguration {
    pub threshold: u8,
}

impl OcpConfiguration {
    /// 60mA
    pub const SX1261: Self = Self { threshold: 0x18 };
    /// 140mA
    pub const SX1262: Self = Self { threshold: 0x38 };
}

impl FromByteArray for RandomNumber {
    type Error = Infallible;
    type Array = [u8; 4];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            value: u32::from_be_bytes(bytes),
        })
    }
}

impl FromByteArray for RxGain {
    type Error = InvalidGainMode;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Self::from_byte(bytes[0])
    }
}

impl ToByteArray for RxGain {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.to_byte()])
    }
}

impl FromByteArray for OcpConfiguration {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            threshold: bytes[0],
        })
    }
}

impl ToByteArray for OcpConfiguration {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.threshold])
    }
}
