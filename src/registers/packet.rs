//! Packet handling registers
//!
//! GFSK whitening, CRC and sync word settings, plus the LoRa registers the
//! driver consults for implicit-header packets and network separation.

use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// Whitening seed register pair (address: 0x06B8)
///
/// The seed is 9 bits wide. Bit 8 lives in bit 0 of the first register,
/// whose upper 7 bits belong to other settings and must be preserved.
#[register(0x06B8u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct WhiteningInitialValue {
    pub msb: u8,
    pub lsb: u8,
}

impl WhiteningInitialValue {
    /// Replaces the seed, keeping the unrelated bits of the MSB register
    pub fn with_seed(self, seed: u16) -> Self {
        Self {
            msb: (self.msb & 0xFE) | ((seed >> 8) as u8 & 0x01),
            lsb: seed as u8,
        }
    }

    pub fn seed(&self) -> u16 {
        (((self.msb & 0x01) as u16) << 8) | self.lsb as u16
    }
}

/// GFSK CRC initial value register (address: 0x06BC)
#[register(0x06BCu16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct CrcInitialValue {
    pub value: u16,
}

/// GFSK CRC polynomial register (address: 0x06BE)
#[register(0x06BEu16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct CrcPolynomial {
    pub value: u16,
}

/// GFSK sync word register (address: 0x06C0)
///
/// Only the first `sync_word_length` bytes of the packet params are used.
#[register(0x06C0u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct SyncWord {
    pub value: [u8; 8],
}

/// LoRa received payload length (address: 0x0702)
///
/// Holds the configured length of implicit-header packets, which the RX
/// buffer status does not report.
#[register(0x0702u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister)]
pub struct LoRaPayloadLength {
    pub length: u8,
}

/// LoRa packet configuration (address: 0x0704)
#[register(0x0704u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister)]
pub struct LoRaPacketConfig {
    /// Bit 7: header disabled
    pub implicit_header: bool,
}

/// LoRa sync word register (address: 0x0740)
///
/// Private networks use 0x1424, public networks 0x3444.
#[register(0x0740u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct LoRaSyncWord {
    pub value: u16,
}

/// First of the three LoRa frequency error registers (address: 0x076B)
pub const FREQ_ERROR_BASE: u16 = 0x076B;

impl FromByteArray for WhiteningInitialValue {
    type Error = Infallible;
    type Array = [u8; 2];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            msb: bytes[0],
            lsb: bytes[1],
        })
    }
}

impl ToByteArray for WhiteningInitialValue {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.msb, self.lsb])
    }
}

impl FromByteArray for CrcInitialValue {
    type Error = Infallible;
    type Array = [u8; 2];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            value: u16::from_be_bytes(bytes),
        })
    }
}

impl ToByteArray for CrcInitialValue {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.value.to_be_bytes())
    }
}

impl FromByteArray for CrcPolynomial {
    type Error = Infallible;
    type Array = [u8; 2];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            value: u16::from_be_bytes(bytes),
        })
    }
}

impl ToByteArray for CrcPolynomial {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.value.to_be_bytes())
    }
}

impl FromByteArray for SyncWord {
    type Error = Infallible;
    type Array = [u8; 8];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self { value: bytes })
    }
}

impl ToByteArray for SyncWord {
    type Error = Infallible;
    type Array = [u8; 8];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.value)
    }
}

impl FromByteArray for LoRaPayloadLength {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self { length: bytes[0] })
    }
}

impl FromByteArray for LoRaPacketConfig {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            implicit_header: bytes[0] & 0x80 != 0,
        })
    }
}

impl FromByteArray for LoRaSyncWord {
    type Error = Infallible;
    type Array = [u8; 2];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            value: u16::from_be_bytes(bytes),
        })
    }
}

impl ToByteArray for LoRaSyncWord {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.value.to_be_bytes())
    }
}
