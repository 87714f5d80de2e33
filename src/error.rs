//! Driver error type

use crate::mode::OperatingMode;

/// Errors reported by the driver
///
/// Nothing is retried internally. Every variant is handed back to the
/// immediate caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The SPI bus reported an error
    Spi,
    /// A control pin (NSS, BUSY or NRESET) reported an error
    Pin,
    /// BUSY stayed asserted past the configured timeout
    BusTimeout,
    /// The chip reported more payload than the caller's buffer can hold
    BufferOverflow {
        /// Payload length reported by the chip
        requested: usize,
        /// Capacity of the caller's buffer
        available: usize,
    },
    /// An RX/TX timeout interrupt fired while the radio was neither in Tx nor Rx
    InconsistentState(OperatingMode),
    /// The packet type is unknown, or does not support the requested configuration
    UnsupportedPacketType(u8),
    /// A command response could not be decoded
    Deserialization,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Spi => write!(f, "SPI error"),
            Self::Pin => write!(f, "GPIO error"),
            Self::BusTimeout => write!(f, "BUSY line timeout"),
            Self::BufferOverflow {
                requested,
                available,
            } => write!(
                f,
                "payload of {} bytes does not fit in {} bytes",
                requested, available
            ),
            Self::InconsistentState(mode) => {
                write!(f, "timeout interrupt while in {:?} mode", mode)
            }
            Self::UnsupportedPacketType(raw) => write!(f, "unsupported packet type 0x{:02X}", raw),
            Self::Deserialization => write!(f, "malformed command response"),
        }
    }
}
