#![cfg_attr(not(test), no_std)]
//! SX126x Radio Driver
//!
//! This crate provides a protocol and state driver for the Semtech SX1261/2 sub-GHz radio
//! transceivers, built on the `embedded-hal` 1.0 traits. The SX1261/2 are highly integrated,
//! long range, low power radio transceivers designed for use in ISM band applications.
//!
//! # Features
//! - Frequency range: 150-960 MHz
//! - Modulation support:
//!   - LoRa: SF5-12, BW 7.8-500kHz
//!   - (G)FSK: BR 0.6-300kbps
//! - Output power:
//!   - SX1261: -17 to +15 dBm
//!   - SX1262: -9 to +22 dBm
//! - Operating mode tracking with automatic wake-up from sleep
//! - Interrupt decoding with immediate or polled delivery
//!
//! # Architecture
//! The driver is organized into several modules:
//!
//! - [`transport`]: Busy-aware, chip-select framed SPI exchange
//!   - [`Transport`] is the seam towards the board
//!   - [`SpiInterface`] implements it over `embedded-hal`
//!
//! - [`device`]: Command codec
//!   - Frames commands, register and buffer accesses
//!   - Mirrors operating mode and packet type
//!
//! - [`commands`]: Command interface for radio control
//!   - [`commands::rf`]: RF and packet type configuration
//!   - [`commands::dio`]: DIO and interrupt control
//!   - [`commands::operational`]: Operating mode control
//!   - [`commands::status`]: Status monitoring and statistics
//!
//! - [`registers`]: Register definitions for direct hardware access
//!
//! - [`config`]: Board configuration, modulation and packet parameters
//!
//! - [`irq`]: Interrupt decoding, event handlers and the pending flag
//!
//! - [`radio`]: The [`Sx126x`] driver tying everything together
//!
//! # Usage
//! The driver uses the `regiface` crate to provide a type-safe interface
//! for register access and command execution. Most applications only need
//! [`Sx126x`]; [`Device`] stays available for raw access.
//!
//! Configuration follows a specific sequence:
//!
//! 1. Create a [`Transport`] and an [`Sx126x`] instance
//! 2. Call [`Sx126x::init`] to reset the chip into STDBY_RC with LoRa selected
//! 3. Set RF frequency and modulation parameters
//! 4. Configure packet format and processing
//! 5. Set up DIO pins and interrupts
//! 6. Enter RX/TX mode for operation
//!
//! # Important Notes
//! - Most configuration must be done in STDBY_RC mode
//! - Packet type must be set before other RF configuration; the driver re-issues
//!   it when modulation or packet parameters of another type are set
//! - PA configuration depends on device type (SX1261/2)
//! - Once DIO3 powers a TCXO, only a reset returns the chip to crystal operation
//!
//! # Example
//! ```no_run
//! use embedded_hal::{delay::DelayNs, digital::{InputPin, OutputPin}, spi::SpiBus};
//! use sx126x_driver::{
//!     commands::{RampTime, Timeout},
//!     Config, Delivery, Error, InterfaceConfig, SpiInterface, Sx126x,
//! };
//!
//! fn beacon<SPI, NSS, BUSY, RESET, DELAY>(
//!     spi: SPI,
//!     nss: NSS,
//!     busy: BUSY,
//!     reset: RESET,
//!     delay: DELAY,
//! ) -> Result<(), Error>
//! where
//!     SPI: SpiBus,
//!     NSS: OutputPin,
//!     BUSY: InputPin,
//!     RESET: OutputPin,
//!     DELAY: DelayNs,
//! {
//!     let interface = SpiInterface::new(spi, nss, busy, reset, delay, InterfaceConfig::default());
//!     let mut radio = Sx126x::new(interface, Config::default(), Delivery::Immediate);
//!
//!     radio.init()?;
//!     radio.set_rf_frequency(868_100_000)?;
//!     radio.set_tx_params(14, RampTime::Micros200)?;
//!     radio.send_payload(b"hello", Timeout::NONE)
//! }
//! ```

#[macro_use]
mod fmt;

pub mod commands;
pub mod config;
pub mod device;
pub mod error;
pub mod irq;
pub mod mode;
pub mod radio;
pub mod registers;
pub mod transport;

#[cfg(test)]
mod fixtures;

pub use commands::*;
pub use config::Config;
pub use device::Device;
pub use error::Error;
pub use irq::{PendingIrq, RadioEvent, RadioEvents};
pub use mode::OperatingMode;
pub use radio::{Delivery, PacketStatus, Sx126x};
pub use registers::*;
pub use transport::{InterfaceConfig, Polarity, SpiInterface, Transport};
