//! SPI transport for the SX126x
//!
//! Every exchange with the radio is one chip-select framed transaction that
//! may only start once the BUSY line has been released. The [`Transport`]
//! trait captures that contract so the command codec never has to deal with
//! pins or timing itself.
//!
//! [`SpiInterface`] is the `embedded-hal` implementation:
//! - NSS is driven manually, with configurable polarity
//! - BUSY is polled at a fixed interval up to a bounded timeout
//! - Reads clock out NOP (`0x00`) filler bytes
//!
//! # Wake-up
//! A sleeping radio holds BUSY high, so the wake-up sequence is the only
//! transaction that does not wait on BUSY before asserting NSS.

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
    spi::{Operation, SpiBus},
};

use crate::{commands::Opcode, Error};

/// Filler byte shifted out while clocking in response bytes
pub const NOP: u8 = 0x00;

/// Active level of a control line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Line is asserted when driven low
    #[default]
    ActiveLow,
    /// Line is asserted when driven high
    ActiveHigh,
}

/// Electrical configuration of the SPI interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterfaceConfig {
    /// Active level of NSS
    pub chip_select: Polarity,
    /// Active level of NRESET
    pub reset: Polarity,
    /// Longest time to wait for BUSY to be released before giving up
    pub busy_timeout_us: u32,
    /// Interval between two samples of BUSY
    pub busy_poll_interval_us: u32,
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            chip_select: Polarity::ActiveLow,
            reset: Polarity::ActiveLow,
            busy_timeout_us: 20_000,
            busy_poll_interval_us: 10,
        }
    }
}

/// Framed, busy-aware byte exchange with the radio
pub trait Transport {
    /// Waits for BUSY, asserts NSS, runs `operations` and releases NSS.
    ///
    /// # Errors
    /// * `Error::BusTimeout` - BUSY was never released; NSS is left untouched
    /// * `Error::Spi` / `Error::Pin` - the HAL reported an error
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Error>;

    /// Shifts out `command` followed by `out`, then clocks in `input.len()` bytes
    fn transfer(&mut self, command: u8, out: &[u8], input: &mut [u8]) -> Result<(), Error> {
        self.transaction(&mut [
            Operation::Write(&[command]),
            Operation::Write(out),
            Operation::Read(input),
        ])
    }

    /// Wakes the radio from sleep by framing a GetStatus without waiting on BUSY
    fn wakeup(&mut self) -> Result<(), Error>;

    /// Pulses the reset line
    fn reset(&mut self) -> Result<(), Error>;

    /// Blocks for `ms` milliseconds
    fn delay_ms(&mut self, ms: u32);
}

/// `embedded-hal` backed [`Transport`]
pub struct SpiInterface<SPI, NSS, BUSY, RESET, DELAY> {
    spi: SPI,
    nss: NSS,
    busy: BUSY,
    reset: RESET,
    delay: DELAY,
    config: InterfaceConfig,
}

impl<SPI, NSS, BUSY, RESET, DELAY> SpiInterface<SPI, NSS, BUSY, RESET, DELAY> {
    /// Creates a new interface from an SPI bus and the radio's control lines.
    ///
    /// # Arguments
    /// * `spi` - The SPI bus, mode 0, MSB first
    /// * `nss` - Chip select, driven by this interface
    /// * `busy` - The radio's BUSY output
    /// * `reset` - The radio's NRESET input
    /// * `delay` - Delay provider used for BUSY polling and reset timing
    pub fn new(
        spi: SPI,
        nss: NSS,
        busy: BUSY,
        reset: RESET,
        delay: DELAY,
        config: InterfaceConfig,
    ) -> Self {
        Self {
            spi,
            nss,
            busy,
            reset,
            delay,
            config,
        }
    }

    /// Releases the bus and control pins
    pub fn release(self) -> (SPI, NSS, BUSY, RESET, DELAY) {
        (self.spi, self.nss, self.busy, self.reset, self.delay)
    }
}

fn drive<P: OutputPin>(pin: &mut P, polarity: Polarity, asserted: bool) -> Result<(), Error> {
    let high = asserted == (polarity == Polarity::ActiveHigh);
    if high {
        pin.set_high().map_err(|_| Error::Pin)
    } else {
        pin.set_low().map_err(|_| Error::Pin)
    }
}

impl<SPI, NSS, BUSY, RESET, DELAY> SpiInterface<SPI, NSS, BUSY, RESET, DELAY>
where
    SPI: SpiBus,
    NSS: OutputPin,
    BUSY: InputPin,
    RESET: OutputPin,
    DELAY: DelayNs,
{
    fn select(&mut self) -> Result<(), Error> {
        drive(&mut self.nss, self.config.chip_select, true)
    }

    fn deselect(&mut self) -> Result<(), Error> {
        drive(&mut self.nss, self.config.chip_select, false)
    }

    fn wait_busy(&mut self) -> Result<(), Error> {
        let step = self.config.busy_poll_interval_us.max(1);
        let mut waited = 0u32;
        while self.busy.is_high().map_err(|_| Error::Pin)? {
            if waited >= self.config.busy_timeout_us {
                warn!("BUSY still high after {} us", waited);
                return Err(Error::BusTimeout);
            }
            self.delay.delay_us(step);
            waited = waited.saturating_add(step);
        }
        Ok(())
    }

    fn exchange(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Error> {
        for operation in operations.iter_mut() {
            let result = match operation {
                Operation::Write(bytes) => self.spi.write(bytes),
                Operation::Read(buffer) => {
                    buffer.fill(NOP);
                    self.spi.transfer_in_place(buffer)
                }
                Operation::Transfer(read, write) => self.spi.transfer(read, write),
                Operation::TransferInPlace(buffer) => self.spi.transfer_in_place(buffer),
                Operation::DelayNs(ns) => {
                    let flushed = self.spi.flush();
                    self.delay.delay_ns(*ns);
                    flushed
                }
            };
            result.map_err(|_| Error::Spi)?;
        }
        self.spi.flush().map_err(|_| Error::Spi)
    }
}

impl<SPI, NSS, BUSY, RESET, DELAY> Transport for SpiInterface<SPI, NSS, BUSY, RESET, DELAY>
where
    SPI: SpiBus,
    NSS: OutputPin,
    BUSY: InputPin,
    RESET: OutputPin,
    DELAY: DelayNs,
{
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Error> {
        self.wait_busy()?;
        self.select()?;
        let result = self.exchange(operations);
        let released = self.deselect();
        result.and(released)
    }

    fn wakeup(&mut self) -> Result<(), Error> {
        self.select()?;
        let result = self
            .spi
            .write(&[Opcode::GetStatus as u8, NOP])
            .and_then(|_| self.spi.flush())
            .map_err(|_| Error::Spi);
        let released = self.deselect();
        result.and(released)?;
        self.wait_busy()
    }

    fn reset(&mut self) -> Result<(), Error> {
        self.delay.delay_ms(20);
        drive(&mut self.reset, self.config.reset, true)?;
        self.delay.delay_ms(50);
        drive(&mut self.reset, self.config.reset, false)?;
        self.delay.delay_ms(20);
        Ok(())
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}
