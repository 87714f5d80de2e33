//! Interrupt decoding and delivery
//!
//! The SX126x latches interrupt sources in a 16-bit status register and
//! raises DIO1 while any routed source is pending. A dispatch cycle reads
//! the register, clears every bit, turns the snapshot into [`RadioEvent`]s
//! with [`decode`] and hands each event to the registered [`RadioEvents`]
//! handler.
//!
//! # Delivery
//! Two disciplines are supported, chosen once at construction:
//!
//! - **Immediate**: the DIO1 interrupt handler calls
//!   [`Sx126x::on_dio_irq`](crate::Sx126x::on_dio_irq), which runs the whole
//!   dispatch cycle, SPI traffic included, in interrupt context. The driver
//!   then has to be shared as a `critical_section::Mutex<RefCell<Sx126x<..>>>`
//!   so the main loop never starts a transaction the interrupt could cut
//!   into.
//! - **Polled**: the interrupt handler only calls [`PendingIrq::raise`]. The
//!   main loop calls
//!   [`Sx126x::process_pending_irqs`](crate::Sx126x::process_pending_irqs),
//!   which takes the flag and runs the dispatch cycle outside of interrupt
//!   context.
//!
//! ```no_run
//! use sx126x_driver::PendingIrq;
//!
//! static DIO1: PendingIrq = PendingIrq::new();
//!
//! // In the DIO1 EXTI handler
//! fn on_exti() {
//!     DIO1.raise();
//! }
//! ```

use bitflags::bitflags;
use core::cell::Cell;
use core::convert::Infallible;

use critical_section::Mutex;
use regiface::FromByteArray;

use crate::{mode::OperatingMode, Error};

bitflags! {
    /// IRQ status register bits
    #[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
    pub struct IrqMask: u16 {
        const TX_DONE = 1;
        const RX_DONE = 1 << 1;
        const PREAMBLE_DETECTED = 1 << 2;
        const SYNC_WORD_VALID = 1 << 3;
        const HEADER_VALID = 1 << 4;
        const HEADER_ERROR = 1 << 5;
        const CRC_ERROR = 1 << 6;
        const CAD_DONE = 1 << 7;
        const CAD_ACTIVITY_DETECTED = 1 << 8;
        const RX_TX_TIMEOUT = 1 << 9;
    }
}

impl IrqMask {
    /// Every bit, including the reserved ones, for clearing
    pub const CLEAR_ALL: Self = Self::from_bits_retain(0xFFFF);
}

#[cfg(feature = "defmt")]
impl defmt::Format for IrqMask {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "IrqMask {{ 0b{0=0..16:016b} }}", self.bits())
    }
}

impl FromByteArray for IrqMask {
    type Error = Infallible;
    type Array = [u8; 2];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self::from_bits_retain(u16::from_be_bytes(bytes)))
    }
}

/// Kind of receive error reported through [`RadioEvents::rx_error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrqErrorCode {
    /// LoRa header CRC failed
    Header = 0x01,
    /// Sync word error
    SyncWord = 0x02,
    /// Payload CRC failed
    Crc = 0x04,
}

/// Logical event decoded from one IRQ status snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioEvent {
    TxDone,
    RxDone,
    RxError(IrqErrorCode),
    CadDone { activity: bool },
    TxTimeout,
    RxTimeout,
    PreambleDetected,
    SyncWordValid,
    HeaderValid,
}

/// Iterator over the events encoded in one IRQ snapshot, see [`decode`]
#[derive(Debug, Clone)]
pub struct Events {
    irq: IrqMask,
    mode: OperatingMode,
    step: u8,
}

/// Maps an IRQ snapshot to events, in delivery order.
///
/// A timeout is attributed to TX or RX from `mode`, the operating mode the
/// driver believed the chip to be in. A timeout in any other mode yields
/// `Err(Error::InconsistentState(mode))` in its place; the remaining events
/// are still produced.
pub fn decode(irq: IrqMask, mode: OperatingMode) -> Events {
    Events { irq, mode, step: 0 }
}

impl Events {
    fn at(&self, step: u8) -> Option<Result<RadioEvent, Error>> {
        let irq = self.irq;
        let event = match step {
            0 if irq.contains(IrqMask::TX_DONE) => RadioEvent::TxDone,
            1 if irq.contains(IrqMask::RX_DONE) => {
                if irq.contains(IrqMask::CRC_ERROR) {
                    RadioEvent::RxError(IrqErrorCode::Crc)
                } else {
                    RadioEvent::RxDone
                }
            }
            2 if irq.contains(IrqMask::CAD_DONE) => RadioEvent::CadDone {
                activity: irq.contains(IrqMask::CAD_ACTIVITY_DETECTED),
            },
            3 if irq.contains(IrqMask::RX_TX_TIMEOUT) => match self.mode {
                OperatingMode::Tx => RadioEvent::TxTimeout,
                OperatingMode::Rx => RadioEvent::RxTimeout,
                mode => return Some(Err(Error::InconsistentState(mode))),
            },
            4 if irq.contains(IrqMask::PREAMBLE_DETECTED) => RadioEvent::PreambleDetected,
            5 if irq.contains(IrqMask::SYNC_WORD_VALID) => RadioEvent::SyncWordValid,
            6 if irq.contains(IrqMask::HEADER_VALID) => RadioEvent::HeaderValid,
            7 if irq.contains(IrqMask::HEADER_ERROR) => RadioEvent::RxError(IrqErrorCode::Header),
            _ => return None,
        };
        Some(Ok(event))
    }
}

impl Iterator for Events {
    type Item = Result<RadioEvent, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.step < 8 {
            let step = self.step;
            self.step += 1;
            if let Some(item) = self.at(step) {
                return Some(item);
            }
        }
        None
    }
}

/// Event handlers
///
/// Every method defaults to doing nothing, so implementors only override
/// the events they care about.
pub trait RadioEvents {
    fn tx_done(&mut self) {}
    fn rx_done(&mut self) {}
    fn rx_preamble_detected(&mut self) {}
    fn rx_sync_word_valid(&mut self) {}
    fn rx_header_valid(&mut self) {}
    fn tx_timeout(&mut self) {}
    fn rx_timeout(&mut self) {}
    fn rx_error(&mut self, _code: IrqErrorCode) {}
    fn cad_done(&mut self, _activity_detected: bool) {}

    /// Routes `event` to its handler
    fn deliver(&mut self, event: RadioEvent) {
        match event {
            RadioEvent::TxDone => self.tx_done(),
            RadioEvent::RxDone => self.rx_done(),
            RadioEvent::RxError(code) => self.rx_error(code),
            RadioEvent::CadDone { activity } => self.cad_done(activity),
            RadioEvent::TxTimeout => self.tx_timeout(),
            RadioEvent::RxTimeout => self.rx_timeout(),
            RadioEvent::PreambleDetected => self.rx_preamble_detected(),
            RadioEvent::SyncWordValid => self.rx_sync_word_valid(),
            RadioEvent::HeaderValid => self.rx_header_valid(),
        }
    }
}

/// No handlers registered
impl RadioEvents for () {}

/// Pending-interrupt flag shared between the DIO1 handler and the main loop
///
/// Single producer, single consumer. Both sides touch the flag inside a
/// critical section only.
#[derive(Debug)]
pub struct PendingIrq {
    flag: Mutex<Cell<bool>>,
}

impl PendingIrq {
    pub const fn new() -> Self {
        Self {
            flag: Mutex::new(Cell::new(false)),
        }
    }

    /// Marks an interrupt as pending. Safe to call from interrupt context.
    pub fn raise(&self) {
        critical_section::with(|cs| self.flag.borrow(cs).set(true));
    }

    /// Returns whether an interrupt was pending and clears the flag
    pub fn take(&self) -> bool {
        critical_section::with(|cs| self.flag.borrow(cs).replace(false))
    }

    /// Returns whether an interrupt is pending without clearing it
    pub fn is_pending(&self) -> bool {
        critical_section::with(|cs| self.flag.borrow(cs).get())
    }
}

impl Default for PendingIrq {
    fn default() -> Self {
        Self::new()
    }
}

/// LoRa frequency error estimate
///
/// Raw 20-bit two's complement value from registers 0x076B..0x076D, latched
/// at HeaderValid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrequencyError(pub i32);

impl FrequencyError {
    pub fn from_registers(bytes: [u8; 3]) -> Self {
        let raw = ((bytes[0] as u32 & 0x0F) << 16) | ((bytes[1] as u32) << 8) | bytes[2] as u32;
        // sign extend from bit 19
        Self(((raw << 12) as i32) >> 12)
    }
}
