//! Operating mode tracking
//!
//! The SX126x does not report every mode change on its own, so the driver
//! mirrors the chip's mode from the commands it issues. Only the commands
//! listed in [`transition`] move the mirror; everything else leaves it
//! untouched.

use crate::commands::Opcode;

/// Operating mode of the radio as last commanded by the driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatingMode {
    /// Lowest power state, configuration retained only in warm start
    #[default]
    Sleep,
    /// Standby on the 13 MHz RC oscillator
    StandbyRc,
    /// Standby on the 32 MHz crystal oscillator
    StandbyXosc,
    /// Frequency synthesis, PLL locked
    FrequencySynth,
    /// Transmitting
    Tx,
    /// Receiving
    Rx,
    /// Alternating between sleep and receive
    RxDutyCycle,
    /// Channel activity detection
    Cad,
}

impl OperatingMode {
    /// Returns true if the chip has to be woken up before it accepts SPI traffic
    pub fn needs_wakeup(self) -> bool {
        matches!(self, Self::Sleep | Self::RxDutyCycle)
    }
}

/// Mode the radio enters after a successful `opcode` with `params`.
///
/// Returns `None` for commands that do not change the operating mode.
pub fn transition(opcode: u8, params: &[u8]) -> Option<OperatingMode> {
    let opcode = Opcode::try_from(opcode).ok()?;
    match opcode {
        Opcode::SetSleep => Some(OperatingMode::Sleep),
        Opcode::SetStandby => match params.first() {
            Some(0) => Some(OperatingMode::StandbyRc),
            Some(_) => Some(OperatingMode::StandbyXosc),
            None => None,
        },
        Opcode::SetFs => Some(OperatingMode::FrequencySynth),
        Opcode::SetTx => Some(OperatingMode::Tx),
        Opcode::SetRx => Some(OperatingMode::Rx),
        Opcode::SetRxDutyCycle => Some(OperatingMode::RxDutyCycle),
        Opcode::SetCad | Opcode::SetCadParams => Some(OperatingMode::Cad),
        _ => None,
    }
}
