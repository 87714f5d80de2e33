//! Operational mode commands
//!
//! Commands that move the radio between its operating modes, plus the
//! power-management and calibration commands that are only legal in
//! STDBY_RC. Each mode command here is tracked by [`crate::mode`].

use bitflags::bitflags;
use core::convert::Infallible;

use regiface::{Command, NoParameters, ToByteArray};

use super::Opcode;

bitflags! {
    /// Sleep configuration options
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SleepConfig: u8 {
        /// Retain configuration in sleep (warm start)
        ///
        /// When clear, the chip cold starts and every register returns to its default.
        const WARM_START = 1 << 2;
        /// Wake up on RTC timeout
        const RTC_WAKEUP = 1;
    }
}

impl ToByteArray for SleepConfig {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.bits()])
    }
}

/// SetSleep command (0x84)
///
/// # Important Notes
/// - The chip takes ~500μs to save its context; BUSY stays high meanwhile
/// - The next SPI access wakes the chip up again
#[derive(Debug, Clone)]
pub struct SetSleep {
    /// Sleep configuration
    pub config: SleepConfig,
}

impl Command for SetSleep {
    type IdType = u8;
    type CommandParameters = SleepConfig;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::SetSleep as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.config
    }
}

/// Oscillator used in standby
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StandbyConfig {
    /// 13 MHz RC oscillator, required for most configuration commands
    #[default]
    Rc = 0,
    /// 32 MHz crystal, faster transition to TX/RX
    Xosc = 1,
}

impl ToByteArray for StandbyConfig {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self as u8])
    }
}

/// SetStandby command (0x80)
#[derive(Debug, Clone)]
pub struct SetStandby {
    /// Standby oscillator
    pub config: StandbyConfig,
}

impl Command for SetStandby {
    type IdType = u8;
    type CommandParameters = StandbyConfig;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::SetStandby as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.config
    }
}

/// SetFs command (0xC1)
///
/// Locks the PLL on the configured frequency. Mostly useful for test
/// purposes, the chip passes through FS on every TX/RX transition anyway.
#[derive(Debug, Clone)]
pub struct SetFs;

impl Command for SetFs {
    type IdType = u8;
    type CommandParameters = NoParameters;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::SetFs as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// 24-bit timeout in steps of 15.625 μs
///
/// Only the low 24 bits are sent; larger values are truncated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timeout(pub u32);

impl Timeout {
    /// No timeout. Single mode for RX, no timeout for TX.
    pub const NONE: Self = Self(0x000000);
    /// RX continuous mode
    pub const CONTINUOUS: Self = Self(0xFFFFFF);

    /// Builds a timeout from milliseconds, saturating at the 24-bit maximum
    pub fn from_ms(ms: u32) -> Self {
        Self((ms.saturating_mul(64)).min(0xFFFFFF))
    }
}

impl ToByteArray for Timeout {
    type Error = Infallible;
    type Array = [u8; 3];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let [_, b2, b1, b0] = self.0.to_be_bytes();
        Ok([b2, b1, b0])
    }
}

/// SetTx command (0x83)
///
/// The chip returns to its fallback mode after TxDone or timeout.
#[derive(Debug, Clone)]
pub struct SetTx {
    /// TX timeout, [`Timeout::NONE`] disables it
    pub timeout: Timeout,
}

impl Command for SetTx {
    type IdType = u8;
    type CommandParameters = Timeout;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::SetTx as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.timeout
    }
}

/// RX operation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxMode {
    /// Return to standby after a single packet
    Single,
    /// Stay in RX until commanded otherwise
    Continuous,
    /// Return after a packet or after the given number of 15.625 μs steps
    Timed(u32),
}

impl From<RxMode> for Timeout {
    fn from(mode: RxMode) -> Self {
        match mode {
            RxMode::Single => Timeout::NONE,
            RxMode::Continuous => Timeout::CONTINUOUS,
            RxMode::Timed(timeout) => Timeout(timeout),
        }
    }
}

/// SetRx command (0x82)
#[derive(Debug, Clone)]
pub struct SetRx {
    /// RX operation mode
    pub mode: RxMode,
}

impl Command for SetRx {
    type IdType = u8;
    type CommandParameters = Timeout;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::SetRx as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.mode.into()
    }
}

/// SetStopRxTimerOnPreamble command (0x9F)
///
/// By default the RX timeout timer stops on sync word or header detection.
/// When enabled it stops as soon as a preamble is detected.
#[derive(Debug, Clone)]
pub struct SetStopRxTimerOnPreamble {
    /// Stop on preamble detection
    pub enable: bool,
}

impl ToByteArray for SetStopRxTimerOnPreamble {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.enable as u8])
    }
}

impl Command for SetStopRxTimerOnPreamble {
    type IdType = u8;
    type CommandParameters = Self;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::SetStopRxTimerOnPreamble as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self
    }
}

/// RX duty cycle periods, each a 24-bit count of 15.625 μs steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxDutyCycleConfig {
    /// Time spent in RX
    pub rx_period: u32,
    /// Time spent in sleep
    pub sleep_period: u32,
}

impl ToByteArray for RxDutyCycleConfig {
    type Error = Infallible;
    type Array = [u8; 6];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let rx = self.rx_period.to_be_bytes();
        let sleep = self.sleep_period.to_be_bytes();
        Ok([rx[1], rx[2], rx[3], sleep[1], sleep[2], sleep[3]])
    }
}

/// SetRxDutyCycle command (0x94)
///
/// The chip alternates between RX and sleep until a packet is received or
/// a SetStandby is issued during an RX window.
#[derive(Debug, Clone)]
pub struct SetRxDutyCycle {
    /// Duty cycle periods
    pub config: RxDutyCycleConfig,
}

impl Command for SetRxDutyCycle {
    type IdType = u8;
    type CommandParameters = RxDutyCycleConfig;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::SetRxDutyCycle as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.config
    }
}

/// SetCad command (0xC5)
///
/// LoRa only. Ends with CadDone, plus CadDetected when activity was found.
#[derive(Debug, Clone)]
pub struct SetCad;

impl Command for SetCad {
    type IdType = u8;
    type CommandParameters = NoParameters;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::SetCad as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// SetTxContinuousWave command (0xD1)
///
/// Test mode: unmodulated carrier at the configured frequency and power.
#[derive(Debug, Clone)]
pub struct SetTxContinuousWave;

impl Command for SetTxContinuousWave {
    type IdType = u8;
    type CommandParameters = NoParameters;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::SetTxContinuousWave as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// SetTxInfinitePreamble command (0xD2)
///
/// Test mode: endless preamble of the current packet type.
#[derive(Debug, Clone)]
pub struct SetTxInfinitePreamble;

impl Command for SetTxInfinitePreamble {
    type IdType = u8;
    type CommandParameters = NoParameters;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::SetTxInfinitePreamble as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// Regulator mode configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegulatorMode {
    /// LDO only, no inductor required
    #[default]
    LdoOnly = 0,
    /// DC-DC + LDO, requires the external inductor
    DcDcLdo = 1,
}

impl ToByteArray for RegulatorMode {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self as u8])
    }
}

/// SetRegulatorMode command (0x96)
#[derive(Debug, Clone)]
pub struct SetRegulatorMode {
    /// Regulator mode selection
    pub mode: RegulatorMode,
}

impl Command for SetRegulatorMode {
    type IdType = u8;
    type CommandParameters = RegulatorMode;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::SetRegulatorMode as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.mode
    }
}

bitflags! {
    /// Blocks to calibrate
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CalibrationConfig: u8 {
        /// RC64k oscillator
        const RC64K = 1 << 0;
        /// RC13M oscillator
        const RC13M = 1 << 1;
        /// PLL
        const PLL = 1 << 2;
        /// ADC pulse
        const ADC_PULSE = 1 << 3;
        /// ADC bulk N
        const ADC_BULK_N = 1 << 4;
        /// ADC bulk P
        const ADC_BULK_P = 1 << 5;
        /// Image rejection
        const IMAGE = 1 << 6;
    }
}

impl ToByteArray for CalibrationConfig {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.bits()])
    }
}

/// Calibrate command (0x89)
///
/// Must be issued in STDBY_RC. Full calibration takes up to 3.5ms.
#[derive(Debug, Clone)]
pub struct Calibrate {
    /// Blocks to calibrate
    pub config: CalibrationConfig,
}

impl Command for Calibrate {
    type IdType = u8;
    type CommandParameters = CalibrationConfig;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::Calibrate as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.config
    }
}

/// Frequency band for image calibration, as two 4 MHz step codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ImageCalibConfig {
    /// Lower bound code
    pub freq1: u8,
    /// Upper bound code
    pub freq2: u8,
}

impl ToByteArray for ImageCalibConfig {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.freq1, self.freq2])
    }
}

/// CalibrateImage command (0x98)
#[derive(Debug, Clone)]
pub struct CalibrateImage {
    /// Band to calibrate
    pub config: ImageCalibConfig,
}

impl Command for CalibrateImage {
    type IdType = u8;
    type CommandParameters = ImageCalibConfig;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::CalibrateImage as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.config
    }
}

/// Power amplifier selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceSelect {
    /// SX1262 high power PA (+22dBm max)
    #[default]
    Sx1262 = 0,
    /// SX1261 low power PA (+15dBm max)
    Sx1261 = 1,
}

/// PA configuration parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PaConfig {
    /// PA duty cycle
    pub duty_cycle: u8,
    /// PA size, SX1262 only (0x00-0x07)
    pub hp_max: u8,
    /// PA selection
    pub device_sel: DeviceSelect,
    /// Always 0x01
    pub pa_lut: u8,
}

impl ToByteArray for PaConfig {
    type Error = Infallible;
    type Array = [u8; 4];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([
            self.duty_cycle,
            self.hp_max,
            self.device_sel as u8,
            self.pa_lut,
        ])
    }
}

/// SetPaConfig command (0x95)
#[derive(Debug, Clone)]
pub struct SetPaConfig {
    /// PA configuration
    pub config: PaConfig,
}

impl Command for SetPaConfig {
    type IdType = u8;
    type CommandParameters = PaConfig;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::SetPaConfig as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.config
    }
}

/// Mode entered after TX or RX completes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FallbackMode {
    /// FS, fastest turnaround
    Fs = 0x40,
    /// STDBY_XOSC
    StdbyXosc = 0x30,
    /// STDBY_RC, lowest power
    #[default]
    StdbyRc = 0x20,
}

impl ToByteArray for FallbackMode {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self as u8])
    }
}

/// SetRxTxFallbackMode command (0x93)
#[derive(Debug, Clone)]
pub struct SetRxTxFallbackMode {
    /// Fallback mode selection
    pub mode: FallbackMode,
}

impl Command for SetRxTxFallbackMode {
    type IdType = u8;
    type CommandParameters = FallbackMode;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        Opcode::SetTxFallbackMode as u8
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_are_24_bit_big_endian() {
        assert_eq!(Timeout(0x123456).to_bytes(), Ok([0x12, 0x34, 0x56]));
        assert_eq!(Timeout::from(RxMode::Continuous).to_bytes(), Ok([0xFF; 3]));
        assert_eq!(Timeout::from(RxMode::Single).to_bytes(), Ok([0x00; 3]));
        assert_eq!(Timeout::from_ms(1_000), Timeout(64_000));
        assert_eq!(Timeout::from_ms(u32::MAX), Timeout(0xFFFFFF));
    }

    #[test]
    fn duty_cycle_packs_two_periods() {
        let config = RxDutyCycleConfig {
            rx_period: 0x000102,
            sleep_period: 0x0A0B0C,
        };
        assert_eq!(
            config.to_bytes(),
            Ok([0x00, 0x01, 0x02, 0x0A, 0x0B, 0x0C])
        );
    }

    #[test]
    fn sleep_flags() {
        let config = SleepConfig::WARM_START | SleepConfig::RTC_WAKEUP;
        assert_eq!(config.to_bytes(), Ok([0x05]));
    }
}
