//! High level SX126x driver
//!
//! [`Sx126x`] owns a [`Device`] together with the board [`Config`] and the
//! state the chip cannot be asked for cheaply: whether the image rejection
//! has been calibrated, the TX buffer base and the LoRa frequency error
//! latched at the last valid header.
//!
//! # Usage
//! 1. Build a [`Transport`], usually an [`SpiInterface`](crate::SpiInterface)
//! 2. Create the driver with [`Sx126x::new`] and run [`Sx126x::init`]
//! 3. Register handlers with [`Sx126x::register_events`]
//! 4. Configure frequency, modulation and packet parameters
//! 5. Route DIO1 to [`Sx126x::on_dio_irq`], and with polled delivery call
//!    [`Sx126x::process_pending_irqs`] from the main loop
//!
//! # Example
//! ```no_run
//! use sx126x_driver::{
//!     commands::RxMode, config::*, Config, Delivery, Error, Sx126x, Transport,
//! };
//!
//! fn listen<T: Transport>(transport: T) -> Result<(), Error> {
//!     let mut radio = Sx126x::new(transport, Config::default(), Delivery::Immediate);
//!     radio.init()?;
//!     radio.set_rf_frequency(868_100_000)?;
//!     radio.set_modulation_params(ModulationParams::LoRa(LoRaModulationParams::default()))?;
//!     radio.set_packet_params(PacketParams::LoRa(LoRaPacketParams::default()))?;
//!     radio.set_rx(RxMode::Continuous)
//! }
//! ```

use crate::{
    commands::*,
    config::{
        CalibrationBand, ChipVariant, ClockSource, Config, ImageCalibration, ModulationParams,
        PacketParams,
    },
    device::Device,
    irq::{decode, FrequencyError, IrqMask, PendingIrq, RadioEvents},
    mode::OperatingMode,
    registers::*,
    transport::Transport,
    Error,
};

/// How interrupts reach the dispatcher
#[derive(Debug, Clone, Copy)]
pub enum Delivery<'a> {
    /// [`Sx126x::on_dio_irq`] dispatches right away, from interrupt context
    Immediate,
    /// [`Sx126x::on_dio_irq`] only raises the flag, [`Sx126x::process_pending_irqs`]
    /// dispatches
    Polled(&'a PendingIrq),
}

/// LoRa reception metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoRaPacketStatus {
    /// Average RSSI over the packet, dBm
    pub rssi: i16,
    /// SNR, dB
    pub snr: i8,
    /// RSSI of the despread signal, dBm
    pub signal_rssi: i16,
    /// Frequency error latched at the last valid header
    pub frequency_error: FrequencyError,
}

/// GFSK reception metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GfskPacketStatus {
    /// Raw RX status flags
    pub rx_status: u8,
    /// RSSI at sync word detection, dBm
    pub rssi_sync: i16,
    /// Average RSSI over the packet, dBm
    pub rssi_avg: i16,
}

/// Packet status, decoded according to the selected packet type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketStatus {
    LoRa(LoRaPacketStatus),
    Gfsk(GfskPacketStatus),
}

fn half_dbm(raw: u8) -> i16 {
    RssiInst(raw).dbm()
}

impl LoRaPacketStatus {
    fn from_raw(raw: [u8; 3], frequency_error: FrequencyError) -> Self {
        Self {
            rssi: half_dbm(raw[0]),
            snr: (raw[1] as i8) / 4,
            signal_rssi: half_dbm(raw[2]),
            frequency_error,
        }
    }
}

impl GfskPacketStatus {
    fn from_raw(raw: [u8; 3]) -> Self {
        Self {
            rx_status: raw[0],
            rssi_sync: half_dbm(raw[1]),
            rssi_avg: half_dbm(raw[2]),
        }
    }
}

/// SX126x driver
pub struct Sx126x<'a, T, E = ()> {
    device: Device<T>,
    config: Config,
    delivery: Delivery<'a>,
    calibrated: Option<CalibrationBand>,
    frequency_error: FrequencyError,
    tx_base: u8,
    events: E,
}

impl<'a, T> Sx126x<'a, T, ()> {
    /// Creates a driver without event handlers.
    ///
    /// No SPI traffic happens until the first call; run [`init`](Self::init)
    /// before anything else.
    pub fn new(transport: T, config: Config, delivery: Delivery<'a>) -> Self {
        Self {
            device: Device::new(transport),
            config,
            delivery,
            calibrated: None,
            frequency_error: FrequencyError::default(),
            tx_base: 0,
            events: (),
        }
    }
}

impl<'a, T, E> Sx126x<'a, T, E> {
    /// Replaces the event handlers
    pub fn register_events<F: RadioEvents>(self, events: F) -> Sx126x<'a, T, F> {
        Sx126x {
            device: self.device,
            config: self.config,
            delivery: self.delivery,
            calibrated: self.calibrated,
            frequency_error: self.frequency_error,
            tx_base: self.tx_base,
            events,
        }
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn device(&self) -> &Device<T> {
        &self.device
    }

    /// Raw access to the command codec
    ///
    /// Mode commands sent through it are still tracked.
    pub fn device_mut(&mut self) -> &mut Device<T> {
        &mut self.device
    }

    /// Releases the underlying transport.
    pub fn release(self) -> T {
        self.device.release()
    }

    pub fn operating_mode(&self) -> OperatingMode {
        self.device.operating_mode()
    }

    /// Packet type cached from the last SetPacketType
    pub fn packet_type(&self) -> PacketType {
        self.device.packet_type()
    }

    /// Frequency error latched at the last LoRa HeaderValid
    pub fn frequency_error(&self) -> FrequencyError {
        self.frequency_error
    }

    /// Band the image rejection was last calibrated for
    pub fn image_calibration(&self) -> Option<CalibrationBand> {
        self.calibrated
    }

    /// Forces an image calibration on the next [`set_rf_frequency`](Self::set_rf_frequency)
    pub fn invalidate_image_calibration(&mut self) {
        self.calibrated = None;
    }
}

impl<'a, T, E> Sx126x<'a, T, E>
where
    T: Transport,
    E: RadioEvents,
{
    /// Brings the chip into a known LoRa configuration.
    ///
    /// Resets and wakes the chip, then in STDBY_RC: TCXO supply and full
    /// calibration when clocked from a TCXO, the regulator, DIO2 switch
    /// control, LoRa packet type and the network sync word.
    pub fn init(&mut self) -> Result<(), Error> {
        self.device.reset()?;
        self.device.wakeup()?;
        self.set_standby(StandbyConfig::Rc)?;

        if let ClockSource::Tcxo {
            voltage,
            startup_delay,
        } = self.config.clock
        {
            self.set_dio3_as_tcxo_ctrl(TcxoConfig {
                voltage,
                delay: startup_delay,
            })?;
            self.calibrate(CalibrationConfig::all())?;
        }

        if let Some(mode) = self.config.regulator {
            self.set_regulator_mode(mode)?;
        }
        self.set_dio2_as_rf_switch_ctrl(self.config.dio2_as_rf_switch)?;
        self.set_packet_type(PacketType::LoRa)?;
        self.set_lora_sync_word(self.config.sync_word.word())
    }

    /// Entry point for the DIO1 interrupt.
    ///
    /// With [`Delivery::Immediate`] this runs a full dispatch cycle, SPI
    /// traffic included. With [`Delivery::Polled`] it only raises the
    /// pending flag.
    pub fn on_dio_irq(&mut self) -> Result<(), Error> {
        match self.delivery {
            Delivery::Immediate => self.dispatch(),
            Delivery::Polled(pending) => {
                pending.raise();
                Ok(())
            }
        }
    }

    /// Dispatches a pending interrupt, if any. Does nothing with immediate delivery.
    ///
    /// The flag stays raised when reading or clearing the IRQ status fails,
    /// since DIO1 will not produce another edge for the same status.
    pub fn process_pending_irqs(&mut self) -> Result<(), Error> {
        match self.delivery {
            Delivery::Polled(pending) if pending.take() => match self.acknowledge_irqs() {
                Ok(irq) => self.deliver(irq),
                Err(error) => {
                    pending.raise();
                    Err(error)
                }
            },
            _ => Ok(()),
        }
    }

    fn dispatch(&mut self) -> Result<(), Error> {
        let irq = self.acknowledge_irqs()?;
        self.deliver(irq)
    }

    /// Reads the IRQ status and clears every bit
    fn acknowledge_irqs(&mut self) -> Result<IrqMask, Error> {
        let irq = self.get_irq_status()?;
        self.clear_irq_status(IrqMask::CLEAR_ALL)?;
        debug!("irq {}", irq);
        Ok(irq)
    }

    /// Delivers every event decoded from `irq`.
    ///
    /// All events are delivered even when a timeout cannot be attributed;
    /// that error is returned afterwards.
    fn deliver(&mut self, irq: IrqMask) -> Result<(), Error> {
        if irq.contains(IrqMask::HEADER_VALID) && self.packet_type() == PacketType::LoRa {
            let mut raw = [0u8; 3];
            for (i, byte) in raw.iter_mut().enumerate() {
                *byte = self.device.read_register(FREQ_ERROR_BASE + i as u16)?;
            }
            self.frequency_error = FrequencyError::from_registers(raw);
        }

        let mut first_error = None;
        for event in decode(irq, self.operating_mode()) {
            match event {
                Ok(event) => self.events.deliver(event),
                Err(error) => {
                    warn!("dropped event: {}", error);
                    first_error.get_or_insert(error);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn set_sleep(&mut self, config: SleepConfig) -> Result<(), Error> {
        self.device.send(SetSleep { config })
    }

    pub fn set_standby(&mut self, config: StandbyConfig) -> Result<(), Error> {
        self.device.send(SetStandby { config })
    }

    pub fn set_fs(&mut self) -> Result<(), Error> {
        self.device.send(SetFs)
    }

    pub fn set_tx(&mut self, timeout: Timeout) -> Result<(), Error> {
        self.device.send(SetTx { timeout })
    }

    pub fn set_rx(&mut self, mode: RxMode) -> Result<(), Error> {
        self.device.send(SetRx { mode })
    }

    /// Receives with boosted LNA gain, about 2mA more for ~3dB sensitivity
    pub fn set_rx_boosted(&mut self, mode: RxMode) -> Result<(), Error> {
        self.device.write(RxGain::Boosted)?;
        self.set_rx(mode)
    }

    /// Alternates between RX for `rx_period` and sleep for `sleep_period`,
    /// both in 15.625 μs steps
    pub fn set_rx_duty_cycle(&mut self, rx_period: u32, sleep_period: u32) -> Result<(), Error> {
        self.device.send(SetRxDutyCycle {
            config: RxDutyCycleConfig {
                rx_period,
                sleep_period,
            },
        })
    }

    pub fn set_cad(&mut self) -> Result<(), Error> {
        self.device.send(SetCad)
    }

    pub fn set_tx_continuous_wave(&mut self) -> Result<(), Error> {
        self.device.send(SetTxContinuousWave)
    }

    pub fn set_tx_infinite_preamble(&mut self) -> Result<(), Error> {
        self.device.send(SetTxInfinitePreamble)
    }

    pub fn set_packet_type(&mut self, packet_type: PacketType) -> Result<(), Error> {
        self.device.send(SetPacketType { packet_type })
    }

    /// Packet type as reported by the chip
    pub fn get_packet_type(&mut self) -> Result<PacketType, Error> {
        let mut raw = [0u8];
        self.device.read_command(Opcode::GetPacketType as u8, &mut raw)?;
        PacketType::try_from(raw[0])
    }

    fn ensure_packet_type(&mut self, packet_type: PacketType) -> Result<(), Error> {
        if self.packet_type() != packet_type {
            self.set_packet_type(packet_type)?;
        }
        Ok(())
    }

    fn require_packet_type(&self, packet_type: PacketType) -> Result<(), Error> {
        match self.packet_type() {
            current if current == packet_type => Ok(()),
            current => Err(Error::UnsupportedPacketType(current as u8)),
        }
    }

    /// Tunes to `frequency` Hz.
    ///
    /// Calibrates the image rejection first when the calibration policy asks
    /// for it: once per lifetime by default, or on every band change with
    /// [`ImageCalibration::PerBand`].
    pub fn set_rf_frequency(&mut self, frequency: u32) -> Result<(), Error> {
        let band = CalibrationBand::from_frequency(frequency);
        let calibrate = match (self.calibrated, self.config.image_calibration) {
            (None, _) => true,
            (Some(current), ImageCalibration::PerBand) => current != band,
            (Some(_), ImageCalibration::Once) => false,
        };
        if calibrate {
            self.calibrate_image(band.config())?;
            self.calibrated = Some(band);
        }
        self.device.send(SetRfFrequency {
            config: RfFrequencyConfig { frequency },
        })
    }

    /// Sets modulation parameters, switching packet type first if needed
    pub fn set_modulation_params(&mut self, params: ModulationParams) -> Result<(), Error> {
        self.ensure_packet_type(params.packet_type())?;
        self.device
            .write_command(Opcode::SetModulationParams as u8, params.layout().as_bytes())
    }

    /// Sets packet parameters, switching packet type first if needed.
    ///
    /// The named GFSK CRC variants also load their seed and polynomial.
    pub fn set_packet_params(&mut self, params: PacketParams) -> Result<(), Error> {
        self.ensure_packet_type(params.packet_type())?;
        if let Some(crc) = params.crc_registers() {
            self.device.write(CrcInitialValue { value: crc.seed })?;
            self.device.write(CrcPolynomial {
                value: crc.polynomial,
            })?;
        }
        self.device
            .write_command(Opcode::SetPacketParams as u8, params.layout().as_bytes())
    }

    /// Configures the PA for the chip variant and sets the output power.
    ///
    /// `power` is clamped to -3..=14 dBm on the SX1261 (+15 dBm selects the
    /// high duty cycle) and to -3..=22 dBm on the SX1262. The over-current
    /// limit is rewritten since SetPaConfig resets it. With a TCXO the ramp
    /// is at least 200 μs.
    pub fn set_tx_params(&mut self, power: i8, ramp_time: RampTime) -> Result<(), Error> {
        let (pa, power, ocp) = match self.config.chip {
            ChipVariant::Sx1261 => (
                PaConfig {
                    duty_cycle: if power == 15 { 0x06 } else { 0x04 },
                    hp_max: 0x00,
                    device_sel: DeviceSelect::Sx1261,
                    pa_lut: 0x01,
                },
                power.clamp(-3, 14),
                OcpConfiguration::SX1261,
            ),
            ChipVariant::Sx1262 => (
                PaConfig {
                    duty_cycle: 0x04,
                    hp_max: 0x07,
                    device_sel: DeviceSelect::Sx1262,
                    pa_lut: 0x01,
                },
                power.clamp(-3, 22),
                OcpConfiguration::SX1262,
            ),
        };
        self.set_pa_config(pa)?;
        self.device.write(ocp)?;

        let ramp_time = match self.config.clock {
            ClockSource::Tcxo { .. } => ramp_time.max(RampTime::Micros200),
            ClockSource::Xtal => ramp_time,
        };
        self.device.send(SetTxParams {
            params: TxParams { power, ramp_time },
        })
    }

    pub fn set_pa_config(&mut self, config: PaConfig) -> Result<(), Error> {
        self.device.send(SetPaConfig { config })
    }

    pub fn set_cad_params(&mut self, params: CadParams) -> Result<(), Error> {
        self.device.send(SetCadParams { params })
    }

    /// Splits the data buffer between TX and RX.
    ///
    /// [`set_payload`](Self::set_payload) writes at `tx_base_addr`.
    pub fn set_buffer_base_address(
        &mut self,
        tx_base_addr: u8,
        rx_base_addr: u8,
    ) -> Result<(), Error> {
        self.device.send(SetBufferBaseAddress {
            config: BufferBaseAddressConfig {
                tx_base_addr,
                rx_base_addr,
            },
        })?;
        self.tx_base = tx_base_addr;
        Ok(())
    }

    pub fn set_stop_rx_timer_on_preamble(&mut self, enable: bool) -> Result<(), Error> {
        self.device.send(SetStopRxTimerOnPreamble { enable })
    }

    pub fn set_lora_symb_num_timeout(&mut self, symbols: u8) -> Result<(), Error> {
        self.device.send(SetLoRaSymbNumTimeout { symbols })
    }

    pub fn set_regulator_mode(&mut self, mode: RegulatorMode) -> Result<(), Error> {
        self.device.send(SetRegulatorMode { mode })
    }

    pub fn calibrate(&mut self, config: CalibrationConfig) -> Result<(), Error> {
        self.device.send(Calibrate { config })
    }

    pub fn calibrate_image(&mut self, config: ImageCalibConfig) -> Result<(), Error> {
        self.device.send(CalibrateImage { config })
    }

    pub fn set_dio3_as_tcxo_ctrl(&mut self, config: TcxoConfig) -> Result<(), Error> {
        self.device.send(SetDio3AsTcxoCtrl { config })
    }

    pub fn set_dio2_as_rf_switch_ctrl(&mut self, enable: bool) -> Result<(), Error> {
        self.device.send(SetDio2AsRfSwitchCtrl { enable })
    }

    pub fn set_rx_tx_fallback_mode(&mut self, mode: FallbackMode) -> Result<(), Error> {
        self.device.send(SetRxTxFallbackMode { mode })
    }

    pub fn set_dio_irq_params(&mut self, config: DioIrqConfig) -> Result<(), Error> {
        self.device.send(SetDioIrqParams { config })
    }

    pub fn get_irq_status(&mut self) -> Result<IrqMask, Error> {
        self.device.execute_command(GetIrqStatus)
    }

    pub fn clear_irq_status(&mut self, mask: IrqMask) -> Result<(), Error> {
        self.device.send(ClearIrqStatus { mask })
    }

    /// GFSK sync word, the first `sync_word_length` bytes are used
    pub fn set_sync_word(&mut self, sync_word: [u8; 8]) -> Result<(), Error> {
        self.device.write(SyncWord { value: sync_word })
    }

    pub fn set_lora_sync_word(&mut self, sync_word: u16) -> Result<(), Error> {
        self.device.write(LoRaSyncWord { value: sync_word })
    }

    /// GFSK only
    pub fn set_crc_seed(&mut self, seed: u16) -> Result<(), Error> {
        self.require_packet_type(PacketType::Gfsk)?;
        self.device.write(CrcInitialValue { value: seed })
    }

    /// GFSK only
    pub fn set_crc_polynomial(&mut self, polynomial: u16) -> Result<(), Error> {
        self.require_packet_type(PacketType::Gfsk)?;
        self.device.write(CrcPolynomial { value: polynomial })
    }

    /// Sets the 9-bit GFSK whitening seed. GFSK only.
    pub fn set_whitening_seed(&mut self, seed: u16) -> Result<(), Error> {
        self.require_packet_type(PacketType::Gfsk)?;
        let current = self.device.read::<WhiteningInitialValue>()?;
        self.device.write(current.with_seed(seed))
    }

    /// Writes `payload` at the TX base address
    pub fn set_payload(&mut self, payload: &[u8]) -> Result<(), Error> {
        if payload.len() > u8::MAX as usize {
            return Err(Error::BufferOverflow {
                requested: payload.len(),
                available: u8::MAX as usize,
            });
        }
        self.device.write_buffer(self.tx_base, payload)
    }

    /// Copies the last received payload into `buffer` and returns its length.
    ///
    /// # Errors
    /// * `Error::BufferOverflow` - the payload does not fit, nothing is read
    pub fn get_payload(&mut self, buffer: &mut [u8]) -> Result<usize, Error> {
        let status = self.get_rx_buffer_status()?;
        let length = status.payload_length as usize;
        if length > buffer.len() {
            return Err(Error::BufferOverflow {
                requested: length,
                available: buffer.len(),
            });
        }
        self.device
            .read_buffer(status.buffer_pointer, &mut buffer[..length])?;
        Ok(length)
    }

    pub fn send_payload(&mut self, payload: &[u8], timeout: Timeout) -> Result<(), Error> {
        self.set_payload(payload)?;
        self.set_tx(timeout)
    }

    /// Length and position of the last received payload.
    ///
    /// Implicit header LoRa packets carry no length, so it is taken from the
    /// configured payload length instead.
    pub fn get_rx_buffer_status(&mut self) -> Result<RxBufferStatus, Error> {
        let mut status = self.device.execute_command(GetRxBufferStatus)?;
        if self.packet_type() == PacketType::LoRa
            && self.device.read::<LoRaPacketConfig>()?.implicit_header
        {
            status.payload_length = self.device.read::<LoRaPayloadLength>()?.length;
        }
        Ok(status)
    }

    pub fn get_status(&mut self) -> Result<RadioStatus, Error> {
        self.device.execute_command(GetStatus)
    }

    /// Instantaneous RSSI in dBm
    pub fn get_rssi_inst(&mut self) -> Result<i16, Error> {
        Ok(self.device.execute_command(GetRssiInst)?.dbm())
    }

    /// Metrics of the last received packet.
    ///
    /// # Errors
    /// * `Error::UnsupportedPacketType` - no packet type selected yet
    pub fn get_packet_status(&mut self) -> Result<PacketStatus, Error> {
        match self.packet_type() {
            PacketType::LoRa => {
                let RawPacketStatus(raw) = self.device.execute_command(GetPacketStatus)?;
                Ok(PacketStatus::LoRa(LoRaPacketStatus::from_raw(
                    raw,
                    self.frequency_error,
                )))
            }
            PacketType::Gfsk => {
                let RawPacketStatus(raw) = self.device.execute_command(GetPacketStatus)?;
                Ok(PacketStatus::Gfsk(GfskPacketStatus::from_raw(raw)))
            }
            PacketType::None => Err(Error::UnsupportedPacketType(PacketType::None as u8)),
        }
    }

    pub fn get_device_errors(&mut self) -> Result<DeviceErrors, Error> {
        self.device.execute_command(GetDeviceErrors)
    }

    pub fn clear_device_errors(&mut self) -> Result<(), Error> {
        self.device.send(ClearDeviceErrors)
    }

    pub fn get_stats(&mut self) -> Result<Stats, Error> {
        self.device.execute_command(GetStats)
    }

    pub fn reset_stats(&mut self) -> Result<(), Error> {
        self.device.send(ResetStats)
    }

    /// 32 random bits from the receiver's wideband noise.
    ///
    /// Briefly enters RX and leaves the chip in STDBY_RC.
    pub fn get_random(&mut self) -> Result<u32, Error> {
        self.set_rx(RxMode::Single)?;
        self.device.delay_ms(1);
        let random = self.device.read::<RandomNumber>()?;
        self.set_standby(StandbyConfig::Rc)?;
        Ok(random.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{
            GfskCrc, GfskModulationParams, GfskPacketParams, LoRaHeader, LoRaModulationParams,
            LoRaPacketParams, NetworkSyncWord,
        },
        fixtures::SimChip,
        irq::{IrqErrorCode, RadioEvent},
    };
    use std::{vec, vec::Vec};

    #[derive(Default)]
    struct Recorder {
        seen: Vec<RadioEvent>,
    }

    impl RadioEvents for Recorder {
        fn tx_done(&mut self) {
            self.seen.push(RadioEvent::TxDone);
        }
        fn rx_done(&mut self) {
            self.seen.push(RadioEvent::RxDone);
        }
        fn rx_preamble_detected(&mut self) {
            self.seen.push(RadioEvent::PreambleDetected);
        }
        fn rx_sync_word_valid(&mut self) {
            self.seen.push(RadioEvent::SyncWordValid);
        }
        fn rx_header_valid(&mut self) {
            self.seen.push(RadioEvent::HeaderValid);
        }
        fn tx_timeout(&mut self) {
            self.seen.push(RadioEvent::TxTimeout);
        }
        fn rx_timeout(&mut self) {
            self.seen.push(RadioEvent::RxTimeout);
        }
        fn rx_error(&mut self, code: IrqErrorCode) {
            self.seen.push(RadioEvent::RxError(code));
        }
        fn cad_done(&mut self, activity_detected: bool) {
            self.seen.push(RadioEvent::CadDone {
                activity: activity_detected,
            });
        }
    }

    fn radio(config: Config) -> Sx126x<'static, SimChip, Recorder> {
        let mut radio = Sx126x::new(SimChip::new(), config, Delivery::Immediate)
            .register_events(Recorder::default());
        radio.init().unwrap();
        radio.device_mut().transport_mut().clear_log();
        radio
    }

    fn sim<'r, E>(radio: &'r mut Sx126x<'_, SimChip, E>) -> &'r mut SimChip {
        radio.device_mut().transport_mut()
    }

    #[test]
    fn init_with_crystal() {
        let mut radio = Sx126x::new(SimChip::new(), Config::default(), Delivery::Immediate);
        radio.init().unwrap();
        let chip = sim(&mut radio);
        assert_eq!(chip.resets, 1);
        assert_eq!(chip.wakeups, 1);
        assert_eq!(chip.opcodes(), vec![0x80, 0x9D, 0x8A, 0x0D]);
        assert_eq!(chip.log[0], vec![0x80, 0x00]);
        assert_eq!(chip.log[2], vec![0x8A, 0x01]);
        assert_eq!(chip.log[3], vec![0x0D, 0x07, 0x40, 0x14, 0x24]);
        assert_eq!(radio.operating_mode(), OperatingMode::StandbyRc);
        assert_eq!(radio.packet_type(), PacketType::LoRa);
        assert!(radio.device().antenna_switch());
    }

    #[test]
    fn init_with_tcxo_and_dcdc() {
        let config = Config {
            clock: ClockSource::Tcxo {
                voltage: TcxoVoltage::V1_7,
                startup_delay: 320,
            },
            regulator: Some(RegulatorMode::DcDcLdo),
            dio2_as_rf_switch: true,
            sync_word: NetworkSyncWord::Public,
            ..Default::default()
        };
        let mut radio = Sx126x::new(SimChip::new(), config, Delivery::Immediate);
        radio.init().unwrap();
        let chip = sim(&mut radio);
        assert_eq!(chip.opcodes(), vec![0x80, 0x97, 0x89, 0x96, 0x9D, 0x8A, 0x0D]);
        assert_eq!(chip.log[1], vec![0x97, 0x01, 0x00, 0x01, 0x40]);
        assert_eq!(chip.log[2], vec![0x89, 0x7F]);
        assert_eq!(chip.log[3], vec![0x96, 0x01]);
        assert_eq!(chip.log[4], vec![0x9D, 0x01]);
        assert_eq!(chip.log[6][3..], [0x34, 0x44]);
    }

    #[test]
    fn image_is_calibrated_once() {
        let mut radio = radio(Config::default());
        radio.set_rf_frequency(868_000_000).unwrap();
        radio.set_rf_frequency(868_300_000).unwrap();
        radio.set_rf_frequency(915_000_000).unwrap();

        let chip = sim(&mut radio);
        assert_eq!(chip.frames(Opcode::CalibrateImage), vec![&vec![0x98, 0xD7, 0xDB]]);
        assert_eq!(chip.frames(Opcode::SetRfFrequency).len(), 3);
        assert_eq!(chip.log[1], vec![0x86, 0x36, 0x40, 0x00, 0x00]);
        assert_eq!(radio.image_calibration(), Some(CalibrationBand::Band863));

        radio.invalidate_image_calibration();
        radio.set_rf_frequency(915_000_000).unwrap();
        let chip = sim(&mut radio);
        assert_eq!(chip.frames(Opcode::CalibrateImage).len(), 2);
        assert_eq!(chip.frames(Opcode::CalibrateImage)[1], &vec![0x98, 0xE1, 0xE9]);
    }

    #[test]
    fn image_is_recalibrated_per_band() {
        let mut radio = radio(Config {
            image_calibration: ImageCalibration::PerBand,
            ..Default::default()
        });
        radio.set_rf_frequency(868_000_000).unwrap();
        radio.set_rf_frequency(869_000_000).unwrap();
        radio.set_rf_frequency(915_000_000).unwrap();
        radio.set_rf_frequency(433_000_000).unwrap();
        let frames = sim(&mut radio).frames(Opcode::CalibrateImage);
        assert_eq!(
            frames,
            vec![
                &vec![0x98, 0xD7, 0xDB],
                &vec![0x98, 0xE1, 0xE9],
                &vec![0x98, 0x6B, 0x6F]
            ]
        );
    }

    #[test]
    fn crc_error_is_delivered_as_rx_error_only() {
        let mut radio = radio(Config::default());
        radio.set_rx(RxMode::Continuous).unwrap();
        sim(&mut radio).irq = (IrqMask::RX_DONE | IrqMask::CRC_ERROR).bits();
        radio.on_dio_irq().unwrap();
        assert_eq!(radio.events().seen, vec![RadioEvent::RxError(IrqErrorCode::Crc)]);
        assert_eq!(sim(&mut radio).irq, 0);
    }

    #[test]
    fn dispatch_reads_then_clears_all() {
        let mut radio = radio(Config::default());
        radio.set_tx(Timeout::NONE).unwrap();
        sim(&mut radio).clear_log();
        sim(&mut radio).irq = IrqMask::TX_DONE.bits();
        radio.on_dio_irq().unwrap();
        let chip = sim(&mut radio);
        assert_eq!(chip.log[0], vec![0x12, 0x00, 0x00, 0x00]);
        assert_eq!(chip.log[1], vec![0x02, 0xFF, 0xFF]);
        assert_eq!(radio.events().seen, vec![RadioEvent::TxDone]);
    }

    #[test]
    fn timeouts_follow_operating_mode() {
        let mut radio = radio(Config::default());
        radio.set_rx(RxMode::Timed(6400)).unwrap();
        sim(&mut radio).irq = IrqMask::RX_TX_TIMEOUT.bits();
        radio.on_dio_irq().unwrap();

        radio.set_tx(Timeout::from_ms(100)).unwrap();
        sim(&mut radio).irq = IrqMask::RX_TX_TIMEOUT.bits();
        radio.on_dio_irq().unwrap();

        assert_eq!(
            radio.events().seen,
            vec![RadioEvent::RxTimeout, RadioEvent::TxTimeout]
        );
    }

    #[test]
    fn inconsistent_timeout_still_delivers_the_rest() {
        let mut radio = radio(Config::default());
        sim(&mut radio).irq = (IrqMask::RX_TX_TIMEOUT | IrqMask::PREAMBLE_DETECTED).bits();
        assert_eq!(
            radio.on_dio_irq(),
            Err(Error::InconsistentState(OperatingMode::StandbyRc))
        );
        assert_eq!(radio.events().seen, vec![RadioEvent::PreambleDetected]);
        assert_eq!(sim(&mut radio).irq, 0);
    }

    #[test]
    fn polled_delivery_waits_for_main_loop() {
        let pending = PendingIrq::new();
        let mut radio = Sx126x::new(SimChip::new(), Config::default(), Delivery::Polled(&pending))
            .register_events(Recorder::default());
        radio.init().unwrap();
        radio.set_tx(Timeout::NONE).unwrap();
        sim(&mut radio).clear_log();
        sim(&mut radio).irq = IrqMask::TX_DONE.bits();

        radio.on_dio_irq().unwrap();
        assert!(pending.is_pending());
        assert!(sim(&mut radio).log.is_empty());
        assert!(radio.events().seen.is_empty());

        radio.process_pending_irqs().unwrap();
        assert!(!pending.is_pending());
        assert_eq!(radio.events().seen, vec![RadioEvent::TxDone]);

        radio.process_pending_irqs().unwrap();
        assert_eq!(sim(&mut radio).opcodes(), vec![0x12, 0x02]);
    }

    #[test]
    fn polled_irq_survives_bus_timeout() {
        let pending = PendingIrq::new();
        let mut radio = Sx126x::new(SimChip::new(), Config::default(), Delivery::Polled(&pending))
            .register_events(Recorder::default());
        radio.init().unwrap();
        radio.set_tx(Timeout::NONE).unwrap();
        sim(&mut radio).irq = IrqMask::TX_DONE.bits();
        radio.on_dio_irq().unwrap();

        sim(&mut radio).busy_stuck = true;
        assert_eq!(radio.process_pending_irqs(), Err(Error::BusTimeout));
        assert!(pending.is_pending());
        assert!(radio.events().seen.is_empty());

        sim(&mut radio).busy_stuck = false;
        radio.process_pending_irqs().unwrap();
        assert!(!pending.is_pending());
        assert_eq!(radio.events().seen, vec![RadioEvent::TxDone]);
        assert_eq!(sim(&mut radio).irq, 0);
    }

    #[test]
    fn header_valid_latches_frequency_error() {
        let mut radio = radio(Config::default());
        radio.set_rx(RxMode::Continuous).unwrap();
        sim(&mut radio).set_registers(0x076B, &[0xAF, 0xFF, 0xF0]);
        sim(&mut radio).irq = (IrqMask::HEADER_VALID | IrqMask::RX_DONE).bits();
        radio.on_dio_irq().unwrap();
        assert_eq!(radio.frequency_error(), FrequencyError(-16));
        assert_eq!(
            radio.events().seen,
            vec![RadioEvent::RxDone, RadioEvent::HeaderValid]
        );

        sim(&mut radio).respond(Opcode::GetPacketStatus, &[0x50, 0xF8, 0x61]);
        assert_eq!(
            radio.get_packet_status().unwrap(),
            PacketStatus::LoRa(LoRaPacketStatus {
                rssi: -40,
                snr: -2,
                signal_rssi: -48,
                frequency_error: FrequencyError(-16),
            })
        );
    }

    #[test]
    fn gfsk_packet_status() {
        let mut radio = radio(Config::default());
        radio.set_packet_type(PacketType::Gfsk).unwrap();
        sim(&mut radio).respond(Opcode::GetPacketStatus, &[0x10, 0x64, 0x6A]);
        assert_eq!(
            radio.get_packet_status().unwrap(),
            PacketStatus::Gfsk(GfskPacketStatus {
                rx_status: 0x10,
                rssi_sync: -50,
                rssi_avg: -53,
            })
        );
    }

    #[test]
    fn packet_status_needs_a_packet_type() {
        let mut radio = radio(Config::default());
        radio.set_packet_type(PacketType::None).unwrap();
        assert_eq!(
            radio.get_packet_status(),
            Err(Error::UnsupportedPacketType(0x0F))
        );
    }

    #[test]
    fn modulation_params_switch_packet_type() {
        let mut radio = radio(Config::default());
        let gfsk = ModulationParams::Gfsk(GfskModulationParams::default());
        radio.set_modulation_params(gfsk).unwrap();
        radio.set_modulation_params(gfsk).unwrap();

        let chip = sim(&mut radio);
        assert_eq!(chip.opcodes(), vec![0x8A, 0x8B, 0x8B]);
        assert_eq!(chip.log[0], vec![0x8A, 0x00]);
        assert_eq!(chip.log[1].len(), 9);
        assert_eq!(radio.packet_type(), PacketType::Gfsk);

        radio
            .set_modulation_params(ModulationParams::LoRa(LoRaModulationParams::default()))
            .unwrap();
        let chip = sim(&mut radio);
        assert_eq!(chip.log[3], vec![0x8A, 0x01]);
        assert_eq!(chip.log[4], vec![0x8B, 0x07, 0x04, 0x01, 0x00]);
    }

    #[test]
    fn named_crc_loads_registers_before_packet_params() {
        let mut radio = radio(Config::default());
        radio.set_packet_type(PacketType::Gfsk).unwrap();
        sim(&mut radio).clear_log();
        radio
            .set_packet_params(PacketParams::Gfsk(GfskPacketParams {
                crc: GfskCrc::Crc2ByteCcitt,
                ..Default::default()
            }))
            .unwrap();
        let chip = sim(&mut radio);
        assert_eq!(chip.opcodes(), vec![0x0D, 0x0D, 0x8C]);
        assert_eq!(chip.log[0], vec![0x0D, 0x06, 0xBC, 0x1D, 0x0F]);
        assert_eq!(chip.log[1], vec![0x0D, 0x06, 0xBE, 0x10, 0x21]);
        assert_eq!(chip.log[2][8], 0x06);
    }

    #[test]
    fn gfsk_only_registers_are_rejected_under_lora() {
        let mut radio = radio(Config::default());
        assert_eq!(radio.set_crc_seed(0x1D0F), Err(Error::UnsupportedPacketType(0x01)));
        assert_eq!(
            radio.set_crc_polynomial(0x1021),
            Err(Error::UnsupportedPacketType(0x01))
        );
        assert_eq!(
            radio.set_whitening_seed(0x01FF),
            Err(Error::UnsupportedPacketType(0x01))
        );
        assert!(sim(&mut radio).log.is_empty());
    }

    #[test]
    fn whitening_seed_preserves_unrelated_bits() {
        let mut radio = radio(Config::default());
        radio.set_packet_type(PacketType::Gfsk).unwrap();
        sim(&mut radio).set_registers(0x06B8, &[0xF0, 0x00]);
        radio.set_whitening_seed(0x0155).unwrap();
        let chip = sim(&mut radio);
        assert_eq!(chip.register(0x06B8), 0xF1);
        assert_eq!(chip.register(0x06B9), 0x55);

        radio.set_crc_seed(0xABCD).unwrap();
        assert_eq!(sim(&mut radio).register(0x06BC), 0xAB);
    }

    #[test]
    fn sx1262_tx_params() {
        let mut radio = radio(Config::default());
        radio.set_tx_params(30, RampTime::Micros40).unwrap();
        let chip = sim(&mut radio);
        assert_eq!(chip.log[0], vec![0x95, 0x04, 0x07, 0x00, 0x01]);
        assert_eq!(chip.register(0x08E7), 0x38);
        assert_eq!(chip.log[2], vec![0x8E, 22, 0x02]);
    }

    #[test]
    fn sx1261_tx_params() {
        let mut radio = radio(Config {
            chip: ChipVariant::Sx1261,
            ..Default::default()
        });
        radio.set_tx_params(15, RampTime::Micros800).unwrap();
        radio.set_tx_params(-9, RampTime::Micros800).unwrap();
        let chip = sim(&mut radio);
        assert_eq!(chip.log[0], vec![0x95, 0x06, 0x00, 0x01, 0x01]);
        assert_eq!(chip.register(0x08E7), 0x18);
        assert_eq!(chip.log[2], vec![0x8E, 14, 0x05]);
        assert_eq!(chip.log[3], vec![0x95, 0x04, 0x00, 0x01, 0x01]);
        assert_eq!(chip.log[5], vec![0x8E, (-3i8) as u8, 0x05]);
    }

    #[test]
    fn tcxo_enforces_minimum_ramp() {
        let mut radio = radio(Config {
            clock: ClockSource::Tcxo {
                voltage: TcxoVoltage::V1_8,
                startup_delay: 64,
            },
            ..Default::default()
        });
        radio.set_tx_params(14, RampTime::Micros10).unwrap();
        radio.set_tx_params(14, RampTime::Micros1700).unwrap();
        let frames = sim(&mut radio).frames(Opcode::SetTxParams);
        assert_eq!(frames[0][2], 0x04);
        assert_eq!(frames[1][2], 0x06);
    }

    #[test]
    fn payload_goes_to_tx_base() {
        let mut radio = radio(Config::default());
        radio.set_buffer_base_address(0x80, 0x00).unwrap();
        radio.send_payload(b"ping", Timeout::NONE).unwrap();
        let chip = sim(&mut radio);
        assert_eq!(&chip.buffer[0x80..0x84], b"ping");
        assert_eq!(chip.opcodes(), vec![0x8F, 0x0E, 0x83]);
        assert_eq!(radio.operating_mode(), OperatingMode::Tx);
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let mut radio = radio(Config::default());
        let payload = [0u8; 256];
        assert_eq!(
            radio.set_payload(&payload),
            Err(Error::BufferOverflow {
                requested: 256,
                available: 255
            })
        );
    }

    #[test]
    fn get_payload_checks_capacity() {
        let mut radio = radio(Config::default());
        sim(&mut radio).buffer[0x20..0x2A].copy_from_slice(b"0123456789");
        sim(&mut radio).respond(Opcode::GetRxBufferStatus, &[10, 0x20]);

        let mut small = [0u8; 4];
        assert_eq!(
            radio.get_payload(&mut small),
            Err(Error::BufferOverflow {
                requested: 10,
                available: 4
            })
        );
        assert!(sim(&mut radio).frames(Opcode::ReadBuffer).is_empty());

        let mut buffer = [0u8; 16];
        assert_eq!(radio.get_payload(&mut buffer), Ok(10));
        assert_eq!(&buffer[..10], b"0123456789");
    }

    #[test]
    fn implicit_header_length_comes_from_register() {
        let mut radio = radio(Config::default());
        sim(&mut radio).respond(Opcode::GetRxBufferStatus, &[0, 0x10]);
        sim(&mut radio).set_registers(0x0702, &[7]);
        sim(&mut radio).set_registers(0x0704, &[0x80]);
        assert_eq!(
            radio.get_rx_buffer_status().unwrap(),
            RxBufferStatus {
                payload_length: 7,
                buffer_pointer: 0x10
            }
        );

        sim(&mut radio).set_registers(0x0704, &[0x00]);
        assert_eq!(radio.get_rx_buffer_status().unwrap().payload_length, 0);
    }

    #[test]
    fn random_number_from_receiver() {
        let mut radio = radio(Config::default());
        sim(&mut radio).set_registers(0x0819, &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(radio.get_random().unwrap(), 0xDEAD_BEEF);
        let chip = sim(&mut radio);
        assert_eq!(chip.opcodes(), vec![0x82, 0x1D, 0x80]);
        assert_eq!(chip.log[0], vec![0x82, 0x00, 0x00, 0x00]);
        assert!(chip.delays.contains(&1));
        assert_eq!(radio.operating_mode(), OperatingMode::StandbyRc);
    }

    #[test]
    fn boosted_rx_sets_gain_first() {
        let mut radio = radio(Config::default());
        radio.set_rx_boosted(RxMode::Continuous).unwrap();
        let chip = sim(&mut radio);
        assert_eq!(chip.log[0], vec![0x0D, 0x08, 0xAC, 0x96]);
        assert_eq!(chip.log[1], vec![0x82, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn chip_packet_type_is_read_back() {
        let mut radio = radio(Config::default());
        assert_eq!(radio.get_packet_type(), Ok(PacketType::LoRa));
        sim(&mut radio).packet_type = 0x05;
        assert_eq!(radio.get_packet_type(), Err(Error::UnsupportedPacketType(0x05)));
    }

    #[test]
    fn sleep_then_wake_on_next_command() {
        let mut radio = radio(Config::default());
        radio.set_sleep(SleepConfig::WARM_START).unwrap();
        assert_eq!(radio.operating_mode(), OperatingMode::Sleep);
        assert!(!radio.device().antenna_switch());

        radio.get_status().unwrap();
        assert_eq!(sim(&mut radio).wakeups, 2);
        assert!(radio.device().antenna_switch());
    }

    #[test]
    fn duty_cycle_requires_wakeup() {
        let mut radio = radio(Config::default());
        radio.set_rx_duty_cycle(64, 640).unwrap();
        assert_eq!(radio.operating_mode(), OperatingMode::RxDutyCycle);
        radio.set_standby(StandbyConfig::Rc).unwrap();
        assert_eq!(sim(&mut radio).wakeups, 2);
    }

    #[test]
    fn statistics_and_errors() {
        let mut radio = radio(Config::default());
        sim(&mut radio).respond(Opcode::GetStats, &[0, 12, 0, 2, 0, 1]);
        sim(&mut radio).respond(Opcode::GetError, &[0x00, 0x20]);
        sim(&mut radio).respond(Opcode::GetRssiInst, &[0xB4]);

        let stats = radio.get_stats().unwrap();
        assert_eq!(stats.packets_received, 12);
        assert_eq!(stats.packets_crc_error, 2);
        assert_eq!(stats.packets_header_error, 1);
        assert_eq!(radio.get_device_errors().unwrap(), DeviceErrors::from_bits_retain(0x20));
        assert_eq!(radio.get_rssi_inst().unwrap(), -90);

        radio.reset_stats().unwrap();
        radio.clear_device_errors().unwrap();
        let chip = sim(&mut radio);
        assert_eq!(chip.frames(Opcode::ResetStats)[0], &vec![0x00, 0, 0, 0, 0, 0, 0]);
        assert_eq!(chip.frames(Opcode::ClearDeviceErrors)[0], &vec![0x07, 0x00, 0x00]);
    }

    #[test]
    fn reset_wakeup_standby_lora_rx() {
        let mut radio = Sx126x::new(SimChip::new(), Config::default(), Delivery::Immediate);
        radio.init().unwrap();
        assert_eq!(radio.operating_mode(), OperatingMode::StandbyRc);

        radio.set_buffer_base_address(0x00, 0x00).unwrap();
        radio.set_rf_frequency(868_100_000).unwrap();
        radio
            .set_modulation_params(ModulationParams::LoRa(LoRaModulationParams::default()))
            .unwrap();
        radio
            .set_packet_params(PacketParams::LoRa(LoRaPacketParams {
                header_type: LoRaHeader::Explicit,
                payload_length: 64,
                ..Default::default()
            }))
            .unwrap();
        radio.set_dio_irq_params(DioIrqConfig::dio1(IrqMask::RX_DONE | IrqMask::RX_TX_TIMEOUT))
            .unwrap();
        radio.set_rx(RxMode::Single).unwrap();

        assert_eq!(radio.operating_mode(), OperatingMode::Rx);
        assert_eq!(radio.get_packet_type().unwrap(), PacketType::LoRa);
        assert_eq!(sim(&mut radio).frames(Opcode::SetRx)[0], &vec![0x82, 0x00, 0x00, 0x00]);
        let chip = sim(&mut radio);
        assert_eq!(chip.resets, 1);
        assert_eq!(chip.wakeups, 1);
        assert!(chip.frames(Opcode::SetPacketType).len() == 1);
        assert_eq!(
            chip.frames(Opcode::SetPacketParams)[0],
            &vec![0x8C, 0x00, 0x08, 0x00, 64, 0x01, 0x00]
        );
    }
}
