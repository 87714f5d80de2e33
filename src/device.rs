//! SX126x command codec
//!
//! [`Device`] frames commands, register accesses and data buffer accesses
//! over a [`Transport`] and mirrors the chip state those commands imply:
//! the operating mode, the selected packet type and whether the antenna
//! switch is powered.
//!
//! Every SPI exchange has the same shape. The opcode goes out first,
//! followed by its parameters. Commands that return data are answered after
//! one status byte, which is clocked out with a NOP and discarded. GetStatus
//! is the exception: its status byte is the payload.
//!
//! | Access | MOSI |
//! |---|---|
//! | command | `op params..` |
//! | command read | `op params.. NOP` then payload |
//! | register write | `0x0D addr_hi addr_lo data..` |
//! | register read | `0x1D addr_hi addr_lo NOP` then payload |
//! | buffer write | `0x0E offset data..` |
//! | buffer read | `0x1E offset NOP` then payload |
//!
//! A device that is asleep, or duty cycling its receiver, is woken before
//! any of these are sent.
//!
//! # Example
//! ```no_run
//! use sx126x_driver::{commands::{SetStandby, StandbyConfig}, Device, Error, Transport};
//!
//! fn standby<T: Transport>(transport: T) -> Result<Device<T>, Error> {
//!     let mut device = Device::new(transport);
//!     device.execute_command(SetStandby { config: StandbyConfig::Rc })?;
//!     Ok(device)
//! }
//! ```

use core::convert::Infallible;

use embedded_hal::spi::Operation;
use regiface::{
    ByteArray, Command, FromByteArray, NoParameters, ReadableRegister, ToByteArray,
    WritableRegister,
};

use crate::{
    commands::{Opcode, PacketType},
    mode::{self, OperatingMode},
    transport::{Transport, NOP},
    Error,
};

/// Command level interface to the SX126x.
///
/// Owns the transport. A new device is assumed to be asleep, so the first
/// access wakes it.
pub struct Device<T> {
    transport: T,
    mode: OperatingMode,
    packet_type: PacketType,
    antenna_switch: bool,
}

impl<T> Device<T> {
    /// Creates a new Device instance wrapping the provided transport.
    ///
    /// # Arguments
    /// * `transport` - Framed, busy-aware byte exchange with the radio
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            mode: OperatingMode::Sleep,
            packet_type: PacketType::None,
            antenna_switch: false,
        }
    }

    /// Releases the underlying transport.
    pub fn release(self) -> T {
        self.transport
    }

    /// Operating mode implied by the last mode changing command
    pub fn operating_mode(&self) -> OperatingMode {
        self.mode
    }

    /// Packet type selected by the last SetPacketType
    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    /// Whether the antenna switch is powered
    ///
    /// Goes off with SetSleep and back on with the next wake-up.
    pub fn antenna_switch(&self) -> bool {
        self.antenna_switch
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T: Transport> Device<T> {
    /// Pulses NRESET. The chip comes back up in STDBY_RC.
    pub fn reset(&mut self) -> Result<(), Error> {
        debug!("reset");
        self.transport.reset()?;
        self.enter(OperatingMode::StandbyRc);
        Ok(())
    }

    /// Wakes the chip regardless of the mirrored mode
    pub fn wakeup(&mut self) -> Result<(), Error> {
        debug!("wakeup from {}", self.mode);
        self.transport.wakeup()?;
        self.enter(OperatingMode::StandbyRc);
        self.antenna_switch = true;
        Ok(())
    }

    /// Wakes the chip if it cannot take SPI traffic in its current mode.
    pub fn check_device_ready(&mut self) -> Result<(), Error> {
        if self.mode.needs_wakeup() {
            self.wakeup()?;
        }
        Ok(())
    }

    /// Blocks for `ms` milliseconds
    pub fn delay_ms(&mut self, ms: u32) {
        self.transport.delay_ms(ms);
    }

    fn enter(&mut self, mode: OperatingMode) {
        if mode != self.mode {
            debug!("mode {} -> {}", self.mode, mode);
        }
        self.mode = mode;
    }

    fn track(&mut self, opcode: u8, params: &[u8]) {
        if let Some(mode) = mode::transition(opcode, params) {
            self.enter(mode);
            if mode == OperatingMode::Sleep {
                self.antenna_switch = false;
            }
        }
        if opcode == Opcode::SetPacketType as u8 {
            if let Some(packet_type) = params.first().and_then(|b| PacketType::try_from(*b).ok()) {
                self.packet_type = packet_type;
            }
        }
    }

    /// Sends `opcode` with `params`, no data is returned.
    ///
    /// # Errors
    /// * `Error::BusTimeout` - BUSY was never released
    /// * `Error::Spi` / `Error::Pin` - the HAL reported an error
    pub fn write_command(&mut self, opcode: u8, params: &[u8]) -> Result<(), Error> {
        self.check_device_ready()?;
        trace!("command {:#x} {}", opcode, params);
        self.transport.transfer(opcode, params, &mut [])?;
        self.track(opcode, params);
        Ok(())
    }

    /// Sends `opcode` with `params` and reads `out.len()` bytes of response.
    pub fn query(&mut self, opcode: u8, params: &[u8], out: &mut [u8]) -> Result<(), Error> {
        self.check_device_ready()?;
        trace!("query {:#x} {}", opcode, params);
        let status: &[u8] = if opcode == Opcode::GetStatus as u8 {
            &[]
        } else {
            &[NOP]
        };
        self.transport.transaction(&mut [
            Operation::Write(&[opcode]),
            Operation::Write(params),
            Operation::Write(status),
            Operation::Read(out),
        ])?;
        self.track(opcode, params);
        Ok(())
    }

    /// Sends a parameterless `opcode` and reads `out.len()` bytes of response.
    pub fn read_command(&mut self, opcode: u8, out: &mut [u8]) -> Result<(), Error> {
        self.query(opcode, &[], out)
    }

    /// Writes consecutive registers starting at `address`.
    pub fn write_registers(&mut self, address: u16, bytes: &[u8]) -> Result<(), Error> {
        self.check_device_ready()?;
        trace!("write {:#x} {}", address, bytes);
        let [hi, lo] = address.to_be_bytes();
        self.transport.transaction(&mut [
            Operation::Write(&[Opcode::WriteRegister as u8, hi, lo]),
            Operation::Write(bytes),
        ])
    }

    /// Reads consecutive registers starting at `address`.
    pub fn read_registers(&mut self, address: u16, out: &mut [u8]) -> Result<(), Error> {
        self.check_device_ready()?;
        let [hi, lo] = address.to_be_bytes();
        self.transport.transaction(&mut [
            Operation::Write(&[Opcode::ReadRegister as u8, hi, lo, NOP]),
            Operation::Read(out),
        ])?;
        trace!("read {:#x} {}", address, out);
        Ok(())
    }

    pub fn write_register(&mut self, address: u16, value: u8) -> Result<(), Error> {
        self.write_registers(address, &[value])
    }

    pub fn read_register(&mut self, address: u16) -> Result<u8, Error> {
        let mut value = [0u8];
        self.read_registers(address, &mut value)?;
        Ok(value[0])
    }

    /// Writes bytes to the device's data buffer at `offset`.
    ///
    /// The buffer is 256 bytes long and addressing wraps around.
    pub fn write_buffer(&mut self, offset: u8, bytes: &[u8]) -> Result<(), Error> {
        self.check_device_ready()?;
        self.transport.transaction(&mut [
            Operation::Write(&[Opcode::WriteBuffer as u8, offset]),
            Operation::Write(bytes),
        ])
    }

    /// Reads bytes from the device's data buffer starting at `offset`.
    pub fn read_buffer(&mut self, offset: u8, bytes: &mut [u8]) -> Result<(), Error> {
        self.check_device_ready()?;
        self.transport.transaction(&mut [
            Operation::Write(&[Opcode::ReadBuffer as u8, offset, NOP]),
            Operation::Read(bytes),
        ])
    }

    /// Reads a register value from the device.
    ///
    /// # Type Parameters
    /// * `R` - Register type implementing ReadableRegister with u16 ID
    ///
    /// # Errors
    /// * `Error::Deserialization` - Failed to parse register value
    pub fn read<R>(&mut self) -> Result<R, Error>
    where
        R: ReadableRegister<IdType = u16>,
    {
        let mut raw_value = R::Array::new();
        self.read_registers(R::id(), raw_value.as_mut())?;
        R::from_bytes(raw_value).map_err(|_| Error::Deserialization)
    }

    /// Writes a value to a device register.
    pub fn write<R>(&mut self, register: R) -> Result<(), Error>
    where
        R: WritableRegister<IdType = u16, Error = Infallible>,
    {
        let raw_value = match register.to_bytes() {
            Ok(bytes) => bytes,
            Err(never) => match never {},
        };
        self.write_registers(R::id(), raw_value.as_ref())
    }

    /// Executes a command on the device.
    ///
    /// Commands without response parameters are sent as plain writes,
    /// everything else is read back after the status byte.
    ///
    /// # Returns
    /// Command response parameters on success
    ///
    /// # Errors
    /// * `Error::Deserialization` - Failed to parse command response
    pub fn execute_command<C>(&mut self, command: C) -> Result<C::ResponseParameters, Error>
    where
        C: Command<IdType = u8>,
        C::CommandParameters: ToByteArray<Error = Infallible>,
    {
        let request = match command.invoking_parameters().to_bytes() {
            Ok(bytes) => bytes,
            Err(never) => match never {},
        };
        let mut raw_response = <C::ResponseParameters as FromByteArray>::Array::new();

        if raw_response.as_mut().is_empty() {
            self.write_command(C::id(), request.as_ref())?;
        } else {
            self.query(C::id(), request.as_ref(), raw_response.as_mut())?;
        }

        C::ResponseParameters::from_bytes(raw_response).map_err(|_| Error::Deserialization)
    }

    /// Executes a command that returns no data
    pub fn send<C>(&mut self, command: C) -> Result<(), Error>
    where
        C: Command<IdType = u8, ResponseParameters = NoParameters>,
        C::CommandParameters: ToByteArray<Error = Infallible>,
    {
        self.execute_command(command).map(|_| ())
    }
}
