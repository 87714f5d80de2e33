//! Simulated SX126x for unit tests
//!
//! [`SimChip`] answers transactions the way the chip does on the wire: the
//! status byte comes back while the opcode's follow-up byte is shifted, and
//! payloads start after the header and throw-away bytes. Register and buffer
//! writes land in memory so later reads see them. Every frame's MOSI bytes
//! are logged.

use std::{collections::HashMap, vec, vec::Vec};

use embedded_hal::spi::Operation;

use crate::{commands::Opcode, transport::Transport, Error};

pub struct SimChip {
    pub registers: HashMap<u16, u8>,
    pub buffer: [u8; 256],
    /// Status byte returned by every command
    pub status: u8,
    pub irq: u16,
    pub packet_type: u8,
    pub responses: HashMap<u8, Vec<u8>>,
    /// MOSI bytes of each transaction, in order
    pub log: Vec<Vec<u8>>,
    pub wakeups: usize,
    pub resets: usize,
    pub delays: Vec<u32>,
    pub busy_stuck: bool,
}

impl SimChip {
    pub fn new() -> Self {
        Self {
            registers: HashMap::new(),
            buffer: [0; 256],
            status: 0x22,
            irq: 0,
            packet_type: 0x00,
            responses: HashMap::new(),
            log: Vec::new(),
            wakeups: 0,
            resets: 0,
            delays: Vec::new(),
            busy_stuck: false,
        }
    }

    /// Payload returned for `opcode` after the status byte
    pub fn respond(&mut self, opcode: Opcode, payload: &[u8]) {
        self.responses.insert(opcode as u8, payload.to_vec());
    }

    pub fn set_registers(&mut self, address: u16, bytes: &[u8]) {
        for (i, byte) in bytes.iter().enumerate() {
            self.registers.insert(address.wrapping_add(i as u16), *byte);
        }
    }

    pub fn register(&self, address: u16) -> u8 {
        self.registers.get(&address).copied().unwrap_or(0)
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Opcodes of the logged frames
    pub fn opcodes(&self) -> Vec<u8> {
        self.log.iter().filter_map(|frame| frame.first().copied()).collect()
    }

    /// Logged frames starting with `opcode`
    pub fn frames(&self, opcode: Opcode) -> Vec<&Vec<u8>> {
        self.log
            .iter()
            .filter(|frame| frame.first() == Some(&(opcode as u8)))
            .collect()
    }

    fn miso(&self, mosi: &[u8]) -> Vec<u8> {
        let mut miso = vec![self.status; mosi.len()];
        let Some(&opcode) = mosi.first() else {
            return miso;
        };
        miso[0] = 0;
        let mut fill = |start: usize, data: &[u8]| {
            for (slot, byte) in miso.iter_mut().skip(start).zip(data) {
                *slot = *byte;
            }
        };
        match Opcode::try_from(opcode) {
            Ok(Opcode::ReadRegister) if mosi.len() > 4 => {
                let address = u16::from_be_bytes([mosi[1], mosi[2]]);
                let data: Vec<u8> = (0..mosi.len() - 4)
                    .map(|i| self.register(address.wrapping_add(i as u16)))
                    .collect();
                fill(4, &data);
            }
            Ok(Opcode::ReadBuffer) if mosi.len() > 3 => {
                let offset = mosi[1];
                let data: Vec<u8> = (0..mosi.len() - 3)
                    .map(|i| self.buffer[offset.wrapping_add(i as u8) as usize])
                    .collect();
                fill(3, &data);
            }
            Ok(Opcode::GetIrqStatus) => fill(2, &self.irq.to_be_bytes()),
            Ok(Opcode::GetPacketType) => fill(2, &[self.packet_type]),
            _ => {
                if let Some(payload) = self.responses.get(&opcode) {
                    fill(2, payload);
                }
            }
        }
        miso
    }

    fn apply(&mut self, mosi: &[u8]) {
        let Some(&opcode) = mosi.first() else {
            return;
        };
        match Opcode::try_from(opcode) {
            Ok(Opcode::WriteRegister) if mosi.len() > 3 => {
                let address = u16::from_be_bytes([mosi[1], mosi[2]]);
                self.set_registers(address, &mosi[3..]);
            }
            Ok(Opcode::WriteBuffer) if mosi.len() > 2 => {
                let offset = mosi[1];
                for (i, byte) in mosi[2..].iter().enumerate() {
                    self.buffer[offset.wrapping_add(i as u8) as usize] = *byte;
                }
            }
            Ok(Opcode::ClearIrqStatus) if mosi.len() > 2 => {
                self.irq &= !u16::from_be_bytes([mosi[1], mosi[2]]);
            }
            Ok(Opcode::SetPacketType) if mosi.len() > 1 => self.packet_type = mosi[1],
            _ => {}
        }
    }
}

impl Transport for SimChip {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Error> {
        if self.busy_stuck {
            return Err(Error::BusTimeout);
        }

        let mut mosi = Vec::new();
        for operation in operations.iter() {
            match operation {
                Operation::Write(bytes) => mosi.extend_from_slice(bytes),
                Operation::Read(buffer) => mosi.extend(core::iter::repeat(0x00).take(buffer.len())),
                Operation::Transfer(_, write) => mosi.extend_from_slice(write),
                Operation::TransferInPlace(buffer) => mosi.extend_from_slice(buffer),
                Operation::DelayNs(_) => {}
            }
        }

        let miso = self.miso(&mosi);
        let mut cursor = 0;
        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(bytes) => cursor += bytes.len(),
                Operation::Read(buffer) | Operation::TransferInPlace(buffer) => {
                    let len = buffer.len();
                    buffer.copy_from_slice(&miso[cursor..cursor + len]);
                    cursor += len;
                }
                Operation::Transfer(read, write) => {
                    let len = read.len().min(write.len());
                    read[..len].copy_from_slice(&miso[cursor..cursor + len]);
                    cursor += write.len();
                }
                Operation::DelayNs(_) => {}
            }
        }

        self.apply(&mosi);
        self.log.push(mosi);
        Ok(())
    }

    fn wakeup(&mut self) -> Result<(), Error> {
        if self.busy_stuck {
            return Err(Error::BusTimeout);
        }
        self.wakeups += 1;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), Error> {
        self.resets += 1;
        Ok(())
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays.push(ms);
    }
}
