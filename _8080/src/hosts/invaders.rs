//! The Space Invaders cabinet: 8 KiB of ROM, 8 KiB of RAM with the frame buffer at its top,
//! a 16-bit shift register on ports 2/3/4 and the player inputs on ports 1 and 2.

use tracing::{debug, trace};

use super::{copy_image, LoadError};
use crate::{Fault, Harness};

pub const ROM_SIZE: u16 = 0x2000;
pub const RAM_END: u16 = 0x4000;
pub const VIDEO_RAM: u16 = 0x2400;

/// Cabinet controls wired to IN port 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Coin,
    Left,
    Right,
    Fire,
    Start1,
}

impl Key {
    fn mask(self) -> u8 {
        match self {
            Key::Coin => 0x01,
            Key::Start1 => 0x04,
            Key::Fire => 0x10,
            Key::Left => 0x20,
            Key::Right => 0x40,
        }
    }
}

pub struct Cabinet {
    memory: Vec<u8>,
    shift: [u8; 2],
    offset: u8,
    port1: u8,
    port2: u8,
    strict: bool,
}

impl Default for Cabinet {
    fn default() -> Self {
        Self {
            memory: vec![0; RAM_END as usize],
            shift: [0; 2],
            offset: 0,
            port1: 0x08,
            port2: 0,
            strict: false,
        }
    }
}

impl Cabinet {
    /// A cabinet with `rom` at address 0. The image may not exceed the ROM region.
    pub fn load(rom: &[u8]) -> Result<Self, LoadError> {
        let mut cabinet = Self::default();
        copy_image(&mut cabinet.memory, 0, ROM_SIZE as usize, rom)?;
        Ok(cabinet)
    }

    /// Faults on writes at or above the top of RAM instead of dropping them.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn press(&mut self, key: Key) {
        self.port1 |= key.mask();
    }

    pub fn release(&mut self, key: Key) {
        self.port1 &= !key.mask();
    }

    /// The 1-bit-per-pixel frame buffer, 0x2400 to the top of RAM.
    pub fn video_ram(&self) -> &[u8] {
        &self.memory[VIDEO_RAM as usize..]
    }

    fn shifted(&self) -> u8 {
        let value = u16::from_be_bytes(self.shift);
        (value >> (8 - self.offset)) as u8
    }
}

impl Harness for Cabinet {
    fn read(&self, from: u16) -> u8 {
        self.memory[(from & (RAM_END - 1)) as usize]
    }

    fn write(&mut self, to: u16, value: u8) -> Result<(), Fault> {
        match to {
            0..ROM_SIZE => Err(Fault::ReadOnly { address: to, value }),
            ROM_SIZE..RAM_END => {
                self.memory[to as usize] = value;
                Ok(())
            }
            _ if self.strict => Err(Fault::OutOfRange { address: to, value }),
            _ => {
                trace!(address = to, value, "write above RAM dropped");
                Ok(())
            }
        }
    }

    fn input(&mut self, port: u8) -> Result<u8, Fault> {
        match port {
            1 => Ok(self.port1),
            2 => Ok(self.port2),
            3 => Ok(self.shifted()),
            _ => Err(Fault::UnknownInputPort(port)),
        }
    }

    fn output(&mut self, port: u8, value: u8) -> Result<(), Fault> {
        match port {
            2 => self.offset = value & 0x07,
            4 => self.shift = [value, self.shift[0]],
            3 | 5 => debug!(port, value, "sound"),
            6 => trace!(value, "watchdog"),
            _ => return Err(Fault::UnknownOutputPort(port)),
        }
        Ok(())
    }
}
