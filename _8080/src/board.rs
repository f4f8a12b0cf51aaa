use core::ops::{Index, IndexMut};

use crate::{Fault, Harness};

/// A bare test host: 64 KiB of RAM, every address writable, and a latch per port in each direction.
pub struct SimpleBoard {
    ram: [u8; 65536],
    port_out: [u8; 256],
    port_in: [u8; 256],
}

impl Default for SimpleBoard {
    fn default() -> Self {
        Self {
            ram: [0; 65536],
            port_out: [0; 256],
            port_in: [0; 256],
        }
    }
}

impl SimpleBoard {
    /// A board with `image` copied in at `origin`; bytes past the top of memory are dropped.
    pub fn with_image(origin: u16, image: &[u8]) -> Self {
        let mut board = Self::default();
        board.load(origin, image);
        board
    }

    pub fn load(&mut self, origin: u16, image: &[u8]) {
        let start = origin as usize;
        let end = (start + image.len()).min(self.ram.len());
        self.ram[start..end].copy_from_slice(&image[..end - start]);
    }

    /// Sets the value the next `IN port` will read.
    pub fn set_input(&mut self, port: u8, value: u8) {
        self.port_in[port as usize] = value;
    }

    /// The last value written by `OUT port`.
    pub fn output_latch(&self, port: u8) -> u8 {
        self.port_out[port as usize]
    }
}

impl Harness for SimpleBoard {
    fn read(&self, from: u16) -> u8 { self.ram[from as usize] }
    fn write(&mut self, to: u16, value: u8) -> Result<(), Fault> {
        self.ram[to as usize] = value;
        Ok(())
    }
    fn input(&mut self, port: u8) -> Result<u8, Fault> {
        Ok(self.port_in[port as usize])
    }
    fn output(&mut self, port: u8, value: u8) -> Result<(), Fault> {
        self.port_out[port as usize] = value;
        Ok(())
    }
}

impl Index<u16> for SimpleBoard {
    type Output = u8;
    fn index(&self, index: u16) -> &Self::Output { &self.ram[index as usize] }
}

impl IndexMut<u16> for SimpleBoard {
    fn index_mut(&mut self, index: u16) -> &mut Self::Output { &mut self.ram[index as usize] }
}
