//! Hand assembly for the integration tests.

#![allow(dead_code)]

/// A program image that grows from `origin`, one instruction at a time.
pub struct Image {
    origin: u16,
    bytes: Vec<u8>,
}

impl Image {
    pub fn at(origin: u16) -> Self {
        Self { origin, bytes: Vec::new() }
    }

    /// The address the next byte will land on.
    pub fn here(&self) -> u16 {
        self.origin + self.bytes.len() as u16
    }

    /// Pads with zeroes up to `address`.
    pub fn org(&mut self, address: u16) -> &mut Self {
        assert!(address >= self.here(), "{address:#06X} is behind {:#06X}", self.here());
        self.bytes.resize((address - self.origin) as usize, 0x00);
        self
    }

    pub fn op(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// `text` followed by the CP/M `$` terminator.
    pub fn text(&mut self, text: &str) -> &mut Self {
        self.bytes.extend(text.bytes());
        self.bytes.push(b'$');
        self
    }

    pub fn build(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

pub fn word(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}

/// `MVI C,9; LXI D,message; CALL 5`
pub fn print_string(message: u16) -> [u8; 8] {
    let [low, high] = word(message);
    [0x0E, 0x09, 0x11, low, high, 0xCD, 0x05, 0x00]
}

/// `JMP to`
pub fn jump(to: u16) -> [u8; 3] {
    let [low, high] = word(to);
    [0xC3, low, high]
}

/// `JNZ to`
pub fn jump_not_zero(to: u16) -> [u8; 3] {
    let [low, high] = word(to);
    [0xC2, low, high]
}
