use core::ops::{Index, IndexMut};
use crate::{chip::State, Fault, Harness};

/// The seven byte registers, numbered by their slot in [`State`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    B = 0,
    C = 1,
    D = 2,
    E = 3,
    H = 4,
    L = 5,
    A = 6,
}

/// Register pairs. The first register of the pair holds the high byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Double {
    BC = 0,
    DE = 1,
    HL = 2,
}

use self::{Register as R, Double as D, Internal as I};

/// An 8-bit operand: a register or the memory byte addressed by HL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Byte {
    Single(Register),
    Indirect,
}

impl Byte {
    pub fn use_bus(&self) -> bool {
        matches!(self, Byte::Indirect)
    }
}

/// A 16-bit register operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Internal {
    Wide(Double),
    StackPointer,
}

/// What PUSH and POP move: a register pair, or the accumulator with the packed flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Word {
    OnBoard(Internal),
    ProgramStatus,
}

impl Double {
    fn halves(self) -> (Register, Register) {
        match self {
            D::BC => (R::B, R::C),
            D::DE => (R::D, R::E),
            D::HL => (R::H, R::L),
        }
    }
}

/// Bit positions of the flags inside the PSW byte.
mod psw {
    pub const CARRY: u8 = 0b0000_0001;
    pub const FIXED: u8 = 0b0000_0010;
    pub const PARITY: u8 = 0b0000_0100;
    pub const AUX: u8 = 0b0001_0000;
    pub const ZERO: u8 = 0b0100_0000;
    pub const SIGN: u8 = 0b1000_0000;
}

impl State {
    /// Packs the flags in 8080 PSW order: `S Z 0 AC 0 P 1 CY`.
    pub fn flags_byte(&self) -> u8 {
        let bit = |set: bool, mask: u8| if set { mask } else { 0 };
        psw::FIXED
            | bit(self.c, psw::CARRY)
            | bit(self.p, psw::PARITY)
            | bit(self.a, psw::AUX)
            | bit(self.z, psw::ZERO)
            | bit(self.m, psw::SIGN)
    }

    /// Inverse of [`flags_byte`](Self::flags_byte); the fixed bits are ignored.
    pub fn set_flags_byte(&mut self, bits: u8) {
        (self.c, self.p, self.a, self.z, self.m) = (
            bits & psw::CARRY != 0,
            bits & psw::PARITY != 0,
            bits & psw::AUX != 0,
            bits & psw::ZERO != 0,
            bits & psw::SIGN != 0,
        );
    }

    pub fn pair(&self, pair: Double) -> u16 {
        let (high, low) = pair.halves();
        u16::from_be_bytes([self[high], self[low]])
    }

    pub fn set_pair(&mut self, pair: Double, value: u16) {
        let (high, low) = pair.halves();
        [self[high], self[low]] = value.to_be_bytes();
    }

    pub fn bc(&self) -> u16 { self.pair(D::BC) }
    pub fn de(&self) -> u16 { self.pair(D::DE) }
    pub fn hl(&self) -> u16 { self.pair(D::HL) }
    pub fn set_bc(&mut self, value: u16) { self.set_pair(D::BC, value) }
    pub fn set_de(&mut self, value: u16) { self.set_pair(D::DE, value) }
    pub fn set_hl(&mut self, value: u16) { self.set_pair(D::HL, value) }

    pub fn word(&self, register: Internal) -> u16 {
        match register {
            I::Wide(pair) => self.pair(pair),
            I::StackPointer => self.sp,
        }
    }

    pub fn set_word(&mut self, register: Internal, value: u16) {
        match register {
            I::Wide(pair) => self.set_pair(pair, value),
            I::StackPointer => self.sp = value,
        }
    }

    /// Accumulator in the high byte, flags in the low byte.
    pub fn status(&self) -> u16 {
        u16::from_be_bytes([self[R::A], self.flags_byte()])
    }

    pub fn set_status(&mut self, value: u16) {
        let [accumulator, flags] = value.to_be_bytes();
        self[R::A] = accumulator;
        self.set_flags_byte(flags);
    }

    /// Writes `high` at `sp - 1`, then `low` at `sp - 2`, then moves `sp` down by two.
    pub fn push<H: Harness + ?Sized>(&mut self, bus: &mut H, high: u8, low: u8) -> Result<(), Fault> {
        bus.write(self.sp.wrapping_sub(1), high)?;
        bus.write(self.sp.wrapping_sub(2), low)?;
        self.sp = self.sp.wrapping_sub(2);
        Ok(())
    }

    /// Reads `low` at `sp` and `high` at `sp + 1`, then moves `sp` up by two. Returns `(high, low)`.
    pub fn pop<H: Harness + ?Sized>(&mut self, bus: &H) -> (u8, u8) {
        let low = bus.read(self.sp);
        let high = bus.read(self.sp.wrapping_add(1));
        self.sp = self.sp.wrapping_add(2);
        (high, low)
    }

    pub fn push_word<H: Harness + ?Sized>(&mut self, bus: &mut H, value: u16) -> Result<(), Fault> {
        let [high, low] = value.to_be_bytes();
        self.push(bus, high, low)
    }

    pub fn pop_word<H: Harness + ?Sized>(&mut self, bus: &H) -> u16 {
        let (high, low) = self.pop(bus);
        u16::from_be_bytes([high, low])
    }
}

impl Index<Register> for State {
    type Output = u8;
    fn index(&self, index: Register) -> &Self::Output { &self.register[index as usize] }
}

impl IndexMut<Register> for State {
    fn index_mut(&mut self, index: Register) -> &mut Self::Output { &mut self.register[index as usize] }
}
