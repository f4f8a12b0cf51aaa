use core::fmt;

pub mod access;
pub mod alu;
mod execution;
pub use execution::{opcode, table};

use access::Register;
use alu::Flags;

/// This struct stores the internal registers and flags of the 8080 CPU.
///
/// It owns no memory; everything addressable lives in the [`Harness`](crate::Harness).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
	pub(crate) pc: u16,
	pub(crate) sp: u16,
	pub(crate) register: [u8; 7],
	pub(crate) c: bool, pub(crate) a: bool, pub(crate) p: bool, pub(crate) m: bool, pub(crate) z: bool,
	pub(crate) interrupts: bool,
	pub(crate) cycles: u64,
}

impl Default for State {
	fn default() -> Self { Self::new() }
}

impl State {
	/// Creates a fresh state with all registers, flags and the cycle counter cleared and interrupts disabled.
	pub fn new() -> Self {
		Self {
			register: [0; 7],
			c: false, a: false, p: false, m: false, z: false,
			interrupts: false,
			pc: 0, sp: 0,
			cycles: 0,
		}
	}

	pub fn pc(&self) -> u16 { self.pc }
	pub fn set_pc(&mut self, pc: u16) { self.pc = pc }
	pub fn sp(&self) -> u16 { self.sp }
	pub fn set_sp(&mut self, sp: u16) { self.sp = sp }

	/// Total cycles consumed since the state was created.
	pub fn cycles(&self) -> u64 { self.cycles }

	pub(crate) fn add_cycles(&mut self, cycles: u8) {
		self.cycles = self.cycles.wrapping_add(cycles as u64);
	}

	pub fn interrupts_enabled(&self) -> bool { self.interrupts }
	pub fn enable_interrupts(&mut self) { self.interrupts = true }
	pub fn disable_interrupts(&mut self) { self.interrupts = false }

	pub fn flags(&self) -> Flags {
		Flags { carry: self.c, parity: self.p, aux: self.a, zero: self.z, sign: self.m }
	}

	pub fn set_flags(&mut self, flags: Flags) {
		(self.c, self.p, self.a, self.z, self.m) = (flags.carry, flags.parity, flags.aux, flags.zero, flags.sign);
	}

	/// Applies zero, sign, parity and auxiliary carry from `flags` but keeps the current carry.
	pub(crate) fn set_flags_keeping_carry(&mut self, flags: Flags) {
		let carry = self.c;
		self.set_flags(Flags { carry, ..flags });
	}
}

impl fmt::Display for State {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let bit = |set: bool, name: char| if set { name } else { '.' };
		write!(f, " {}{}{}{}{}", bit(self.z, 'z'), bit(self.m, 's'), bit(self.p, 'p'), bit(self.c, 'c'), bit(self.a, 'a'))?;
		write!(f, "  A ${:02x} B ${:02x} C ${:02x} D ${:02x} E ${:02x} H ${:02x} L ${:02x} SP {:04x}",
			self[Register::A], self[Register::B], self[Register::C], self[Register::D],
			self[Register::E], self[Register::H], self[Register::L], self.sp)
	}
}
