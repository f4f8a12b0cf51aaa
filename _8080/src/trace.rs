//! Observation hooks around each executed instruction.

use core::fmt;

use crate::{op::Op, State};

/// What the loop fetched: where, the raw bytes, and how it decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fetched {
    pub pc: u16,
    pub op: Op,
    /// Mnemonic from the dispatch table, which may name an override.
    pub name: &'static str,
    pub bytes: [u8; 3],
    pub len: u8,
}

impl Fetched {
    pub fn raw(&self) -> &[u8] {
        &self.bytes[..self.len.clamp(1, 3) as usize]
    }
}

impl fmt::Display for Fetched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}  ", self.pc)?;
        for slot in 0..3 {
            match self.raw().get(slot) {
                Some(byte) => write!(f, "{byte:02x} ")?,
                None => f.write_str("   ")?,
            }
        }
        if self.name == self.op.mnemonic() {
            write!(f, " {}", self.op)
        } else {
            write!(f, " {}", self.name)
        }
    }
}

/// Called before and after every instruction. Implementations only observe.
pub trait Trace {
    fn before(&mut self, fetched: &Fetched, chip: &State) {
        let _ = (fetched, chip);
    }

    fn after(&mut self, fetched: &Fetched, chip: &State, cycles: u8) {
        let _ = (fetched, chip, cycles);
    }
}

/// Observes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Trace for Silent {}

/// Writes a disassembly line and the post-instruction register snapshot to `tracing`
/// at TRACE level under the `i8080::trace` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct Tracer;

impl Trace for Tracer {
    fn after(&mut self, fetched: &Fetched, chip: &State, cycles: u8) {
        tracing::trace!(target: "i8080::trace", "{:<32}{chip}  +{cycles}", fetched.to_string());
    }
}
