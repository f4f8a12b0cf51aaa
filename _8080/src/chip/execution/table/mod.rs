//! The 256-entry dispatch table and the override builder hosts use to customize it.

use core::fmt;
use thiserror::Error;

use crate::{chip::State, Harness, Stop};
use super::opcode::Op;

/// An instruction effect: mutate the chip and host for the decoded `Op`, returning extra cycles.
pub type Effect<H> = fn(&mut State, &mut H, Op) -> Result<u8, Stop>;

/// One descriptor per opcode: its length, base cost, mnemonic and effect.
pub struct Instruction<H> {
    pub opcode: u8,
    pub name: &'static str,
    pub bytes: u8,
    pub cycles: u8,
    pub effect: Effect<H>,
}

impl<H> Clone for Instruction<H> {
    fn clone(&self) -> Self { *self }
}

impl<H> Copy for Instruction<H> {}

impl<H> fmt::Debug for Instruction<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instruction")
            .field("opcode", &format_args!("{:#04X}", self.opcode))
            .field("name", &self.name)
            .field("bytes", &self.bytes)
            .field("cycles", &self.cycles)
            .finish_non_exhaustive()
    }
}

fn native<H: Harness>(chip: &mut State, bus: &mut H, op: Op) -> Result<u8, Stop> {
    op.execute_on(chip, bus)
}

impl<H: Harness> Instruction<H> {
    /// The documented 8080 descriptor for `opcode`; undefined opcodes fault when executed.
    pub fn canonical(opcode: u8) -> Self {
        let op = Op::decode(opcode, [0, 0]);
        Self { opcode, name: op.mnemonic(), bytes: op.len(), cycles: op.cycles(), effect: native::<H> }
    }

    /// The canonical descriptor for `opcode` with its effect swapped for `effect`.
    pub fn replacing(opcode: u8, effect: Effect<H>) -> Self {
        Self { effect, ..Self::canonical(opcode) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("opcode {0:#04X} is overridden more than once")]
    Duplicate(u8),
    #[error("override for {opcode:#04X} claims a length of {bytes} bytes")]
    Length { opcode: u8, bytes: u8 },
}

/// A sparse, ordered set of replacement descriptors.
pub struct Overrides<H> {
    entries: Vec<Instruction<H>>,
}

impl<H> Default for Overrides<H> {
    fn default() -> Self { Self { entries: Vec::new() } }
}

impl<H> Overrides<H> {
    pub fn new() -> Self { Self::default() }

    pub fn with(mut self, instruction: Instruction<H>) -> Self {
        self.entries.push(instruction);
        self
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction<H>> {
        self.entries.iter()
    }

    fn validate(&self) -> Result<(), Error> {
        for (index, entry) in self.entries.iter().enumerate() {
            if !(1..=3).contains(&entry.bytes) {
                return Err(Error::Length { opcode: entry.opcode, bytes: entry.bytes });
            }
            if self.entries[..index].iter().any(|earlier| earlier.opcode == entry.opcode) {
                return Err(Error::Duplicate(entry.opcode));
            }
        }
        Ok(())
    }
}

/// A total map from opcode byte to [`Instruction`]. Entry `n` always describes opcode `n`.
pub struct Table<H> {
    entries: Box<[Instruction<H>; 256]>,
}

impl<H> Clone for Table<H> {
    fn clone(&self) -> Self { Self { entries: self.entries.clone() } }
}

impl<H: Harness> Default for Table<H> {
    fn default() -> Self { Self::canonical() }
}

impl<H: Harness> Table<H> {
    pub fn canonical() -> Self {
        Self { entries: Box::new(core::array::from_fn(|opcode| Instruction::canonical(opcode as u8))) }
    }

    /// Replaces the entry sharing each override's opcode. Entries without an override keep their place.
    pub fn compose(mut self, overrides: Overrides<H>) -> Result<Self, Error> {
        overrides.validate()?;
        for instruction in overrides.entries {
            self.entries[instruction.opcode as usize] = instruction;
        }
        Ok(self)
    }
}

impl<H> Table<H> {
    pub fn get(&self, opcode: u8) -> &Instruction<H> {
        &self.entries[opcode as usize]
    }

    /// Descriptors in opcode order.
    pub fn iter(&self) -> impl Iterator<Item = &Instruction<H>> {
        self.entries.iter()
    }
}
