//! A cycle-counting Intel 8080 interpreter driven through a pluggable host [`Harness`].

#[macro_use]
extern crate disclose;

use core::ops::{Deref, DerefMut};

mod board;
mod chip;
mod error;
pub mod hosts;
pub mod scheduler;
pub mod trace;

pub use board::SimpleBoard;
pub use chip::State;
pub use chip::table::{self, Effect, Instruction, Overrides, Table};
pub use error::{Fault, Halt, Stop};

pub mod support {
    pub use crate::chip::access::*;
    pub use crate::chip::alu::{self, Flags};
}

pub mod op {
    pub use crate::chip::opcode::{Op::{self, *}, Flag::{self, *}, Test::{self, *}};
}

/// The host side of an emulated machine: memory with its access policy, and the I/O ports.
///
/// The core calls nothing else. Every method must return promptly.
pub trait Harness {
    fn read(&self, from: u16) -> u8;
    /// Little-endian, low byte at `from`.
    fn read_word(&self, from: u16) -> u16 {
        u16::from_le_bytes([self.read(from), self.read(from.wrapping_add(1))])
    }
    fn write(&mut self, to: u16, value: u8) -> Result<(), Fault>;
    fn write_word(&mut self, to: u16, value: u16) -> Result<(), Fault> {
        let [low, high] = value.to_le_bytes();
        self.write(to, low)?;
        self.write(to.wrapping_add(1), high)
    }
    fn input(&mut self, port: u8) -> Result<u8, Fault>;
    fn output(&mut self, port: u8, value: u8) -> Result<(), Fault>;

    /// Replacement descriptors composed over the canonical table when a [`Machine`] is built.
    fn overrides() -> Overrides<Self> where Self: Sized {
        Overrides::new()
    }

    /// Called after every instruction with the updated chip. An `Err` stops the machine.
    fn did_execute(&mut self, chip: &State) -> Result<(), Stop> {
        let _ = chip;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Running,
    Halted(Stop),
}

/// A chip, the host it drives, and the dispatch table composed for that host.
pub struct Machine<H: Harness> {
    board: H,
    chip: State,
    table: Table<H>,
    status: Status,
}

impl<H: Harness> Machine<H> {
    /// Builds a machine whose table is the canonical set with `H::overrides()` applied.
    pub fn new(board: H) -> Result<Self, table::Error> {
        let table = Table::canonical().compose(H::overrides())?;
        Ok(Self::with_table(board, table))
    }

    pub fn with_table(board: H, table: Table<H>) -> Self {
        Self { board, chip: State::new(), table, status: Status::Running }
    }

    pub fn status(&self) -> &Status { &self.status }
    pub fn is_running(&self) -> bool { self.status == Status::Running }
    pub fn chip(&self) -> &State { &self.chip }
    pub fn chip_mut(&mut self) -> &mut State { &mut self.chip }
    pub fn table(&self) -> &Table<H> { &self.table }
    pub fn interrupts_enabled(&self) -> bool { self.chip.interrupts_enabled() }
    pub fn into_board(self) -> H { self.board }
}

impl<H: Harness> Deref for Machine<H> {
    type Target = H;
    fn deref(&self) -> &Self::Target { &self.board }
}

impl<H: Harness> DerefMut for Machine<H> {
    fn deref_mut(&mut self) -> &mut Self::Target { &mut self.board }
}

impl<H: Harness> AsRef<State> for Machine<H> {
    fn as_ref(&self) -> &State { &self.chip }
}

impl<H: Harness> AsMut<State> for Machine<H> {
    fn as_mut(&mut self) -> &mut State { &mut self.chip }
}
