use crate::{Fault, Harness, Machine, Status, Stop, trace::{Fetched, Silent, Trace}};
use super::{alu, State};
use super::access::{Byte, Register::*, Byte::*, Word::*};

pub mod opcode;
pub mod table;
use opcode::{Op, Op::*};

/// Cycles added by a conditional CALL or RET whose condition holds.
const TAKEN: u8 = 6;

impl<H: Harness> Machine<H> {
    /// The `step` method is the heart and soul of emulation; it retrieves, decodes, and executes
    /// one operation from the Harness address space through the machine's dispatch table, and
    /// updates the CPU's internal state accordingly.
    ///
    /// It returns the cycles the instruction consumed. The first failure, whether a HLT, a host
    /// fault or a host-requested halt, moves the machine to [`Status::Halted`], and every later
    /// call returns that same reason without touching the state.
    pub fn step(&mut self) -> Result<u8, Stop> {
        self.step_traced(&mut Silent)
    }

    /// Like [`step`](Self::step), reporting the instruction to `trace` before and after it runs.
    pub fn step_traced<T: Trace + ?Sized>(&mut self, trace: &mut T) -> Result<u8, Stop> {
        if let Status::Halted(stop) = &self.status {
            return Err(stop.clone());
        }
        let outcome = self.fetch_and_execute(trace);
        if let Err(stop) = &outcome {
            self.status = Status::Halted(stop.clone());
        }
        outcome
    }

    fn fetch_and_execute<T: Trace + ?Sized>(&mut self, trace: &mut T) -> Result<u8, Stop> {
        let pc = self.chip.pc;
        let opcode = self.board.read(pc);
        let instruction = *self.table.get(opcode);
        let mut bytes = [opcode, 0, 0];
        for offset in 1..instruction.bytes.min(3) {
            bytes[offset as usize] = self.board.read(pc.wrapping_add(offset as u16));
        }
        let op = Op::decode(opcode, [bytes[1], bytes[2]]);
        let fetched = Fetched { pc, op, name: instruction.name, bytes, len: instruction.bytes };
        trace.before(&fetched, &self.chip);

        self.chip.pc = pc.wrapping_add(instruction.bytes as u16);
        let extra = (instruction.effect)(&mut self.chip, &mut self.board, op)?;
        let cycles = instruction.cycles.saturating_add(extra);
        self.chip.add_cycles(cycles);
        self.board.did_execute(&self.chip)?;

        trace.after(&fetched, &self.chip, cycles);
        Ok(cycles)
    }

    /// Steps until the machine stops, and returns why.
    pub fn run(&mut self) -> Stop {
        loop {
            if let Err(stop) = self.step() {
                return stop;
            }
        }
    }

    /// This method presents an interrupt request for one of the eight restart addresses
    /// (`0x00`, `0x08`, … `0x38`). If the core's interrupts flag is reset, no action will be
    /// taken and the method will return `Ok(false)`. If the flag is set, it will reset the
    /// interrupts flag (disabling interrupts until further notice; interrupt vectors should
    /// be written to set the flag before returning), push the program counter and jump to the
    /// vector, charging the cycles of an RST, then return `Ok(true)`.
    pub fn interrupt(&mut self, address: u8) -> Result<bool, Stop> {
        match Op::restart_to(address) {
            Some(op) => self.inject(op),
            None => Err(Fault::InvalidVector(address).into()),
        }
    }

    /// This method is a convenience shorthand for `interrupt` that takes the restart number
    /// (0 to 7) rather than its address.
    pub fn reset_to(&mut self, index: usize) -> Result<bool, Stop> {
        match index {
            0..=7 => self.inject(Reset { vector: index as u8 }),
            _ => Err(Fault::InvalidVector(u8::try_from(index).unwrap_or(u8::MAX)).into()),
        }
    }

    fn inject(&mut self, op: Op) -> Result<bool, Stop> {
        if let Status::Halted(stop) = &self.status {
            return Err(stop.clone());
        }
        if !self.chip.interrupts {
            return Ok(false);
        }
        self.chip.interrupts = false;
        match op.execute_on(&mut self.chip, &mut self.board) {
            Ok(extra) => {
                self.chip.add_cycles(op.cycles() + extra);
                Ok(true)
            }
            Err(stop) => {
                self.status = Status::Halted(stop.clone());
                Err(stop)
            }
        }
    }
}

impl<H: Harness> Iterator for Machine<H> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        self.step().ok()
    }
}

impl State {
    fn load<H: Harness + ?Sized>(&self, bus: &H, from: Byte) -> u8 {
        match from {
            Single(register) => self[register],
            Indirect => bus.read(self.hl()),
        }
    }

    fn store<H: Harness + ?Sized>(&mut self, bus: &mut H, to: Byte, value: u8) -> Result<(), Fault> {
        match to {
            Single(register) => self[register] = value,
            Indirect => bus.write(self.hl(), value)?,
        }
        Ok(())
    }

    fn accumulate(&mut self, (value, flags): (u8, alu::Flags)) {
        self[A] = value;
        self.set_flags(flags);
    }
}

impl Op {
    /// Applies the documented 8080 effect of this instruction. The program counter must already
    /// point past the instruction.
    ///
    /// Returns the cycles spent beyond the instruction's base cost, which is nonzero only for a
    /// conditional CALL or RET that is taken.
    pub fn execute_on<H: Harness + ?Sized>(self, chip: &mut State, bus: &mut H) -> Result<u8, Stop> {
        match self {
            NOP => (),
            Add { from, carry } => {
                let value = chip.load(bus, from);
                chip.accumulate(alu::add(chip[A], value, carry && chip.c));
            }
            AddTo { value, carry } => chip.accumulate(alu::add(chip[A], value, carry && chip.c)),
            And { from } => {
                let value = chip.load(bus, from);
                AndWith { value }.execute_on(chip, bus)?;
            }
            AndWith { value } => {
                chip[A] &= value;
                chip.set_flags(alu::Flags::logical(chip[A]));
            }
            Call { sub } => {
                chip.push_word(bus, chip.pc)?;
                chip.pc = sub;
            }
            CallIf(test, sub) => if test.approves(chip) {
                Call { sub }.execute_on(chip, bus)?;
                return Ok(TAKEN);
            }
            CarryFlag(set) => chip.c = set || !chip.c,
            Compare { from } => {
                let value = chip.load(bus, from);
                CompareWith { value }.execute_on(chip, bus)?;
            }
            CompareWith { value } => chip.set_flags(alu::subtract(chip[A], value, false).1),
            ComplementAccumulator => chip[A] = !chip[A],
            DecimalAddAdjust => chip.accumulate(alu::decimal_adjust(chip[A], chip.c, chip.a)),
            DecrementByte { register } => {
                let (value, flags) = alu::decrement(chip.load(bus, register));
                chip.store(bus, register, value)?;
                chip.set_flags_keeping_carry(flags);
            }
            DecrementWord { register } => chip.set_word(register, chip.word(register).wrapping_sub(1)),
            DoubleAdd { register } => {
                let (value, carry) = chip.hl().overflowing_add(chip.word(register));
                chip.set_hl(value);
                chip.c = carry;
            }
            ExchangeDoubleWithHilo => {
                let (de, hl) = (chip.de(), chip.hl());
                chip.set_de(hl);
                chip.set_hl(de);
            }
            ExchangeTopWithHilo => {
                let top = bus.read_word(chip.sp);
                bus.write_word(chip.sp, chip.hl())?;
                chip.set_hl(top);
            }
            ExclusiveOr { from } => {
                let value = chip.load(bus, from);
                ExclusiveOrWith { value }.execute_on(chip, bus)?;
            }
            ExclusiveOrWith { value } => {
                chip[A] ^= value;
                chip.set_flags(alu::Flags::logical(chip[A]));
            }
            Halt => return Err(crate::Halt::Instruction.into()),
            Illegal(opcode) => return Err(Fault::IllegalOpcode { opcode, pc: chip.pc.wrapping_sub(1) }.into()),
            In(port) => chip[A] = bus.input(port)?,
            IncrementByte { register } => {
                let (value, flags) = alu::increment(chip.load(bus, register));
                chip.store(bus, register, value)?;
                chip.set_flags_keeping_carry(flags);
            }
            IncrementWord { register } => chip.set_word(register, chip.word(register).wrapping_add(1)),
            Interrupts(active) => chip.interrupts = active,
            Jump { to } => chip.pc = to,
            JumpIf(test, to) => if test.approves(chip) { chip.pc = to },
            LoadAccumulator { address } => chip[A] = bus.read(address),
            LoadAccumulatorIndirect { register } => chip[A] = bus.read(chip.pair(register)),
            LoadExtendedWith { to, value } => chip.set_word(to, value),
            LoadHilo { address } => chip.set_hl(bus.read_word(address)),
            Move { to, from } => {
                let value = chip.load(bus, from);
                chip.store(bus, to, value)?;
            }
            MoveData { value, to } => chip.store(bus, to, value)?,
            Or { from } => {
                let value = chip.load(bus, from);
                OrWith { value }.execute_on(chip, bus)?;
            }
            OrWith { value } => {
                chip[A] |= value;
                chip.set_flags(alu::Flags::logical(chip[A]));
            }
            Out(port) => bus.output(port, chip[A])?,
            Pop(target) => {
                let value = chip.pop_word(bus);
                match target {
                    OnBoard(internal) => chip.set_word(internal, value),
                    ProgramStatus => chip.set_status(value),
                }
            }
            ProgramCounterFromHilo => chip.pc = chip.hl(),
            Push(source) => {
                let value = match source {
                    OnBoard(internal) => chip.word(internal),
                    ProgramStatus => chip.status(),
                };
                chip.push_word(bus, value)?;
            }
            Reset { vector } => {
                chip.push_word(bus, chip.pc)?;
                chip.pc = vector as u16 * 8;
            }
            Return => chip.pc = chip.pop_word(bus),
            ReturnIf(test) => if test.approves(chip) {
                chip.pc = chip.pop_word(bus);
                return Ok(TAKEN);
            }
            RotateAccumulatorLeft => {
                let bits = chip[A] as u16 | if chip.c { 0x8000 } else { 0x0000 };
                let [bits, carry] = bits.rotate_left(1).to_le_bytes();
                chip.c = carry != 0;
                chip[A] = bits;
            }
            RotateAccumulatorRight => {
                let bits = chip[A] as u16 | if chip.c { 0x0100 } else { 0x0000 };
                let [bits, carry] = bits.rotate_right(1).to_le_bytes();
                chip.c = carry != 0;
                chip[A] = bits;
            }
            RotateLeftCarrying => {
                let accumulator = chip[A];
                chip.c = accumulator & 0x80 != 0;
                chip[A] = accumulator.rotate_left(1);
            }
            RotateRightCarrying => {
                let accumulator = chip[A];
                chip.c = accumulator & 0x01 != 0;
                chip[A] = accumulator.rotate_right(1);
            }
            StackPointerFromHilo => chip.sp = chip.hl(),
            StoreAccumulator { address } => bus.write(address, chip[A])?,
            StoreAccumulatorIndirect { register } => bus.write(chip.pair(register), chip[A])?,
            StoreHilo { address } => bus.write_word(address, chip.hl())?,
            Subtract { from, carry } => {
                let value = chip.load(bus, from);
                chip.accumulate(alu::subtract(chip[A], value, carry && chip.c));
            }
            SubtractBy { value, carry } => chip.accumulate(alu::subtract(chip[A], value, carry && chip.c)),
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests;
