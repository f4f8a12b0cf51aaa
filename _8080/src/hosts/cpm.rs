//! Just enough CP/M to run the classic 8080 exerciser and diagnostic programs.
//!
//! Programs load at 0x0100 and talk to the console through `CALL 5` with the BDOS function in C.
//! Only functions 2 (print the character in E) and 9 (print the `$`-terminated string at DE) exist.
//! Jumping to 0 is the warm boot that ends a CP/M program.

use core::ops::{Deref, DerefMut};

use tracing::{debug, info};

use super::{copy_image, LoadError};
use crate::{chip::access::Register, op::Op, table, Fault, Halt, Harness, Instruction, Machine, Overrides, State, Stop};

pub const BDOS: u16 = 0x0005;
pub const ORIGIN: u16 = 0x0100;
const CALL: u8 = 0xCD;
const RETURN: u8 = 0xC9;
const PRINT_CHAR: u8 = 2;
const PRINT_STRING: u8 = 9;

/// The line `cpudiag` prints when every check passed.
pub const OPERATIONAL: &str = " CPU IS OPERATIONAL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Where the image is loaded and execution starts.
    pub origin: u16,
    /// Bytes skipped at DE before a function 9 string. The halting `cpudiag` convention uses 3.
    pub skip: u16,
}

impl Default for Options {
    fn default() -> Self {
        Self { origin: ORIGIN, skip: 0 }
    }
}

pub struct Console {
    memory: Vec<u8>,
    options: Options,
    output: String,
}

impl Console {
    pub fn new(image: &[u8]) -> Result<Self, LoadError> {
        Self::with_options(image, Options::default())
    }

    pub fn with_options(image: &[u8], options: Options) -> Result<Self, LoadError> {
        let mut memory = vec![0; 0x10000];
        let capacity = memory.len() - options.origin as usize;
        copy_image(&mut memory, options.origin, capacity, image)?;
        memory[BDOS as usize] = RETURN;
        Ok(Self { memory, options, output: String::new() })
    }

    /// A machine ready to run the loaded program.
    pub fn boot(self) -> Result<Machine<Self>, table::Error> {
        let origin = self.options.origin;
        let mut machine = Machine::new(self)?;
        machine.chip_mut().set_pc(origin);
        Ok(machine)
    }

    /// Everything the program has printed.
    pub fn printed(&self) -> &str {
        &self.output
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    fn string_at(&self, address: u16) -> String {
        let start = address.wrapping_add(self.options.skip) as usize;
        self.memory[start..]
            .iter()
            .take_while(|&&byte| byte != b'$')
            .map(|&byte| byte as char)
            .collect()
    }

    fn bdos(&mut self, chip: &State) {
        match chip[Register::C] {
            PRINT_STRING => {
                let line = self.string_at(chip.de());
                info!(target: "i8080::console", "{line}");
                self.output.push_str(&line);
                self.output.push('\n');
            }
            PRINT_CHAR => {
                let character = chip[Register::E] as char;
                debug!(target: "i8080::console", "{character:?}");
                self.output.push(character);
            }
            function => debug!(function, "unsupported BDOS function ignored"),
        }
    }
}

fn call_console(chip: &mut State, bus: &mut Console, op: Op) -> Result<u8, Stop> {
    match op {
        Op::Call { sub: BDOS } => {
            bus.bdos(chip);
            Ok(0)
        }
        other => other.execute_on(chip, bus),
    }
}

impl Harness for Console {
    fn read(&self, from: u16) -> u8 {
        self.memory[from as usize]
    }

    fn write(&mut self, to: u16, value: u8) -> Result<(), Fault> {
        self.memory[to as usize] = value;
        Ok(())
    }

    fn input(&mut self, port: u8) -> Result<u8, Fault> {
        Err(Fault::UnknownInputPort(port))
    }

    fn output(&mut self, port: u8, _value: u8) -> Result<(), Fault> {
        Err(Fault::UnknownOutputPort(port))
    }

    fn overrides() -> Overrides<Self> {
        Overrides::new().with(Instruction::replacing(CALL, call_console))
    }

    fn did_execute(&mut self, chip: &State) -> Result<(), Stop> {
        match chip.pc() {
            0 => Err(Halt::WarmBoot.into()),
            _ => Ok(()),
        }
    }
}

/// The console variant for diagnostics that report through a single function 9 call.
///
/// That call ends the run: [`Halt::Passed`] for [`OPERATIONAL`], [`Halt::Failed`] for anything
/// else. `CALL 0` ends it with [`Halt::WarmBoot`].
pub struct Diagnostic {
    console: Console,
}

impl Diagnostic {
    pub fn new(image: &[u8]) -> Result<Self, LoadError> {
        Ok(Self { console: Console::with_options(image, Options { skip: 3, ..Options::default() })? })
    }

    pub fn boot(self) -> Result<Machine<Self>, table::Error> {
        let origin = self.console.options.origin;
        let mut machine = Machine::new(self)?;
        machine.chip_mut().set_pc(origin);
        Ok(machine)
    }
}

impl Deref for Diagnostic {
    type Target = Console;
    fn deref(&self) -> &Console { &self.console }
}

impl DerefMut for Diagnostic {
    fn deref_mut(&mut self) -> &mut Console { &mut self.console }
}

fn call_diagnostic(chip: &mut State, bus: &mut Diagnostic, op: Op) -> Result<u8, Stop> {
    match op {
        Op::Call { sub: BDOS } if chip[Register::C] == PRINT_STRING => {
            let line = bus.string_at(chip.de());
            bus.output.push_str(&line);
            if line == OPERATIONAL {
                Err(Halt::Passed(line).into())
            } else {
                Err(Halt::Failed(line).into())
            }
        }
        Op::Call { sub: BDOS } => {
            bus.bdos(chip);
            Ok(0)
        }
        Op::Call { sub: 0 } => Err(Halt::WarmBoot.into()),
        other => other.execute_on(chip, bus),
    }
}

impl Harness for Diagnostic {
    fn read(&self, from: u16) -> u8 { self.console.read(from) }
    fn write(&mut self, to: u16, value: u8) -> Result<(), Fault> { self.console.write(to, value) }
    fn input(&mut self, port: u8) -> Result<u8, Fault> { self.console.input(port) }
    fn output(&mut self, port: u8, value: u8) -> Result<(), Fault> { self.console.output(port, value) }

    fn overrides() -> Overrides<Self> {
        Overrides::new().with(Instruction::replacing(CALL, call_diagnostic))
    }

    fn did_execute(&mut self, chip: &State) -> Result<(), Stop> {
        self.console.did_execute(chip)
    }
}
