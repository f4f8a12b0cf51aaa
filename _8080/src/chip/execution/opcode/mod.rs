use core::fmt;

use crate::chip::access::{*, Byte::*, Register::*, Double::*, Internal::*, Word::*};

/// One decoded 8080 instruction, operands included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    NOP,
    Add{from: Byte, carry: bool},
    AddTo{value: u8, carry: bool},
    And{from: Byte},
    AndWith{value: u8},
    Call{sub: u16},
    CallIf(Test, u16),
    CarryFlag(bool),
    Compare{from: Byte},
    CompareWith{value: u8},
    ComplementAccumulator,
    DecimalAddAdjust,
    DecrementByte{register: Byte},
    DecrementWord{register: Internal},
    Interrupts(bool),
    DoubleAdd{register: Internal},
    ExchangeDoubleWithHilo,
    ExchangeTopWithHilo,
    ExclusiveOr{from: Byte},
    ExclusiveOrWith{value: u8},
    Halt,
    Illegal(u8),
    In(u8),
    IncrementByte{register: Byte},
    IncrementWord{register: Internal},
    Jump{to: u16},
    JumpIf(Test, u16),
    LoadAccumulator{address: u16},
    LoadAccumulatorIndirect{register: Double},
    LoadExtendedWith{to: Internal, value: u16},
    LoadHilo{address: u16},
    Move{to: Byte, from: Byte},
    MoveData{value: u8, to: Byte},
    Or{from: Byte},
    OrWith{value: u8},
    Out(u8),
    Pop(Word),
    ProgramCounterFromHilo,
    Push(Word),
    Reset{vector: u8},
    Return,
    ReturnIf(Test),
    RotateLeftCarrying,
    RotateRightCarrying,
    RotateAccumulatorLeft,
    RotateAccumulatorRight,
    StackPointerFromHilo,
    StoreAccumulator{address: u16},
    StoreAccumulatorIndirect{register: Double},
    StoreHilo{address: u16},
    Subtract{from: Byte, carry: bool},
    SubtractBy{value: u8, carry: bool},
}
use Op::*;

impl From<u8> for Internal {
    fn from(value: u8) -> Self {
        match value & 0b00_11_0000 {
            0b00_00_0000 => Wide(BC),
            0b00_01_0000 => Wide(DE),
            0b00_10_0000 => Wide(HL),
            _ => StackPointer,
        }
    }
}

impl From<u8> for Byte {
    fn from(value: u8) -> Self {
        match value & 0b00_111_000 {
            0b00_000_000 => Single(B),
            0b00_001_000 => Single(C),
            0b00_010_000 => Single(D),
            0b00_011_000 => Single(E),
            0b00_100_000 => Single(H),
            0b00_101_000 => Single(L),
            0b00_110_000 => Byte::Indirect,
            _ => Single(A),
        }
    }
}

impl Byte {
    fn split(value: u8) -> (Self, Self) {
        (Self::from(value), Self::from(value << 3))
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Zero,
    Carry,
    EvenParity,
    Negative,
}

/// A branch condition: exactly one flag, tested set or clear.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Test {
    Not(Flag),
    Is(Flag),
}

use Flag::*;
use Test::*;

impl Test {
    pub fn approves(self, env: &crate::chip::State) -> bool {
        match self {
            Not(Zero) => !env.z,
            Is(Zero) => env.z,
            Not(Carry) => !env.c,
            Is(Carry) => env.c,
            Not(EvenParity) => !env.p,
            Is(EvenParity) => env.p,
            Not(Negative) => !env.m,
            Is(Negative) => env.m,
        }
    }

    /// The three-bit condition field as the 8080 encodes it: `nz z nc c po pe p m`.
    pub fn code(self) -> usize {
        match self {
            Not(flag) => 2 * flag as usize,
            Is(flag) => 2 * flag as usize + 1,
        }
    }
}

impl From<u8> for Test {
    fn from(value: u8) -> Self {
        let test = match (value & 0b00_11_0_000) >> 4 {
            0b00 => Zero,
            0b01 => Carry,
            0b10 => EvenParity,
            _ => Negative,
        };
        match value & 0b00_00_1_000 {
            0 => Not(test),
            _ => Is(test),
        }
    }
}

#[disclose]
#[allow(non_upper_case_globals)]
mod b11111111 {
    const NoOp: u8 = 0b00000000;
    const RotateLeftCarrying: u8        = 0b00000111;
    const RotateRightCarrying: u8       = 0b00001111;
    const RotateAccumulatorLeft: u8     = 0b00010111;
    const RotateAccumulatorRight: u8    = 0b00011111;

    const StoreAccumulatorDirect: u8    = 0b00110010;
    const LoadAccumulatorDirect: u8 = 0b00111010;

    const StoreHiloDirect: u8   = 0b00100010;
    const LoadHiloDirect: u8    = 0b00101010;

    const DecimalAddAdjust: u8      = 0b00100111;
    const ComplementAccumulator: u8 = 0b00101111;

    const SetCarry: u8          = 0b00110111;
    const ComplementCarry: u8   = 0b00111111;

    const Halt: u8      = 0b01110110;
    const Return: u8    = 0b11001001;

    const Output: u8    = 0b11010011;
    const Input: u8     = 0b11011011;

    const ExchangeTopWithHilo: u8       = 0b11100011;
    const ProgramCounterFromHilo: u8    = 0b11101001;
    const ExchangeDoubleWithHilo: u8    = 0b11101011;
    const StackPointerFromHilo: u8      = 0b11111001;

    const DisableInterrupts: u8 = 0b11110011;
    const EnableInterrupts: u8  = 0b11111011;

    const AndImmediate: u8  = 0b11100110;
    const AddImmediate: u8  = 0b11000110;
    const AddImmediateCarrying: u8  = 0b11001110;
    const SubtractImmediate: u8     = 0b11010110;
    const SubtractImmediateBorrowing: u8    = 0b11011110;
    const ExclusiveOrImmediate: u8  = 0b11101110;
    const OrImmediate: u8   = 0b11110110;
    const CompareImmediate: u8   = 0b11111110;

    const Jump: u8  = 0b11000011;
    const Call: u8  = 0b11001101;
}

/// Byte values the 8080 leaves undefined. Later parts reuse them as prefixes; here they fault.
#[disclose]
#[allow(non_upper_case_globals)]
mod undefined {
    const Rows: u8 = 0b00_000_000;
    const Mask: u8 = 0b11_000_111;
    const AltJump: u8 = 0xCB;
    const AltReturn: u8 = 0xD9;
    const AltCallDE: u8 = 0xDD;
    const AltCallED: u8 = 0xED;
    const AltCallFD: u8 = 0xFD;
}

#[disclose]
#[allow(non_upper_case_globals)]
mod b11_00_1111 {
    const LoadExtendedImmediate: u8 = 0b00_00_0001;
    const IncrementExtended: u8 = 0b00_00_0011;
    const DecrementExtended: u8 = 0b00_00_1011;
    const DoubleAdd: u8 = 0b00_00_1001;
    const Push: u8  = 0b11_00_0101;
    const Pop: u8 = 0b11_00_0001;
}

#[disclose]
#[allow(non_upper_case_globals)]
mod b11_000_111 {
    const IncrementRegister: u8 = 0b00_000_100;
    const DecrementRegister: u8 = 0b00_000_101;
    const MoveImmediate: u8 = 0b00_000_110;
    const JumpIf: u8 = 0b11_000_010;
    const Reset: u8 = 0b11_000_111;
    const ReturnIf: u8 = 0b11_000_000;
    const CallIf: u8 = 0b11_000_100;
}

#[disclose]
#[allow(non_upper_case_globals)]
mod b11_111_000 {
    const AddToAccumulator: u8  = 0b10_000_000;
    const AddCarryingToAccumulator : u8 = 0b10_001_000;
    const SubtractFromAccumulator: u8   = 0b10_010_000;
    const SubtractBorrowingFromAccumulator: u8  = 0b10_011_000;
    const AndWithAccumulator: u8    = 0b10_100_000;
    const ExclusiveOrWithAccumulator: u8    = 0b10_101_000;
    const OrWithAccumulator: u8 = 0b10_110_000;
    const CompareWithAccumulator: u8    = 0b10_111_000;
}

#[disclose]
#[allow(non_upper_case_globals)]
mod b11_000000 {
    const Move: u8  = 0b01_000000;
}

#[disclose]
#[allow(non_upper_case_globals)]
mod b111_0_1111 {
    const LoadAccumulatorIndirect: u8   = 0b000_0_1010;
    const StoreAccumulatorIndirect: u8  = 0b000_0_0010;
}

fn one_byte(value: u8) -> Option<Op> {
    let op = match value {
        b11111111::NoOp => NOP,
        b11111111::ExchangeDoubleWithHilo => ExchangeDoubleWithHilo,
        b11111111::Halt => Halt,
        b11111111::Return => Return,
        b11111111::ExchangeTopWithHilo => ExchangeTopWithHilo,
        b11111111::RotateLeftCarrying => RotateLeftCarrying,
        b11111111::RotateRightCarrying => RotateRightCarrying,
        b11111111::RotateAccumulatorLeft => RotateAccumulatorLeft,
        b11111111::RotateAccumulatorRight => RotateAccumulatorRight,
        b11111111::SetCarry => CarryFlag(true),
        b11111111::ComplementCarry => CarryFlag(false),
        b11111111::DecimalAddAdjust => DecimalAddAdjust,
        b11111111::ComplementAccumulator => ComplementAccumulator,
        b11111111::ProgramCounterFromHilo => ProgramCounterFromHilo,
        b11111111::StackPointerFromHilo => StackPointerFromHilo,
        b11111111::DisableInterrupts => Interrupts(false),
        b11111111::EnableInterrupts => Interrupts(true),
        undefined::AltJump | undefined::AltReturn
            | undefined::AltCallDE | undefined::AltCallED | undefined::AltCallFD => Illegal(value),
        _ if value & undefined::Mask == undefined::Rows => Illegal(value),
        _ => return None,
    };
    Some(op)
}

fn patterned(value: u8) -> Option<Op> {
    match value & 0b11_000_111 {
        b11_000_111::Reset => return Some(Reset{vector: value >> 3 & 0x07}),
        b11_000_111::ReturnIf => return Some(ReturnIf(Test::from(value))),
        b11_000_111::IncrementRegister => return Some(IncrementByte { register: Byte::from(value) }),
        b11_000_111::DecrementRegister => return Some(DecrementByte { register: Byte::from(value) }),
        _ => (),
    };
    match value & 0b11_00_1111 {
        b11_00_1111::DecrementExtended => return Some(DecrementWord{register: Internal::from(value)}),
        b11_00_1111::IncrementExtended => return Some(IncrementWord { register: Internal::from(value) }),
        b11_00_1111::DoubleAdd => return Some(DoubleAdd{register: Internal::from(value)}),
        b11_00_1111::Push => return Some(Push(match Internal::from(value) { StackPointer => ProgramStatus, wide => OnBoard(wide)})),
        b11_00_1111::Pop => return Some(Pop(match Internal::from(value) { StackPointer => ProgramStatus, wide => OnBoard(wide)})),
        _ => (),
    };
    let from = Byte::from(value << 3);
    match value & 0b11_111_000 {
        b11_111_000::AddToAccumulator => return Some(Add{from, carry: false}),
        b11_111_000::AddCarryingToAccumulator => return Some(Add{from, carry: true}),
        b11_111_000::SubtractFromAccumulator => return Some(Subtract{from, carry: false}),
        b11_111_000::SubtractBorrowingFromAccumulator => return Some(Subtract{from, carry: true}),
        b11_111_000::AndWithAccumulator => return Some(And{from}),
        b11_111_000::ExclusiveOrWithAccumulator => return Some(ExclusiveOr{from}),
        b11_111_000::OrWithAccumulator => return Some(Or{from}),
        b11_111_000::CompareWithAccumulator => return Some(Compare{from}),
        _ => (),
    };
    if value & 0b11_000000 == b11_000000::Move {
        let (to, from) = Byte::split(value);
        return Some(Move{to, from});
    }
    match value & 0b111_0_1111 {
        b111_0_1111::LoadAccumulatorIndirect => Some(LoadAccumulatorIndirect {
            register: if value & 0b000_1_0000 != 0 { DE } else { BC }
        }),
        b111_0_1111::StoreAccumulatorIndirect => Some(StoreAccumulatorIndirect {
            register: if value & 0b000_1_0000 != 0 { DE } else { BC }
        }),
        _ => None,
    }
}

fn two_byte(action: u8, value: u8) -> Option<Op> {
    let op = match action {
        b11111111::AddImmediate => AddTo { value, carry: false },
        b11111111::AddImmediateCarrying => AddTo{ value, carry: true },
        b11111111::SubtractImmediate => SubtractBy{ value, carry: false },
        b11111111::SubtractImmediateBorrowing => SubtractBy { value, carry: true },
        b11111111::AndImmediate => AndWith { value },
        b11111111::ExclusiveOrImmediate => ExclusiveOrWith{value},
        b11111111::OrImmediate => OrWith{value},
        b11111111::CompareImmediate => CompareWith{ value },
        b11111111::Output => Out(value),
        b11111111::Input => In(value),
        _ if action & 0b11_000_111 == b11_000_111::MoveImmediate => MoveData{ value, to: Byte::from(action) },
        _ => return None,
    };
    Some(op)
}

fn three_byte(action: u8, data: u16) -> Option<Op> {
    let op = match action {
        b11111111::LoadHiloDirect => LoadHilo{address: data},
        b11111111::StoreHiloDirect => StoreHilo{address: data},
        b11111111::LoadAccumulatorDirect => LoadAccumulator { address: data },
        b11111111::StoreAccumulatorDirect => StoreAccumulator { address: data },
        b11111111::Jump => Jump{to: data},
        b11111111::Call => Call{sub: data},
        _ if action & 0b11_00_1111 == b11_00_1111::LoadExtendedImmediate =>
            LoadExtendedWith { to: Internal::from(action), value: data },
        _ if action & 0b11_000_111 == b11_000_111::JumpIf => JumpIf(Test::from(action), data),
        _ if action & 0b11_000_111 == b11_000_111::CallIf => CallIf(Test::from(action), data),
        _ => return None,
    };
    Some(op)
}

impl Op {
    /// Decodes `opcode` with up to two operand bytes. Every byte value yields an `Op`;
    /// the undefined ones become [`Op::Illegal`]. Operands an instruction does not use are ignored.
    pub fn decode(opcode: u8, [low, high]: [u8; 2]) -> Op {
        one_byte(opcode)
            .or_else(|| patterned(opcode))
            .or_else(|| two_byte(opcode, low))
            .or_else(|| three_byte(opcode, u16::from_le_bytes([low, high])))
            .unwrap_or(Illegal(opcode))
    }

    /// The single-byte RST for a restart address (`0x00`, `0x08`, … `0x38`).
    pub fn restart_to(address: u8) -> Option<Op> {
        (address & !0b00_111_000 == 0).then_some(Reset { vector: address >> 3 })
    }

    pub fn len(&self) -> u8 {
        match self {
            Call{..} | CallIf(..) | Jump{..} | JumpIf(..) | LoadExtendedWith{..} |
            StoreAccumulator{..} | LoadAccumulator {..} | LoadHilo{..} | StoreHilo {..}
                => 3,
            AddTo{..} | AndWith{..} | ExclusiveOrWith{..} | OrWith{..} | SubtractBy{..} | CompareWith{..} | MoveData{..} |
            Out(..) | In(..)
                => 2,
            NOP | Push(..) | Reset{..} | ExchangeDoubleWithHilo | Return | ReturnIf(..) | Halt | Illegal(..) | Pop(..) |
            ExchangeTopWithHilo | Move{..} | RotateLeftCarrying | RotateRightCarrying | RotateAccumulatorLeft |
            RotateAccumulatorRight | IncrementByte {..} | DecrementByte {..} | Add{..}  | Subtract{..} | And{..} |
            ExclusiveOr{..} | Or{..} | Compare{..} | IncrementWord{..} | DecrementWord {..} | Interrupts(..) |
            LoadAccumulatorIndirect {..} | StoreAccumulatorIndirect{..} |
            DoubleAdd{..} | CarryFlag(..) | DecimalAddAdjust | ComplementAccumulator | ProgramCounterFromHilo | StackPointerFromHilo
                => 1,
        }
    }

    /// Base cost in cycles. Taken conditional calls and returns add six more when they execute.
    pub fn cycles(&self) -> u8 {
        let memory = |byte: &Byte, register: u8, bus: u8| if byte.use_bus() { bus } else { register };
        match self {
            NOP | CarryFlag(..) | ComplementAccumulator | DecimalAddAdjust | Interrupts(..) |
            RotateLeftCarrying | RotateRightCarrying | RotateAccumulatorLeft | RotateAccumulatorRight => 4,
            Add{from, ..} | Subtract{from, ..} | And{from} | Or{from} | ExclusiveOr{from} | Compare{from} => memory(from, 4, 7),
            AddTo{..} | SubtractBy{..} | AndWith{..} | OrWith{..} | ExclusiveOrWith{..} | CompareWith{..} => 7,
            IncrementByte{register} | DecrementByte{register} => memory(register, 5, 10),
            MoveData{to, ..} => memory(to, 7, 10),
            Move{to, from} => if to.use_bus() || from.use_bus() { 7 } else { 5 },
            IncrementWord{..} | DecrementWord{..} | ExchangeDoubleWithHilo | ProgramCounterFromHilo | StackPointerFromHilo => 5,
            ReturnIf(..) => 5,
            LoadAccumulatorIndirect{..} | StoreAccumulatorIndirect{..} | Halt => 7,
            LoadExtendedWith{..} | DoubleAdd{..} | Jump{..} | JumpIf(..) | Pop(..) | Return | In(..) | Out(..) => 10,
            Push(..) | Reset{..} | CallIf(..) => 11,
            LoadAccumulator{..} | StoreAccumulator{..} => 13,
            LoadHilo{..} | StoreHilo{..} => 16,
            Call{..} => 17,
            ExchangeTopWithHilo => 18,
            Illegal(..) => 4,
        }
    }

    /// Assembler mnemonic without operands, e.g. `mov`, `jnz`, `rst`.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            NOP => "nop",
            Add{carry: false, ..} => "add",
            Add{carry: true, ..} => "adc",
            AddTo{carry: false, ..} => "adi",
            AddTo{carry: true, ..} => "aci",
            And{..} => "ana",
            AndWith{..} => "ani",
            Call{..} => "call",
            CallIf(test, _) => ["cnz", "cz", "cnc", "cc", "cpo", "cpe", "cp", "cm"][test.code()],
            CarryFlag(true) => "stc",
            CarryFlag(false) => "cmc",
            Compare{..} => "cmp",
            CompareWith{..} => "cpi",
            ComplementAccumulator => "cma",
            DecimalAddAdjust => "daa",
            DecrementByte{..} => "dcr",
            DecrementWord{..} => "dcx",
            Interrupts(true) => "ei",
            Interrupts(false) => "di",
            DoubleAdd{..} => "dad",
            ExchangeDoubleWithHilo => "xchg",
            ExchangeTopWithHilo => "xthl",
            ExclusiveOr{..} => "xra",
            ExclusiveOrWith{..} => "xri",
            Halt => "hlt",
            Illegal(..) => "illegal",
            In(..) => "in",
            IncrementByte{..} => "inr",
            IncrementWord{..} => "inx",
            Jump{..} => "jmp",
            JumpIf(test, _) => ["jnz", "jz", "jnc", "jc", "jpo", "jpe", "jp", "jm"][test.code()],
            LoadAccumulator{..} => "lda",
            LoadAccumulatorIndirect{..} => "ldax",
            LoadExtendedWith{..} => "lxi",
            LoadHilo{..} => "lhld",
            Move{..} => "mov",
            MoveData{..} => "mvi",
            Or{..} => "ora",
            OrWith{..} => "ori",
            Out(..) => "out",
            Pop(..) => "pop",
            ProgramCounterFromHilo => "pchl",
            Push(..) => "push",
            Reset{..} => "rst",
            Return => "ret",
            ReturnIf(test) => ["rnz", "rz", "rnc", "rc", "rpo", "rpe", "rp", "rm"][test.code()],
            RotateLeftCarrying => "rlc",
            RotateRightCarrying => "rrc",
            RotateAccumulatorLeft => "ral",
            RotateAccumulatorRight => "rar",
            StackPointerFromHilo => "sphl",
            StoreAccumulator{..} => "sta",
            StoreAccumulatorIndirect{..} => "stax",
            StoreHilo{..} => "shld",
            Subtract{carry: false, ..} => "sub",
            Subtract{carry: true, ..} => "sbb",
            SubtractBy{carry: false, ..} => "sui",
            SubtractBy{carry: true, ..} => "sbi",
        }
    }
}

struct Operand<T>(T);

impl fmt::Display for Operand<Byte> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Single(register) => write!(f, "{}", format!("{register:?}").to_lowercase()),
            Byte::Indirect => f.write_str("m"),
        }
    }
}

impl fmt::Display for Operand<Internal> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self.0 {
            Wide(BC) => "b",
            Wide(DE) => "d",
            Wide(HL) => "h",
            StackPointer => "sp",
        })
    }
}

impl fmt::Display for Operand<Word> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            OnBoard(register) => Operand(register).fmt(f),
            ProgramStatus => f.write_str("psw"),
        }
    }
}

/// Disassembly in the lower-case Intel style: `mvi b,0x3f`, `jnz 0x01c2`, `mov m,a`.
impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.mnemonic();
        match *self {
            Add{from, ..} | Subtract{from, ..} | And{from} | Or{from} | ExclusiveOr{from} | Compare{from} =>
                write!(f, "{name} {}", Operand(from)),
            AddTo{value, ..} | SubtractBy{value, ..} | AndWith{value} | OrWith{value} |
            ExclusiveOrWith{value} | CompareWith{value} | In(value) | Out(value) =>
                write!(f, "{name} {value:#04x}"),
            IncrementByte{register} | DecrementByte{register} => write!(f, "{name} {}", Operand(register)),
            IncrementWord{register} | DecrementWord{register} | DoubleAdd{register} => write!(f, "{name} {}", Operand(register)),
            LoadAccumulatorIndirect{register} | StoreAccumulatorIndirect{register} =>
                write!(f, "{name} {}", Operand(Wide(register))),
            Move{to, from} => write!(f, "{name} {},{}", Operand(to), Operand(from)),
            MoveData{value, to} => write!(f, "{name} {},{value:#04x}", Operand(to)),
            LoadExtendedWith{to, value} => write!(f, "{name} {},{value:#06x}", Operand(to)),
            Call{sub: address} | CallIf(_, address) | Jump{to: address} | JumpIf(_, address) |
            LoadAccumulator{address} | StoreAccumulator{address} | LoadHilo{address} | StoreHilo{address} =>
                write!(f, "{name} {address:#06x}"),
            Push(word) | Pop(word) => write!(f, "{name} {}", Operand(word)),
            Reset{vector} => write!(f, "{name} {vector}"),
            Illegal(code) => write!(f, "{name} {code:#04x}"),
            _ => f.write_str(name),
        }
    }
}
