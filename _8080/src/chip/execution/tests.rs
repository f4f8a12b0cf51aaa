use super::*;
use crate::{chip::access::{Double, Internal, Register, Word}, SimpleBoard, Status};
use opcode::{Test::*, Flag::*};

#[test]
fn accumulator_group() {
    // accumulator, carry in, operand (in B, at HL and as immediate), instruction, result, flags as Display shows them
    let cases: [(u8, bool, u8, fn(u8) -> Op, u8, &str); 8] = [
        (0x2E, false, 0x74, |_| Add { from: Byte::Single(B), carry: false }, 0xA2, ".s..a"),
        (0xF0, true, 0x0F, |value| AddTo { value, carry: true }, 0x00, "z.pca"),
        (0x3E, true, 0x3E, |_| Subtract { from: Byte::Indirect, carry: false }, 0x00, "z.p.a"),
        (0x10, true, 0x01, |value| SubtractBy { value, carry: true }, 0x0E, "....."),
        (0xFC, true, 0x0F, |_| And { from: Byte::Single(B) }, 0x0C, "..p.."),
        (0x5A, true, 0x5A, |_| ExclusiveOr { from: Byte::Indirect }, 0x00, "z.p.."),
        (0x80, true, 0x01, |value| OrWith { value }, 0x81, ".sp.."),
        (0x05, false, 0x06, |_| Compare { from: Byte::Single(B) }, 0x05, ".spc."),
    ];
    for (accumulator, carry, operand, instruction, result, flags) in cases {
        let mut env = SimpleBoard::default();
        let mut chip = State::new();
        chip.set_hl(0x2000);
        env[0x2000] = operand;
        (chip[A], chip[B], chip.c, chip.a) = (accumulator, operand, carry, true);
        let op = instruction(operand);
        assert_eq!(op.execute_on(&mut chip, &mut env), Ok(0), "{op}");
        assert_eq!((chip[A], &chip.to_string()[1..6]), (result, flags), "{op}");
    }
}

#[test]
fn every_condition() {
    let tests = [Not(Zero), Is(Zero), Not(Carry), Is(Carry), Not(EvenParity), Is(EvenParity), Not(Negative), Is(Negative)];
    for all_set in [false, true] {
        for test in tests {
            let mut env = SimpleBoard::default();
            let mut chip = State::new();
            chip.set_flags_byte(if all_set { 0xFF } else { 0x00 });
            (chip.pc, chip.sp) = (0x0100, 0x3000);
            let taken = matches!(test, Is(_)) == all_set;
            let extra = if taken { TAKEN } else { 0 };

            assert_eq!(JumpIf(test, 0x0200).execute_on(&mut chip, &mut env), Ok(0));
            assert_eq!(chip.pc == 0x0200, taken, "{test:?}");
            chip.pc = 0x0100;
            assert_eq!(CallIf(test, 0x0300).execute_on(&mut chip, &mut env), Ok(extra), "{test:?}");
            assert_eq!(chip.sp, if taken { 0x2FFE } else { 0x3000 });
            assert_eq!(ReturnIf(test).execute_on(&mut chip, &mut env), Ok(extra), "{test:?}");
            assert_eq!((chip.pc, chip.sp), (0x0100, 0x3000));
        }
    }
}

#[test]
fn increments_keep_carry() {
    // target, increment or decrement, before, after, flags
    let cases = [
        (Byte::Single(C), true, 0x0F, 0x10, "...ca"),
        (Byte::Indirect, true, 0xFF, 0x00, "z.pca"),
        (Byte::Single(C), false, 0x10, 0x0F, "..pc."),
        (Byte::Indirect, false, 0x01, 0x00, "z.pca"),
        (Byte::Single(C), false, 0x00, 0xFF, ".spc."),
    ];
    for (target, up, before, after, flags) in cases {
        let mut env = SimpleBoard::default();
        let mut chip = State::new();
        chip.set_hl(0x2000);
        chip.c = true;
        chip.store(&mut env, target, before).unwrap();
        let op = if up { IncrementByte { register: target } } else { DecrementByte { register: target } };
        op.execute_on(&mut chip, &mut env).unwrap();
        assert_eq!(chip.load(&env, target), after, "{op}");
        assert_eq!(&chip.to_string()[1..6], flags, "{op}");
    }
}

#[test]
fn rotates_touch_only_carry() {
    // instruction, accumulator, carry in, result, carry out
    let cases = [
        (RotateLeftCarrying, 0x81, false, 0x03, true),
        (RotateRightCarrying, 0x81, false, 0xC0, true),
        (RotateAccumulatorLeft, 0x81, false, 0x02, true),
        (RotateAccumulatorLeft, 0x01, true, 0x03, false),
        (RotateAccumulatorRight, 0x01, true, 0x80, true),
        (RotateAccumulatorRight, 0x02, false, 0x01, false),
    ];
    for (op, accumulator, carry, result, carried) in cases {
        let mut env = SimpleBoard::default();
        let mut chip = State::new();
        (chip[A], chip.c, chip.z) = (accumulator, carry, true);
        op.execute_on(&mut chip, &mut env).unwrap();
        assert_eq!((chip[A], chip.c), (result, carried), "{op}");
        assert!(chip.z, "{op} changed zero");
    }
}

#[test]
fn carry_and_complement() {
    let mut env = SimpleBoard::default();
    let mut chip = State::new();
    chip[A] = 0x3C;
    ComplementAccumulator.execute_on(&mut chip, &mut env).unwrap();
    assert_eq!(chip[A], 0xC3);
    assert_eq!(chip.flags_byte(), 0x02);
    CarryFlag(false).execute_on(&mut chip, &mut env).unwrap();
    assert!(chip.c);
    CarryFlag(false).execute_on(&mut chip, &mut env).unwrap();
    assert!(!chip.c);
    CarryFlag(true).execute_on(&mut chip, &mut env).unwrap();
    CarryFlag(true).execute_on(&mut chip, &mut env).unwrap();
    assert!(chip.c);
}

#[test]
fn illegal() {
    let mut env = SimpleBoard::default();
    let mut chip = State::new();
    chip.pc = 0x0201;
    let stop = Illegal(0xDD).execute_on(&mut chip, &mut env).unwrap_err();
    assert_eq!(stop.fault(), Some(&Fault::IllegalOpcode { opcode: 0xDD, pc: 0x0200 }));
}

#[test]
fn program_status_round_trip() {
    let mut env = SimpleBoard::default();
    let mut chip = State::new();
    chip.sp = 0x3000;
    chip[A] = 0x9A;
    (chip.c, chip.z, chip.m, chip.p, chip.a) = (true, false, true, false, true);
    Push(Word::ProgramStatus).execute_on(&mut chip, &mut env).unwrap();
    let saved = chip.clone();
    chip[A] = 0;
    chip.set_flags_byte(0);
    Pop(Word::ProgramStatus).execute_on(&mut chip, &mut env).unwrap();
    assert_eq!(chip, State { sp: 0x3000, ..saved });
}

#[test]
fn decimal_adjust() {
    let mut env = SimpleBoard::default();
    let mut chip = State::new();
    chip[A] = 0x9A;
    DecimalAddAdjust.execute_on(&mut chip, &mut env).unwrap();
    assert_eq!(chip[A], 0x00);
    assert!(chip.c);
    assert!(chip.z);

    chip[A] = 0x38;
    AddTo { value: 0x45, carry: false }.execute_on(&mut chip, &mut env).unwrap();
    DecimalAddAdjust.execute_on(&mut chip, &mut env).unwrap();
    assert_eq!(chip[A], 0x83);
    assert!(!chip.c);
}

#[test]
fn double_add() {
    let mut env = SimpleBoard::default();
    let mut chip = State::new();
    chip.set_hl(0xA17B);
    chip.set_bc(0x339F);
    chip.z = true;
    DoubleAdd { register: Internal::Wide(Double::BC) }.execute_on(&mut chip, &mut env).unwrap();
    assert_eq!(chip.hl(), 0xD51A);
    assert!(!chip.c);
    DoubleAdd { register: Internal::Wide(Double::HL) }.execute_on(&mut chip, &mut env).unwrap();
    assert_eq!(chip.hl(), 0xAA34);
    assert!(chip.c);
    assert!(chip.z, "DAD only touches carry");
}

#[test]
fn ports() {
    let mut env = SimpleBoard::default();
    let mut chip = State::new();
    env.set_input(0x01, 0x5C);
    In(0x01).execute_on(&mut chip, &mut env).unwrap();
    assert_eq!(chip[A], 0x5C);
    chip[A] = 0x21;
    Out(0x04).execute_on(&mut chip, &mut env).unwrap();
    assert_eq!(env.output_latch(0x04), 0x21);
}

/// Everything below 0x1000 is ROM.
#[derive(Default)]
struct Guarded(SimpleBoard);

impl Harness for Guarded {
    fn read(&self, from: u16) -> u8 { self.0.read(from) }
    fn write(&mut self, to: u16, value: u8) -> Result<(), Fault> {
        match to {
            0x0000..=0x0FFF => Err(Fault::ReadOnly { address: to, value }),
            _ => self.0.write(to, value),
        }
    }
    fn input(&mut self, port: u8) -> Result<u8, Fault> { Err(Fault::UnknownInputPort(port)) }
    fn output(&mut self, port: u8, value: u8) -> Result<(), Fault> { self.0.output(port, value) }
}

#[test]
fn host_faults_propagate() {
    let mut env = Guarded::default();
    let mut chip = State::new();
    chip[A] = 0x44;
    assert_eq!(
        StoreAccumulator { address: 0x0123 }.execute_on(&mut chip, &mut env),
        Err(Stop::Fault(Fault::ReadOnly { address: 0x0123, value: 0x44 }))
    );
    assert_eq!(In(0x07).execute_on(&mut chip, &mut env), Err(Stop::Fault(Fault::UnknownInputPort(0x07))));
}

fn machine(program: &[u8]) -> Machine<SimpleBoard> {
    Machine::new(SimpleBoard::with_image(0, program)).unwrap()
}

#[test]
fn nop_step() {
    let mut machine = machine(&[0x00]);
    let before = machine.chip().clone();
    assert_eq!(machine.step(), Ok(4));
    let after = machine.chip();
    assert_eq!(after.pc, 1);
    assert_eq!(after.cycles, 4);
    assert_eq!(*after, State { pc: 1, cycles: 4, ..before });
    let board: &SimpleBoard = &machine;
    assert!((0..=0xFFFF_u16).all(|address| board[address] == 0));
}

#[test]
fn conditional_call_costs() {
    // CZ 0x0010 (not taken), XRA A, CZ 0x0010 (taken), then at 0x0010 RNZ (not taken), RZ (taken)
    let mut image = vec![0xCC, 0x10, 0x00, 0xAF, 0xCC, 0x10, 0x00];
    image.resize(0x10, 0x00);
    image.extend([0xC0, 0xC8]);
    let mut machine = machine(&image);
    machine.chip_mut().set_sp(0x8000);
    let cycles: Vec<u8> = machine.by_ref().take(5).collect();
    assert_eq!(cycles, [11, 4, 17, 5, 11]);
    assert_eq!(machine.chip().pc(), 0x0007);
    assert_eq!(machine.chip().cycles(), 48);
}

#[test]
fn halted_machine_stays_halted() {
    let mut machine = machine(&[0x3E, 0x12, 0x76, 0x3C]);
    assert_eq!(machine.run(), Stop::Halt(crate::Halt::Instruction));
    assert_eq!(machine.status(), &Status::Halted(Stop::Halt(crate::Halt::Instruction)));
    let frozen = machine.chip().clone();
    assert_eq!(machine.step(), Err(Stop::Halt(crate::Halt::Instruction)));
    assert_eq!(machine.next(), None);
    assert_eq!(machine.chip(), &frozen);
    assert_eq!(frozen[A], 0x12);
    assert_eq!(frozen.pc, 0x0003);
}

#[test]
fn illegal_opcode_halts_with_fault() {
    let mut machine = machine(&[0x00, 0x00, 0x08]);
    assert_eq!(machine.run(), Stop::Fault(Fault::IllegalOpcode { opcode: 0x08, pc: 0x0002 }));
}

#[test]
fn interrupts() {
    // EI, then spin on NOPs
    let mut machine = machine(&[0xFB]);
    machine.chip_mut().set_sp(0x2400);
    assert_eq!(machine.interrupt(0x08), Ok(false));
    assert_eq!(machine.chip().sp(), 0x2400);

    machine.step().unwrap();
    machine.step().unwrap();
    assert!(machine.interrupts_enabled());
    let cycles = machine.chip().cycles();
    assert_eq!(machine.interrupt(0x10), Ok(true));
    assert_eq!(machine.chip().pc(), 0x0010);
    assert_eq!(machine.chip().sp(), 0x23FE);
    assert_eq!(machine.read_word(0x23FE), 0x0002);
    assert_eq!(machine.chip().cycles(), cycles + 11);
    assert!(!machine.interrupts_enabled());

    assert_eq!(machine.interrupt(0x11), Err(Stop::Fault(Fault::InvalidVector(0x11))));
    assert_eq!(machine.reset_to(9), Err(Stop::Fault(Fault::InvalidVector(9))));
    machine.chip_mut().enable_interrupts();
    assert_eq!(machine.reset_to(7), Ok(true));
    assert_eq!(machine.chip().pc(), 0x0038);
}

#[derive(Default)]
struct Recorder(Vec<String>);

impl crate::trace::Trace for Recorder {
    fn before(&mut self, fetched: &Fetched, chip: &State) {
        assert_eq!(fetched.pc, chip.pc());
        self.0.push(fetched.op.to_string());
    }

    fn after(&mut self, fetched: &Fetched, chip: &State, cycles: u8) {
        assert_eq!(chip.pc(), fetched.pc + fetched.len as u16);
        self.0.push(format!("{cycles} {chip}"));
    }
}

#[test]
fn tracing_sees_each_instruction() {
    let mut machine = machine(&[0x06, 0x3F, 0x78]);
    let mut recorder = Recorder::default();
    machine.step_traced(&mut recorder).unwrap();
    machine.step_traced(&mut recorder).unwrap();
    assert_eq!(recorder.0[0], "mvi b,0x3f");
    assert!(recorder.0[1].starts_with("7 "), "{}", recorder.0[1]);
    assert_eq!(recorder.0[2], "mov a,b");
    assert!(recorder.0[3].contains("A $3f B $3f"), "{}", recorder.0[3]);
}

#[test]
fn memory_operands() {
    // LXI H,0x2000; MVI M,0x5A; MOV A,M; INR A; MOV M,A; INR M; MOV B,M; HLT
    let mut machine = machine(&[0x21, 0x00, 0x20, 0x36, 0x5A, 0x7E, 0x3C, 0x77, 0x34, 0x46, 0x76]);
    assert_eq!(machine.run(), Stop::Halt(crate::Halt::Instruction));
    assert_eq!(machine[0x2000], 0x5C);
    assert_eq!((machine.chip()[A], machine.chip()[B]), (0x5B, 0x5C));
    assert_eq!(machine.chip().cycles(), 56);
    assert_eq!(machine.chip().pc(), 0x000B);
}

#[test]
fn direct_addressing() {
    // MVI A,0x42; STA 0x2100; LXI H,0xBEEF; SHLD 0x2110; XRA A; LXI H,0; LDA 0x2100; LHLD 0x2110; HLT
    let mut machine = machine(&[
        0x3E, 0x42, 0x32, 0x00, 0x21, 0x21, 0xEF, 0xBE, 0x22, 0x10, 0x21, 0xAF,
        0x21, 0x00, 0x00, 0x3A, 0x00, 0x21, 0x2A, 0x10, 0x21, 0x76,
    ]);
    machine.run();
    assert_eq!((machine[0x2100], machine[0x2110], machine[0x2111]), (0x42, 0xEF, 0xBE));
    assert_eq!((machine.chip()[A], machine.chip().hl()), (0x42, 0xBEEF));
    assert_eq!(machine.chip().cycles(), 89);
}

#[test]
fn stack_discipline() {
    let mut image = vec![
        0x31, 0x00, 0x30, // LXI SP,0x3000
        0x01, 0x34, 0x12, // LXI B,0x1234
        0xC5,             // PUSH B
        0xD1,             // POP D
        0xCD, 0x20, 0x00, // CALL 0x0020
        0x76,             // HLT
    ];
    image.resize(0x20, 0x00);
    // XCHG; XTHL; XTHL; RET
    image.extend([0xEB, 0xE3, 0xE3, 0xC9]);
    let mut machine = machine(&image);
    assert_eq!(machine.run(), Stop::Halt(crate::Halt::Instruction));
    let chip = machine.chip();
    assert_eq!((chip.bc(), chip.de(), chip.hl()), (0x1234, 0x0000, 0x1234));
    assert_eq!((chip.sp(), chip.pc()), (0x3000, 0x000C));
    assert_eq!(machine.read_word(0x2FFE), 0x000B);
    assert_eq!(machine.chip().cycles(), 10 + 10 + 11 + 10 + 17 + 5 + 18 + 18 + 10);
}

#[test]
fn faults_from_stores_and_pushes_stop_the_machine() {
    // LXI H,0x0800; MVI A,0x99; MOV M,A
    let mut machine = Machine::new(Guarded(SimpleBoard::with_image(0, &[0x21, 0x00, 0x08, 0x3E, 0x99, 0x77]))).unwrap();
    let stop = machine.run();
    assert_eq!(stop, Stop::Fault(Fault::ReadOnly { address: 0x0800, value: 0x99 }));
    assert_eq!(machine.status(), &Status::Halted(stop));
    assert_eq!(machine.chip().cycles(), 17);

    // LXI SP,0x0800; CALL 0x2000
    let mut machine = Machine::new(Guarded(SimpleBoard::with_image(0, &[0x31, 0x00, 0x08, 0xCD, 0x00, 0x20]))).unwrap();
    assert_eq!(machine.run(), Stop::Fault(Fault::ReadOnly { address: 0x07FF, value: 0x00 }));
    assert_eq!((machine.chip().sp(), machine.chip().pc()), (0x0800, 0x0006));

    // IN 3
    let mut machine = Machine::new(Guarded(SimpleBoard::with_image(0, &[0xDB, 0x03]))).unwrap();
    assert_eq!(machine.step(), Err(Stop::Fault(Fault::UnknownInputPort(0x03))));
    assert!(!machine.is_running());
}

/// Treats HLT as a breakpoint that costs three extra cycles, and stops after the second one.
#[derive(Default)]
struct Breakpoints {
    board: SimpleBoard,
    hits: Vec<u16>,
}

fn breakpoint(chip: &mut State, host: &mut Breakpoints, op: Op) -> Result<u8, Stop> {
    assert_eq!(op, Halt);
    host.hits.push(chip.pc() - 1);
    Ok(3)
}

impl Harness for Breakpoints {
    fn read(&self, from: u16) -> u8 { self.board.read(from) }
    fn write(&mut self, to: u16, value: u8) -> Result<(), Fault> { self.board.write(to, value) }
    fn input(&mut self, port: u8) -> Result<u8, Fault> { self.board.input(port) }
    fn output(&mut self, port: u8, value: u8) -> Result<(), Fault> { self.board.output(port, value) }

    fn overrides() -> crate::Overrides<Self> {
        crate::Overrides::new().with(crate::Instruction::replacing(0x76, breakpoint))
    }

    fn did_execute(&mut self, _chip: &State) -> Result<(), Stop> {
        match self.hits.len() {
            2 => Err(crate::Halt::Passed(format!("{:04x?}", self.hits)).into()),
            _ => Ok(()),
        }
    }
}

#[test]
fn host_overrides_are_dispatched() {
    let mut host = Breakpoints::default();
    host.board.load(0, &[0x76, 0x00, 0x76, 0x00]);
    let mut machine = Machine::new(host).unwrap();
    assert_eq!(machine.table().get(0x76).cycles, 7);
    assert_eq!(machine.step(), Ok(10));
    assert_eq!(machine.step(), Ok(4));
    assert_eq!(machine.run(), Stop::Halt(crate::Halt::Passed("[0000, 0002]".to_string())));
    assert_eq!(machine.chip().cycles(), 24);
    assert_eq!(machine.hits, [0x0000, 0x0002]);
}
