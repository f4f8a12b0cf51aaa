//! Flag arithmetic shared by every accumulator instruction.
//!
//! Results are computed on a 16-bit intermediate so that carry and borrow fall out of bit 8.

/// The five condition bits of the 8080, unpacked.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Flags {
    pub carry: bool,
    pub parity: bool,
    pub aux: bool,
    pub zero: bool,
    pub sign: bool,
}

/// Even parity of the low eight bits.
pub fn parity(value: u8) -> bool {
    let mut parity = value;
    for offset in [4, 2, 1] {
        parity ^= parity >> offset;
    }
    parity & 0x01 == 0
}

pub fn zero(result: u16) -> bool {
    result & 0x00FF == 0
}

pub fn sign(result: u16) -> bool {
    result & 0x0080 != 0
}

pub fn carry(result: u16) -> bool {
    result & 0x0100 != 0
}

/// Carry out of bit 3 for an addition of `a` and `b` producing `result`.
pub fn aux_carry(a: u8, b: u8, result: u16) -> bool {
    (a as u16 ^ b as u16 ^ result) & 0x10 != 0
}

/// Auxiliary carry for a subtraction, which the 8080 reports inverted.
pub fn aux_borrow(a: u8, b: u8, result: u16) -> bool {
    !(a as u16 ^ b as u16 ^ result) & 0x10 != 0
}

impl Flags {
    /// Policy for AND/OR/XOR: carry and auxiliary carry cleared, the rest taken from the accumulator.
    pub fn logical(accumulator: u8) -> Self {
        Self {
            carry: false,
            aux: false,
            ..Self::data(accumulator)
        }
    }

    /// Policy for the additive and subtractive group: all five bits from the 16-bit intermediate.
    pub fn arithmetic(result: u16, aux: bool) -> Self {
        Self {
            carry: carry(result),
            parity: parity(result as u8),
            aux,
            zero: zero(result),
            sign: sign(result),
        }
    }

    /// Zero, sign and parity of a byte. Carry and auxiliary carry are left clear for the caller.
    pub fn data(value: u8) -> Self {
        Self {
            carry: false,
            parity: parity(value),
            aux: false,
            zero: value == 0,
            sign: value & 0x80 != 0,
        }
    }
}

/// `a + b + carry_in`, returning the truncated sum and its flags.
pub fn add(a: u8, b: u8, carry_in: bool) -> (u8, Flags) {
    let result = a as u16 + b as u16 + carry_in as u16;
    (result as u8, Flags::arithmetic(result, aux_carry(a, b, result)))
}

/// `a - b - borrow_in` in two's complement; carry reports the borrow.
pub fn subtract(a: u8, b: u8, borrow_in: bool) -> (u8, Flags) {
    let result = (a as u16).wrapping_sub(b as u16).wrapping_sub(borrow_in as u16);
    (result as u8, Flags::arithmetic(result, aux_borrow(a, b, result)))
}

/// INR: carry is not touched, so the caller keeps its own.
pub fn increment(value: u8) -> (u8, Flags) {
    let result = value.wrapping_add(1);
    (result, Flags { aux: result & 0x0F == 0, ..Flags::data(result) })
}

pub fn decrement(value: u8) -> (u8, Flags) {
    let result = value.wrapping_sub(1);
    (result, Flags { aux: result & 0x0F != 0x0F, ..Flags::data(result) })
}

/// Decimal adjust. Returns the adjusted accumulator and flags, given the incoming carry and aux bits.
pub fn decimal_adjust(accumulator: u8, carry: bool, aux: bool) -> (u8, Flags) {
    let (low, high) = (accumulator & 0x0F, accumulator >> 4);
    let mut correction = 0;
    let mut carry_out = carry;
    if aux || low > 9 {
        correction |= 0x06;
    }
    if carry || high > 9 || (high >= 9 && low > 9) {
        correction |= 0x60;
        carry_out = true;
    }
    let (value, flags) = add(accumulator, correction, false);
    (value, Flags { carry: carry_out, ..flags })
}
