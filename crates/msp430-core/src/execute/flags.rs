//! ALU primitives and the flag updates they produce.

use crate::memory::Width;

/// Describes how the status flags change after an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlagsUpdate {
    /// Flags untouched.
    #[default]
    None,
    /// Overwrite N, Z, C and V.
    UpdateNzcv {
        /// Negative flag.
        negative: bool,
        /// Zero flag.
        zero: bool,
        /// Carry flag.
        carry: bool,
        /// Overflow flag.
        overflow: bool,
    },
    /// Overwrite N, Z and C; V unchanged.
    UpdateNzc {
        /// Negative flag.
        negative: bool,
        /// Zero flag.
        zero: bool,
        /// Carry flag.
        carry: bool,
    },
}

/// Result value plus its flag effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluResult {
    /// Result, masked to the operation width.
    pub value: u16,
    /// Flag effect to apply before write-back.
    pub flags: FlagsUpdate,
}

impl AluResult {
    const fn plain(value: u16) -> Self {
        Self {
            value,
            flags: FlagsUpdate::None,
        }
    }
}

const fn nzcv(value: u16, width: Width, carry: bool, overflow: bool) -> FlagsUpdate {
    FlagsUpdate::UpdateNzcv {
        negative: value & width.sign_bit() != 0,
        zero: value == 0,
        carry,
        overflow,
    }
}

/// `dst + src + carry_in`.
#[must_use]
pub const fn add(src: u16, dst: u16, carry_in: bool, width: Width) -> AluResult {
    let mask = width.mask();
    let sign = width.sign_bit();
    let (src, dst) = (src & mask, dst & mask);
    let wide = src as u32 + dst as u32 + carry_in as u32;
    let value = (wide as u16) & mask;
    let carry = wide > mask as u32;
    let overflow = (src & sign) == (dst & sign) && (value & sign) != (dst & sign);
    AluResult {
        value,
        flags: nzcv(value, width, carry, overflow),
    }
}

/// `dst + !src + carry_in`; `carry_in` is `true` for `SUB`/`CMP` and `C` for `SUBC`.
#[must_use]
pub const fn subtract(src: u16, dst: u16, carry_in: bool, width: Width) -> AluResult {
    add(!src, dst, carry_in, width)
}

/// Nibble-wise BCD `dst + src + carry_in`. V is left unchanged.
#[must_use]
pub const fn decimal_add(src: u16, dst: u16, carry_in: bool, width: Width) -> AluResult {
    let nibbles = match width {
        Width::Byte => 2,
        Width::Word => 4,
    };
    let mut carry = carry_in as u16;
    let mut value = 0u16;
    let mut i = 0;
    while i < nibbles {
        let shift = i * 4;
        let mut digit = ((src >> shift) & 0xF) + ((dst >> shift) & 0xF) + carry;
        if digit >= 10 {
            digit = (digit + 6) & 0xF;
            carry = 1;
        } else {
            carry = 0;
        }
        value |= digit << shift;
        i += 1;
    }
    AluResult {
        value,
        flags: FlagsUpdate::UpdateNzc {
            negative: value & width.sign_bit() != 0,
            zero: value == 0,
            carry: carry != 0,
        },
    }
}

/// `src & dst`, used by `AND` and `BIT`.
#[must_use]
pub const fn and(src: u16, dst: u16, width: Width) -> AluResult {
    let value = src & dst & width.mask();
    AluResult {
        value,
        flags: nzcv(value, width, value != 0, false),
    }
}

/// `src ^ dst`; V when both operands are negative.
#[must_use]
pub const fn xor(src: u16, dst: u16, width: Width) -> AluResult {
    let sign = width.sign_bit();
    let value = (src ^ dst) & width.mask();
    let overflow = src & sign != 0 && dst & sign != 0;
    AluResult {
        value,
        flags: nzcv(value, width, value != 0, overflow),
    }
}

/// `dst & !src`; flags untouched.
#[must_use]
pub const fn bic(src: u16, dst: u16, width: Width) -> AluResult {
    AluResult::plain(dst & !src & width.mask())
}

/// `dst | src`; flags untouched.
#[must_use]
pub const fn bis(src: u16, dst: u16, width: Width) -> AluResult {
    AluResult::plain((dst | src) & width.mask())
}

/// Rotate right through carry.
#[must_use]
pub const fn rrc(operand: u16, carry_in: bool, width: Width) -> AluResult {
    let operand = operand & width.mask();
    let msb = if carry_in { width.sign_bit() } else { 0 };
    let value = (operand >> 1) | msb;
    AluResult {
        value,
        flags: nzcv(value, width, operand & 1 != 0, false),
    }
}

/// Arithmetic shift right.
#[must_use]
pub const fn rra(operand: u16, width: Width) -> AluResult {
    let operand = operand & width.mask();
    let value = (operand >> 1) | (operand & width.sign_bit());
    AluResult {
        value,
        flags: nzcv(value, width, operand & 1 != 0, false),
    }
}

/// Swap bytes; flags untouched.
#[must_use]
pub const fn swpb(operand: u16) -> AluResult {
    AluResult::plain(operand.rotate_left(8))
}

/// Sign-extend bit 7 into the high byte.
#[must_use]
pub const fn sxt(operand: u16) -> AluResult {
    let value = (operand as u8) as i8 as i16 as u16;
    AluResult {
        value,
        flags: nzcv(value, Width::Word, value != 0, false),
    }
}
