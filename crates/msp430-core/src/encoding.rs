//! Instruction-word formats, opcode tables and encoders.
//!
//! Three formats share the 16-bit instruction word:
//!
//! | Range              | Format                   |
//! |--------------------|--------------------------|
//! | `0x1000..=0x13FF`  | single operand (II)      |
//! | `0x2000..=0x3FFF`  | conditional jump (III)   |
//! | `0x4000..=0xFFFF`  | double operand (I)       |
//!
//! Every other word is illegal.

use crate::state::StatusWord;

/// Double-operand (format I) opcodes, keyed by bits 15..12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DoubleOp {
    /// Copy source to destination.
    Mov = 0x4,
    /// Binary add.
    Add = 0x5,
    /// Add with carry in.
    Addc = 0x6,
    /// Subtract with borrow (`dst + !src + C`).
    Subc = 0x7,
    /// Binary subtract.
    Sub = 0x8,
    /// Subtract for flags only.
    Cmp = 0x9,
    /// Decimal (BCD) add with carry in.
    Dadd = 0xA,
    /// AND for flags only.
    Bit = 0xB,
    /// Clear the source bits in the destination.
    Bic = 0xC,
    /// Set the source bits in the destination.
    Bis = 0xD,
    /// Bitwise exclusive or.
    Xor = 0xE,
    /// Bitwise and.
    And = 0xF,
}

impl DoubleOp {
    /// Maps the primary opcode nibble to a double-operand opcode.
    #[must_use]
    pub const fn from_u4(op: u8) -> Option<Self> {
        match op {
            0x4 => Some(Self::Mov),
            0x5 => Some(Self::Add),
            0x6 => Some(Self::Addc),
            0x7 => Some(Self::Subc),
            0x8 => Some(Self::Sub),
            0x9 => Some(Self::Cmp),
            0xA => Some(Self::Dadd),
            0xB => Some(Self::Bit),
            0xC => Some(Self::Bic),
            0xD => Some(Self::Bis),
            0xE => Some(Self::Xor),
            0xF => Some(Self::And),
            _ => None,
        }
    }

    /// Returns `false` for opcodes that only test and never write the destination.
    #[must_use]
    pub const fn writes_destination(self) -> bool {
        !matches!(self, Self::Cmp | Self::Bit)
    }
}

/// Single-operand (format II) opcodes, keyed by bits 9..7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SingleOp {
    /// Rotate right through carry.
    Rrc = 0,
    /// Swap bytes.
    Swpb = 1,
    /// Arithmetic shift right.
    Rra = 2,
    /// Sign-extend the low byte.
    Sxt = 3,
    /// Push onto the stack.
    Push = 4,
    /// Push the return address and jump.
    Call = 5,
    /// Pop SR then PC.
    Reti = 6,
}

impl SingleOp {
    /// Maps the 3-bit sub-opcode; `7` is unassigned.
    #[must_use]
    pub const fn from_u3(op: u8) -> Option<Self> {
        match op {
            0 => Some(Self::Rrc),
            1 => Some(Self::Swpb),
            2 => Some(Self::Rra),
            3 => Some(Self::Sxt),
            4 => Some(Self::Push),
            5 => Some(Self::Call),
            6 => Some(Self::Reti),
            _ => None,
        }
    }

    /// Returns `true` when the `.B` form of this opcode is defined.
    #[must_use]
    pub const fn allows_byte(self) -> bool {
        matches!(self, Self::Rrc | Self::Rra | Self::Push)
    }
}

/// Jump conditions (format III), keyed by bits 12..10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum JumpCondition {
    /// Jump if `Z` is clear.
    Jne = 0,
    /// Jump if `Z` is set.
    Jeq = 1,
    /// Jump if `C` is clear.
    Jnc = 2,
    /// Jump if `C` is set.
    Jc = 3,
    /// Jump if `N` is set.
    Jn = 4,
    /// Jump if `N == V`.
    Jge = 5,
    /// Jump if `N != V`.
    Jl = 6,
    /// Always jump.
    Jmp = 7,
}

impl JumpCondition {
    /// Maps the 3-bit condition field.
    #[must_use]
    pub const fn from_u3(cond: u8) -> Self {
        match cond & 0x7 {
            0 => Self::Jne,
            1 => Self::Jeq,
            2 => Self::Jnc,
            3 => Self::Jc,
            4 => Self::Jn,
            5 => Self::Jge,
            6 => Self::Jl,
            _ => Self::Jmp,
        }
    }

    /// Evaluates the condition against the current flags.
    #[must_use]
    pub const fn evaluate(self, status: StatusWord) -> bool {
        match self {
            Self::Jne => !status.zero(),
            Self::Jeq => status.zero(),
            Self::Jnc => !status.carry(),
            Self::Jc => status.carry(),
            Self::Jn => status.negative(),
            Self::Jge => status.negative() == status.overflow(),
            Self::Jl => status.negative() != status.overflow(),
            Self::Jmp => true,
        }
    }
}

/// Instruction format selected by the top bits of the word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionFormat {
    /// Double operand.
    DoubleOperand,
    /// Single operand.
    SingleOperand,
    /// Conditional or unconditional relative jump.
    Jump,
}

/// Classifies a word by format; `None` means the word is illegal.
#[must_use]
pub const fn classify_format(word: u16) -> Option<InstructionFormat> {
    match word {
        0x4000..=0xFFFF => Some(InstructionFormat::DoubleOperand),
        0x2000..=0x3FFF => Some(InstructionFormat::Jump),
        0x1000..=0x13FF => Some(InstructionFormat::SingleOperand),
        _ => None,
    }
}

/// Encodes a double-operand word.
///
/// `as_mode` is the 2-bit source addressing field; `dst_indexed` sets `Ad`.
#[must_use]
pub const fn encode_double(
    op: DoubleOp,
    src: u8,
    as_mode: u8,
    byte: bool,
    dst: u8,
    dst_indexed: bool,
) -> u16 {
    ((op as u16) << 12)
        | (((src & 0xF) as u16) << 8)
        | ((dst_indexed as u16) << 7)
        | ((byte as u16) << 6)
        | (((as_mode & 0x3) as u16) << 4)
        | ((dst & 0xF) as u16)
}

/// Encodes a single-operand word.
#[must_use]
pub const fn encode_single(op: SingleOp, as_mode: u8, byte: bool, reg: u8) -> u16 {
    0x1000
        | ((op as u16) << 7)
        | ((byte as u16) << 6)
        | (((as_mode & 0x3) as u16) << 4)
        | ((reg & 0xF) as u16)
}

/// Encodes a jump with a signed word offset in `-512..=511`.
#[must_use]
pub const fn encode_jump(condition: JumpCondition, offset_words: i16) -> u16 {
    0x2000 | ((condition as u16) << 10) | ((offset_words as u16) & 0x03FF)
}
