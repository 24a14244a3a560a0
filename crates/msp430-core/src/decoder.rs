//! Instruction decoder.
//!
//! Splits a raw instruction word into its format-specific fields and
//! rejects unassigned encodings before any operand is fetched, so an
//! illegal word never has side effects.

use crate::encoding::{classify_format, DoubleOp, InstructionFormat, JumpCondition, SingleOp};
use crate::fault::FaultCode;
use crate::memory::Width;

/// Two-bit source (`As`) addressing field, before constant-generator rewriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    /// `Rn`.
    Register,
    /// `x(Rn)`, `EDE`, `&EDE`.
    Indexed,
    /// `@Rn`.
    Indirect,
    /// `@Rn+`, `#N`.
    IndirectIncrement,
}

impl AddressingMode {
    /// Converts the two-bit `As` field.
    #[must_use]
    pub const fn from_as(bits: u8) -> Self {
        match bits & 0x3 {
            0 => Self::Register,
            1 => Self::Indexed,
            2 => Self::Indirect,
            _ => Self::IndirectIncrement,
        }
    }

    /// Raw two-bit field value.
    #[must_use]
    pub const fn as_bits(self) -> u8 {
        match self {
            Self::Register => 0,
            Self::Indexed => 1,
            Self::Indirect => 2,
            Self::IndirectIncrement => 3,
        }
    }
}

/// Fully validated instruction ready for operand resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodedInstruction {
    /// Format I.
    DoubleOperand {
        /// Operation.
        op: DoubleOp,
        /// Source register index.
        src: u8,
        /// Source addressing mode.
        src_mode: AddressingMode,
        /// Destination register index.
        dst: u8,
        /// `Ad` bit: destination is `x(Rn)` / `EDE` / `&EDE`.
        dst_indexed: bool,
        /// Operand width.
        width: Width,
    },
    /// Format II.
    SingleOperand {
        /// Operation.
        op: SingleOp,
        /// Operand register index.
        reg: u8,
        /// Operand addressing mode.
        mode: AddressingMode,
        /// Operand width.
        width: Width,
    },
    /// Format III.
    Jump {
        /// Branch condition.
        condition: JumpCondition,
        /// Sign-extended byte displacement (already doubled).
        offset: i16,
    },
}

/// Stateless instruction-word decoder.
pub struct Decoder;

impl Decoder {
    /// Decodes one instruction word.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::IllegalInstruction`] for words outside the three
    /// formats, the unassigned single-operand sub-opcode, and `.B` forms of
    /// `SWPB`, `SXT`, `CALL` and `RETI`.
    pub const fn decode(word: u16) -> Result<DecodedInstruction, FaultCode> {
        let Some(format) = classify_format(word) else {
            return Err(FaultCode::IllegalInstruction);
        };

        let byte = word & 0x0040 != 0;
        let as_bits = ((word >> 4) & 0x3) as u8;

        match format {
            InstructionFormat::DoubleOperand => {
                let Some(op) = DoubleOp::from_u4((word >> 12) as u8) else {
                    return Err(FaultCode::IllegalInstruction);
                };
                Ok(DecodedInstruction::DoubleOperand {
                    op,
                    src: ((word >> 8) & 0xF) as u8,
                    src_mode: AddressingMode::from_as(as_bits),
                    dst: (word & 0xF) as u8,
                    dst_indexed: word & 0x0080 != 0,
                    width: Width::from_bw(byte),
                })
            }
            InstructionFormat::SingleOperand => {
                let Some(op) = SingleOp::from_u3(((word >> 7) & 0x7) as u8) else {
                    return Err(FaultCode::IllegalInstruction);
                };
                if byte && !op.allows_byte() {
                    return Err(FaultCode::IllegalInstruction);
                }
                Ok(DecodedInstruction::SingleOperand {
                    op,
                    reg: (word & 0xF) as u8,
                    mode: AddressingMode::from_as(as_bits),
                    width: Width::from_bw(byte),
                })
            }
            InstructionFormat::Jump => Ok(DecodedInstruction::Jump {
                condition: JumpCondition::from_u3(((word >> 10) & 0x7) as u8),
                offset: jump_offset(word),
            }),
        }
    }
}

/// Sign-extends the 10-bit word displacement and converts it to bytes.
#[must_use]
pub const fn jump_offset(word: u16) -> i16 {
    // Shift the sign bit (bit 9) up to bit 15, then arithmetic-shift back
    // down leaving one extra factor of two.
    ((word << 6) as i16) >> 5
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{jump_offset, AddressingMode, DecodedInstruction, Decoder};
    use crate::encoding::{
        classify_format, encode_double, encode_jump, encode_single, DoubleOp, JumpCondition,
        SingleOp,
    };
    use crate::fault::FaultCode;
    use crate::memory::Width;

    #[test]
    fn decodes_double_operand_fields() {
        let word = encode_double(DoubleOp::Add, 4, 1, true, 6, true);
        assert_eq!(
            Decoder::decode(word),
            Ok(DecodedInstruction::DoubleOperand {
                op: DoubleOp::Add,
                src: 4,
                src_mode: AddressingMode::Indexed,
                dst: 6,
                dst_indexed: true,
                width: Width::Byte,
            })
        );
    }

    #[test]
    fn decodes_single_operand_fields() {
        let word = encode_single(SingleOp::Push, 3, false, 0);
        assert_eq!(
            Decoder::decode(word),
            Ok(DecodedInstruction::SingleOperand {
                op: SingleOp::Push,
                reg: 0,
                mode: AddressingMode::IndirectIncrement,
                width: Width::Word,
            })
        );
    }

    #[test]
    fn byte_forms_without_meaning_are_illegal() {
        for op in [SingleOp::Swpb, SingleOp::Sxt, SingleOp::Call, SingleOp::Reti] {
            let word = encode_single(op, 0, true, 5);
            assert_eq!(Decoder::decode(word), Err(FaultCode::IllegalInstruction));
        }
        assert!(Decoder::decode(encode_single(SingleOp::Rra, 0, true, 5)).is_ok());
    }

    #[test]
    fn unassigned_single_operand_slot_is_illegal() {
        assert_eq!(Decoder::decode(0x1380), Err(FaultCode::IllegalInstruction));
    }

    #[test]
    fn words_outside_formats_are_illegal() {
        for word in [0x0000, 0x0FFF, 0x1400, 0x1FFF] {
            assert_eq!(Decoder::decode(word), Err(FaultCode::IllegalInstruction));
        }
    }

    #[test]
    fn jump_offsets_are_sign_extended_and_doubled() {
        assert_eq!(jump_offset(encode_jump(JumpCondition::Jmp, -1)), -2);
        assert_eq!(jump_offset(encode_jump(JumpCondition::Jmp, 0)), 0);
        assert_eq!(jump_offset(encode_jump(JumpCondition::Jne, 511)), 1022);
        assert_eq!(jump_offset(encode_jump(JumpCondition::Jeq, -512)), -1024);
    }

    proptest! {
        #[test]
        fn decode_never_panics_and_matches_format(word in any::<u16>()) {
            let decoded = Decoder::decode(word);
            if classify_format(word).is_none() {
                prop_assert_eq!(decoded, Err(FaultCode::IllegalInstruction));
            }
        }

        #[test]
        fn jump_encode_decode_preserves_offset(offset in -512i16..=511) {
            let word = encode_jump(JumpCondition::Jmp, offset);
            prop_assert_eq!(
                Decoder::decode(word),
                Ok(DecodedInstruction::Jump { condition: JumpCondition::Jmp, offset: offset * 2 })
            );
        }
    }
}
