//! Instruction execution: operand resolution, ALU, flag update, write-back
//! and cycle accounting for one decoded instruction.
//!
//! Every executor returns `Err` as soon as an access faults. The caller
//! restores the register file, so a faulting instruction leaves no
//! architectural trace apart from the run signal.

mod flags;
mod helpers;

pub use flags::{
    add, and, bic, bis, decimal_add, rra, rrc, subtract, swpb, sxt, xor, AluResult, FlagsUpdate,
};

use crate::decoder::{AddressingMode, DecodedInstruction};
use crate::encoding::{DoubleOp, JumpCondition, SingleOp};
use crate::fault::FaultCode;
use crate::memory::{AccessKind, Width};
use crate::state::Flag;
use crate::timing::{
    double_operand_cycles, single_operand_cycles, SingleColumn, JUMP_CYCLES, RETI_CYCLES,
};
use crate::Machine;

impl Machine {
    /// Executes one decoded instruction and returns its cycle count.
    pub(crate) fn execute(&mut self, instruction: DecodedInstruction) -> Result<u32, FaultCode> {
        match instruction {
            DecodedInstruction::DoubleOperand {
                op,
                src,
                src_mode,
                dst,
                dst_indexed,
                width,
            } => self.execute_double(op, src, src_mode, dst, dst_indexed, width),
            DecodedInstruction::SingleOperand {
                op: SingleOp::Reti,
                ..
            } => self.execute_reti(),
            DecodedInstruction::SingleOperand {
                op,
                reg,
                mode,
                width,
            } => self.execute_single(op, reg, mode, width),
            DecodedInstruction::Jump { condition, offset } => {
                Ok(self.execute_jump(condition, offset))
            }
        }
    }

    fn execute_double(
        &mut self,
        op: DoubleOp,
        src: u8,
        src_mode: AddressingMode,
        dst: u8,
        dst_indexed: bool,
        width: Width,
    ) -> Result<u32, FaultCode> {
        let source = self.resolve_source(src, src_mode, width)?;
        let target = self.resolve_destination(dst_indexed, dst, width, op != DoubleOp::Mov)?;

        let carry = self.regs.status().carry();
        let (s, d) = (source.value, target.value);
        let result = match op {
            DoubleOp::Mov => AluResult {
                value: s,
                flags: FlagsUpdate::None,
            },
            DoubleOp::Add => add(s, d, false, width),
            DoubleOp::Addc => add(s, d, carry, width),
            DoubleOp::Subc => subtract(s, d, carry, width),
            DoubleOp::Sub | DoubleOp::Cmp => subtract(s, d, true, width),
            DoubleOp::Dadd => decimal_add(s, d, carry, width),
            DoubleOp::Bit | DoubleOp::And => and(s, d, width),
            DoubleOp::Bic => bic(s, d, width),
            DoubleOp::Bis => bis(s, d, width),
            DoubleOp::Xor => xor(s, d, width),
        };

        // Flags first: a result written to SR replaces them.
        self.apply_flags(result.flags);
        if op.writes_destination() {
            self.write_operand(&target, width, result.value)?;
        }

        Ok(double_operand_cycles(
            source.kind.source_class(),
            target.destination_class(),
        ))
    }

    fn execute_single(
        &mut self,
        op: SingleOp,
        reg: u8,
        mode: AddressingMode,
        width: Width,
    ) -> Result<u32, FaultCode> {
        let operand = self.resolve_source(reg, mode, width)?;
        let class = operand.kind.single_class();

        let column = match op {
            SingleOp::Push => {
                self.push(width, operand.value)?;
                SingleColumn::Push
            }
            SingleOp::Call => {
                let return_pc = self.regs.next_pc();
                self.push(Width::Word, return_pc)?;
                self.regs.set_next_pc(operand.value);
                SingleColumn::Call
            }
            SingleOp::Rrc | SingleOp::Rra | SingleOp::Swpb | SingleOp::Sxt => {
                let result = match op {
                    SingleOp::Rrc => rrc(operand.value, self.regs.status().carry(), width),
                    SingleOp::Rra => rra(operand.value, width),
                    SingleOp::Swpb => swpb(operand.value),
                    _ => sxt(operand.value),
                };
                self.apply_flags(result.flags);
                self.write_operand(&operand, width, result.value)?;
                SingleColumn::Rotate
            }
            SingleOp::Reti => return self.execute_reti(),
        };

        Ok(single_operand_cycles(class, column))
    }

    fn execute_reti(&mut self) -> Result<u32, FaultCode> {
        let sp = self.regs.sp();
        let status = self.bus_read(sp, Width::Word, AccessKind::Read)?;
        let return_pc = self.bus_read(sp.wrapping_add(2), Width::Word, AccessKind::Read)?;

        self.regs.set_sp(sp.wrapping_add(4));
        self.write_status_register(status);
        self.regs.set_next_pc(return_pc);
        log::debug!("reti to {return_pc:#06x} with sr={status:#06x}");

        if let Some(priority) = self.interrupts.serviceable(self.regs.status().gie()) {
            log::debug!("interrupt {priority} still pending after reti");
        }

        Ok(RETI_CYCLES)
    }

    fn execute_jump(&mut self, condition: JumpCondition, offset: i16) -> u32 {
        if condition.evaluate(self.regs.status()) {
            let target = self.regs.next_pc().wrapping_add_signed(offset);
            self.regs.set_next_pc(target);
        }
        JUMP_CYCLES
    }

    /// Applies an ALU flag update through single-flag writes, leaving the
    /// control bits alone.
    pub(crate) fn apply_flags(&mut self, update: FlagsUpdate) {
        match update {
            FlagsUpdate::None => {}
            FlagsUpdate::UpdateNzcv {
                negative,
                zero,
                carry,
                overflow,
            } => {
                self.regs.set_flag(Flag::Negative, negative);
                self.regs.set_flag(Flag::Zero, zero);
                self.regs.set_flag(Flag::Carry, carry);
                self.regs.set_flag(Flag::Overflow, overflow);
            }
            FlagsUpdate::UpdateNzc {
                negative,
                zero,
                carry,
            } => {
                self.regs.set_flag(Flag::Negative, negative);
                self.regs.set_flag(Flag::Zero, zero);
                self.regs.set_flag(Flag::Carry, carry);
            }
        }
    }
}
