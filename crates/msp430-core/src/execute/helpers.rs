//! Stack and write-back helpers shared by the executors and the interrupt path.

use crate::addressing::{Location, Operand};
use crate::fault::FaultCode;
use crate::memory::Width;
use crate::state::{CG2, PC, SR};
use crate::Machine;

impl Machine {
    /// `SP -= 2`, then stores `value` at the new `SP`.
    pub(crate) fn push(&mut self, width: Width, value: u16) -> Result<(), FaultCode> {
        let sp = self.regs.sp().wrapping_sub(2);
        self.regs.set_sp(sp);
        self.bus_write(sp, width, value)
    }

    /// Writes an instruction result back to its resolved location.
    pub(crate) fn write_operand(
        &mut self,
        operand: &Operand,
        width: Width,
        value: u16,
    ) -> Result<(), FaultCode> {
        match operand.location {
            Location::Register(reg) => {
                self.write_register_result(usize::from(reg), value & width.mask());
                Ok(())
            }
            Location::Memory(addr) => self.bus_write(addr, width, value),
            Location::Constant => Ok(()),
        }
    }

    /// Register-direct write-back. Byte results arrive already masked, which
    /// clears the high byte.
    fn write_register_result(&mut self, reg: usize, value: u16) {
        match reg {
            PC => self.regs.set_next_pc(value),
            SR => self.write_status_register(value),
            CG2 => {}
            _ => self.regs.set(reg, value),
        }
    }
}
