//! Diagnostic counters and the register/stack dumps written to fault logs.

use std::fmt;

use crate::memory::read_u16_le;
use crate::state::{RegisterFile, REGISTER_COUNT};

/// Running totals since construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Counters {
    /// Retired instructions.
    pub instructions: u64,
    /// Total cycles charged, including idle ticks and entry sequences.
    pub cycles: u64,
    /// Idle ticks taken while the CPU was off.
    pub idle_ticks: u64,
    /// Interrupt entry sequences performed.
    pub interrupts: u64,
    /// Reset sequences performed.
    pub resets: u64,
    /// Faulted steps.
    pub faults: u64,
    /// Simulated nanoseconds reported by the clock.
    pub elapsed_ns: u64,
}

/// Formats a register file the way fault logs print it.
pub struct RegisterDump<'a>(pub &'a RegisterFile);

impl fmt::Display for RegisterDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let regs = self.0;
        write!(f, "pc={:#06x} next={:#06x}", regs.pc(), regs.next_pc())?;
        for index in 1..REGISTER_COUNT {
            let sep = if index % 4 == 0 { "\n" } else { " " };
            write!(f, "{sep}r{index:<2}={:#06x}", regs.get(index))?;
        }
        Ok(())
    }
}

/// Reads `words` words upward from `sp` straight out of backing memory.
#[must_use]
pub fn stack_dump(memory: &[u8], sp: u16, words: u16) -> Vec<u16> {
    (0..words)
        .map(|i| read_u16_le(memory, sp.wrapping_add(i.wrapping_mul(2))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{stack_dump, RegisterDump};
    use crate::memory::{new_address_space, write_u16_le};
    use crate::state::RegisterFile;

    #[test]
    fn register_dump_lists_every_register() {
        let mut regs = RegisterFile::default();
        regs.jump_to(0xC000);
        regs.set(15, 0xBEEF);
        let text = RegisterDump(&regs).to_string();
        assert!(text.starts_with("pc=0xc000 next=0xc000"));
        assert!(text.contains("r15=0xbeef"));
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn stack_dump_reads_words_upward() {
        let mut memory = new_address_space();
        write_u16_le(&mut memory, 0x03FC, 0x1111);
        write_u16_le(&mut memory, 0x03FE, 0x2222);
        assert_eq!(stack_dump(&memory, 0x03FC, 2), vec![0x1111, 0x2222]);
    }
}
