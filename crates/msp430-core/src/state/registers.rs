use super::status::{Flag, StatusWord, SR_GIE};

/// Number of architecturally visible registers (`R0..R15`).
pub const REGISTER_COUNT: usize = 16;
/// Program counter index.
pub const PC: usize = 0;
/// Stack pointer index.
pub const SP: usize = 1;
/// Status register / constant generator #1 index.
pub const SR: usize = 2;
/// Constant generator #2 index.
pub const CG2: usize = 3;

/// Result of a full status-word write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusWrite {
    /// Status word before the write.
    pub previous: StatusWord,
    /// Status word after the write.
    pub current: StatusWord,
}

impl StatusWrite {
    /// The low-power control bits differ across the write.
    #[must_use]
    pub const fn lpm_changed(&self) -> bool {
        self.previous.lpm_bits() != self.current.lpm_bits()
    }

    /// The general interrupt enable bit differs across the write.
    #[must_use]
    pub const fn gie_changed(&self) -> bool {
        (self.previous.bits() ^ self.current.bits()) & SR_GIE != 0
    }
}

/// Register file for the core.
///
/// `R0` holds the address of the instruction being executed; `next_pc` holds
/// the fetch position (past any extension words) or a branch target and is
/// committed into `R0` when the next fetch begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    regs: [u16; REGISTER_COUNT],
    next_pc: u16,
}

impl RegisterFile {
    /// Reads a register; the index is taken modulo 16.
    #[must_use]
    pub const fn get(&self, index: usize) -> u16 {
        self.regs[index & 0xF]
    }

    /// Plain register store with no status-word side effects.
    pub const fn set(&mut self, index: usize, value: u16) {
        self.regs[index & 0xF] = value;
    }

    /// Address of the instruction currently executing.
    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.regs[PC]
    }

    /// Uncommitted address of the next fetch.
    #[must_use]
    pub const fn next_pc(&self) -> u16 {
        self.next_pc
    }

    /// Overrides the next fetch address.
    pub const fn set_next_pc(&mut self, value: u16) {
        self.next_pc = value;
    }

    /// Moves `next_pc` into `R0`; called when a fetch begins.
    pub const fn commit_next_pc(&mut self) {
        self.regs[PC] = self.next_pc;
    }

    /// Sets both `R0` and `next_pc`, as after reset or a host jump.
    pub const fn jump_to(&mut self, addr: u16) {
        self.regs[PC] = addr;
        self.next_pc = addr;
    }

    /// Stack pointer.
    #[must_use]
    pub const fn sp(&self) -> u16 {
        self.regs[SP]
    }

    /// Writes the stack pointer.
    pub const fn set_sp(&mut self, value: u16) {
        self.regs[SP] = value;
    }

    /// Status word view over `R2`.
    #[must_use]
    pub const fn status(&self) -> StatusWord {
        StatusWord::new(self.regs[SR])
    }

    /// Reads one arithmetic flag.
    #[must_use]
    pub const fn flag(&self, flag: Flag) -> bool {
        self.status().flag(flag)
    }

    /// Writes one arithmetic flag; control bits are never touched here.
    pub const fn set_flag(&mut self, flag: Flag, enabled: bool) {
        self.regs[SR] = self.status().with_flag(flag, enabled).bits();
    }

    /// Full status-word write, reporting control-bit transitions.
    pub const fn write_status(&mut self, value: u16) -> StatusWrite {
        let previous = self.status();
        self.regs[SR] = value;
        StatusWrite {
            previous,
            current: self.status(),
        }
    }

    /// All sixteen register values in index order.
    #[must_use]
    pub const fn values(&self) -> [u16; REGISTER_COUNT] {
        self.regs
    }
}
