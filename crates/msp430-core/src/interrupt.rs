//! Prioritized pending-interrupt register, vector lookup and the entry sequence.

use crate::fault::FaultCode;
use crate::state::status::SR_SCG0;
use crate::timing::{INTERRUPT_ENTRY_CYCLES, RESET_CYCLES};
use crate::{AccessKind, Machine, Width};

/// Number of interrupt priority levels.
pub const INTERRUPT_LEVELS: u8 = 16;
/// Highest priority: power-up / reset.
pub const RESET_PRIORITY: u8 = 15;
/// Non-maskable interrupt priority.
pub const NMI_PRIORITY: u8 = 14;
/// First address of the interrupt vector table.
pub const VECTOR_TABLE_START: u16 = 0xFFE0;
/// Reset vector address.
pub const RESET_VECTOR: u16 = vector_address(RESET_PRIORITY);

/// Vector-table slot holding the entry address for `priority`.
#[must_use]
pub const fn vector_address(priority: u8) -> u16 {
    VECTOR_TABLE_START + 2 * (priority & 0x0F) as u16
}

/// 16-bit pending vector; bit `n` pends priority `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InterruptController {
    pending: u16,
}

impl InterruptController {
    /// Creates a controller with nothing pending.
    #[must_use]
    pub const fn new() -> Self {
        Self { pending: 0 }
    }

    /// Raw pending bits.
    #[must_use]
    pub const fn pending(&self) -> u16 {
        self.pending
    }

    /// Pends `priority`.
    pub const fn raise(&mut self, priority: u8) {
        self.pending |= 1 << (priority & 0x0F);
    }

    /// Clears `priority`.
    pub const fn clear(&mut self, priority: u8) {
        self.pending &= !(1 << (priority & 0x0F));
    }

    /// Clears every pending priority.
    pub const fn clear_all(&mut self) {
        self.pending = 0;
    }

    /// Returns `true` when `priority` is pending.
    #[must_use]
    pub const fn is_pending(&self, priority: u8) -> bool {
        self.pending & (1 << (priority & 0x0F)) != 0
    }

    /// Highest pending priority regardless of masking.
    #[must_use]
    pub const fn highest_pending(&self) -> Option<u8> {
        if self.pending == 0 {
            None
        } else {
            Some(15 - self.pending.leading_zeros() as u8)
        }
    }

    /// Highest pending priority the CPU would accept given `gie`.
    ///
    /// Reset and NMI ignore `GIE`; priorities `0..=13` need it set.
    #[must_use]
    pub const fn serviceable(&self, gie: bool) -> Option<u8> {
        match self.highest_pending() {
            Some(priority) if priority >= NMI_PRIORITY || gie => Some(priority),
            _ => None,
        }
    }
}

impl Machine {
    /// Services the highest acceptable pending interrupt, if any.
    ///
    /// Returns the cycles consumed by the entry (or reset) sequence. An entry
    /// that hits a bus error is abandoned: registers are restored, the
    /// priority stays pending and no cycles are charged.
    pub(crate) fn poll_interrupts(&mut self) -> Option<u32> {
        let priority = self.interrupts.serviceable(self.regs.status().gie())?;
        if priority == RESET_PRIORITY {
            self.reset();
            return Some(RESET_CYCLES);
        }

        let saved = self.regs;
        match self.enter_interrupt(priority) {
            Ok(()) => Some(INTERRUPT_ENTRY_CYCLES),
            Err(fault) => {
                self.regs = saved;
                self.signal.insert(fault.signal());
                self.counters.faults += 1;
                log::error!("interrupt {priority} entry abandoned: {fault}");
                None
            }
        }
    }

    /// Pushes PC and SR, clears SR except `SCG0`, and jumps through the vector.
    ///
    /// The vector is fetched before anything is pushed and is invisible to
    /// the access observer.
    fn enter_interrupt(&mut self, priority: u8) -> Result<(), FaultCode> {
        let vector = vector_address(priority);
        let entry = self.dispatch_read(vector, Width::Word, AccessKind::Read)?;

        let return_pc = self.regs.next_pc();
        let status = self.regs.status();
        self.push(Width::Word, return_pc)?;
        self.push(Width::Word, status.bits())?;

        self.interrupts.clear(priority);
        self.write_status_register(status.bits() & SR_SCG0);
        self.regs.set_next_pc(entry);
        self.counters.interrupts += 1;

        log::debug!(
            "interrupt {priority} taken: return={return_pc:#06x} sr={:#06x} vector={vector:#06x} entry={entry:#06x}",
            status.bits()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        vector_address, InterruptController, NMI_PRIORITY, RESET_PRIORITY, RESET_VECTOR,
        VECTOR_TABLE_START,
    };
    use crate::encoding::{encode_jump, JumpCondition};
    use crate::peripherals::MemoryRegion;
    use crate::state::status::SR_GIE;
    use crate::{MachineBuilder, RunSignal, StepOutcome};

    #[test]
    fn vector_table_occupies_top_32_bytes() {
        assert_eq!(vector_address(0), VECTOR_TABLE_START);
        assert_eq!(vector_address(NMI_PRIORITY), 0xFFFC);
        assert_eq!(RESET_VECTOR, 0xFFFE);
    }

    #[test]
    fn higher_index_wins() {
        let mut irq = InterruptController::new();
        irq.raise(3);
        irq.raise(9);
        assert_eq!(irq.highest_pending(), Some(9));

        irq.clear(9);
        assert_eq!(irq.highest_pending(), Some(3));

        irq.clear(3);
        assert_eq!(irq.highest_pending(), None);
    }

    #[test]
    fn maskable_levels_need_gie() {
        let mut irq = InterruptController::new();
        irq.raise(5);
        assert_eq!(irq.serviceable(false), None);
        assert_eq!(irq.serviceable(true), Some(5));
    }

    #[test]
    fn nmi_and_reset_ignore_gie() {
        let mut irq = InterruptController::new();
        irq.raise(NMI_PRIORITY);
        assert_eq!(irq.serviceable(false), Some(NMI_PRIORITY));

        irq.raise(RESET_PRIORITY);
        assert_eq!(irq.serviceable(false), Some(RESET_PRIORITY));
    }

    #[test]
    fn priority_index_is_taken_modulo_16() {
        let mut irq = InterruptController::new();
        irq.raise(16 + 2);
        assert!(irq.is_pending(2));
        assert_eq!(irq.pending(), 0b100);
        irq.clear_all();
        assert_eq!(irq.pending(), 0);
    }

    #[test]
    fn unmapped_vector_abandons_entry_and_keeps_it_pending() {
        let mut m = MachineBuilder::new()
            .register(0x0200..=0x09FF, Box::new(MemoryRegion::ram()))
            .register(0xC000..=0xFFDF, Box::new(MemoryRegion::rom()))
            .build()
            .expect("disjoint regions");
        m.load_words(0xC000, &[encode_jump(JumpCondition::Jmp, -1)]);
        m.write_word(RESET_VECTOR, 0xC000);
        m.reset();
        m.set_register(1, 0x0A00);
        m.set_register(2, SR_GIE);
        m.raise_interrupt(5);

        assert_eq!(m.step(), StepOutcome::Retired { cycles: 2 });
        assert_eq!(m.signal(), RunSignal::BUS_ERROR);
        assert_eq!(m.pending_interrupts(), 1 << 5);
        assert_eq!(m.register(1), 0x0A00);
        assert_eq!(m.register(2), SR_GIE);
        assert_eq!(m.next_pc(), 0xC000);
        assert_eq!(m.counters().interrupts, 0);
        assert_eq!(m.counters().faults, 1);
        assert_eq!(m.counters().cycles, 2);
    }
}
