use bitflags::bitflags;

bitflags! {
    /// Cooperative stop conditions polled at every step boundary.
    ///
    /// The run loop keeps going only while the signal is empty.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RunSignal: u32 {
        /// Host (signal handler, debugger, GUI) asked the loop to stop.
        const HOST_STOP = 1 << 0;
        /// Host armed a single step.
        const SINGLE_STEP = 1 << 1;
        /// A status-word write changed the low-power control bits.
        const LPM_CHANGED = 1 << 2;
        /// Undefined opcode was fetched.
        const ILLEGAL_INSTRUCTION = 1 << 3;
        /// Access to an address with no registered handler.
        const BUS_ERROR = 1 << 4;
        /// Access-control breakpoint on instruction fetch.
        const TRAP_FETCH = 1 << 5;
        /// Access-control watchpoint on a data read.
        const TRAP_READ = 1 << 6;
        /// Access-control watchpoint on a data write.
        const TRAP_WRITE = 1 << 7;
    }
}

#[cfg(test)]
mod tests {
    use super::RunSignal;

    #[test]
    fn default_signal_lets_the_loop_run() {
        assert!(RunSignal::default().is_empty());
    }
}
