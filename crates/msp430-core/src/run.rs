//! Step and run loop.
//!
//! One step is either a retired instruction or, with `CPUOFF` set, an idle
//! tick. After every step the cycle count goes to the clock, the clock's
//! elapsed time goes to the handlers, and only then are interrupts polled.

use crate::api::{RunOutcome, StepOutcome};
use crate::decoder::Decoder;
use crate::fault::FaultCode;
use crate::memory::HandlerContext;
use crate::state::RunSignal;
use crate::Machine;

impl Machine {
    /// Executes one instruction (or one idle tick) and services at most one
    /// interrupt afterwards.
    ///
    /// A faulted step charges no cycles, polls no interrupts and leaves the
    /// registers as they were before the fetch.
    pub fn step(&mut self) -> StepOutcome {
        let outcome = if self.regs.status().cpu_off() {
            self.step_idle()
        } else {
            self.step_active()
        };

        match outcome {
            StepOutcome::Retired { cycles } | StepOutcome::Idle { cycles } => {
                self.advance_time(cycles);
                if let Some(entry_cycles) = self.poll_interrupts() {
                    self.advance_time(entry_cycles);
                }
            }
            StepOutcome::Faulted { .. } => {}
        }
        outcome
    }

    /// Steps until the run signal becomes non-empty or `max_steps` is reached.
    ///
    /// [`RunSignal::LPM_CHANGED`] alone does not stop the loop; it is consumed
    /// here and the loop carries on in the new mode. With exactly
    /// [`RunSignal::SINGLE_STEP`] armed, one step runs and the bit is left set.
    pub fn run(&mut self, max_steps: u64) -> RunOutcome {
        if self.signal == RunSignal::SINGLE_STEP {
            self.signal.remove(RunSignal::SINGLE_STEP);
            self.step();
            self.signal.remove(RunSignal::LPM_CHANGED);
            self.signal.insert(RunSignal::SINGLE_STEP);
            return RunOutcome {
                steps: 1,
                signal: self.signal,
            };
        }

        let mut steps = 0;
        loop {
            while self.signal.is_empty() && steps < max_steps {
                self.step();
                steps += 1;
            }
            if !self.signal.contains(RunSignal::LPM_CHANGED) {
                break;
            }
            self.signal.remove(RunSignal::LPM_CHANGED);
            log::debug!("run loop continuing in {:?}", self.low_power_mode());
            if !self.signal.is_empty() || steps >= max_steps {
                break;
            }
        }

        RunOutcome {
            steps,
            signal: self.signal,
        }
    }

    fn step_active(&mut self) -> StepOutcome {
        self.regs.commit_next_pc();
        let saved = self.regs;

        match self.fetch_and_execute() {
            Ok(cycles) => {
                self.counters.instructions += 1;
                log::trace!("retired {:#06x} in {cycles} cycles", saved.pc());
                StepOutcome::Retired { cycles }
            }
            Err(cause) => {
                self.regs = saved;
                self.signal.insert(cause.signal());
                self.counters.faults += 1;
                if cause == FaultCode::IllegalInstruction {
                    self.log_illegal_instruction();
                }
                StepOutcome::Faulted { cause }
            }
        }
    }

    fn fetch_and_execute(&mut self) -> Result<u32, FaultCode> {
        let word = self.fetch_extension()?;
        let instruction = Decoder::decode(word)?;
        self.execute(instruction)
    }

    fn step_idle(&mut self) -> StepOutcome {
        self.counters.idle_ticks += 1;
        StepOutcome::Idle {
            cycles: self.config.idle_tick_cycles,
        }
    }

    /// Reports `cycles` to the clock, then advances every handler by the
    /// elapsed time it returns.
    fn advance_time(&mut self, cycles: u32) {
        let elapsed_ns = self.clock.advance(cycles);
        self.counters.cycles += u64::from(cycles);
        self.counters.elapsed_ns += elapsed_ns;

        let mut ctx = HandlerContext::new(&mut self.memory, &mut self.signal, &mut self.interrupts);
        self.dispatch.update_all(&mut ctx, cycles, elapsed_ns);
    }
}

#[cfg(test)]
mod tests {
    use crate::encoding::{encode_double, encode_jump, DoubleOp, JumpCondition};
    use crate::peripherals::MemoryRegion;
    use crate::state::status::SR_CPUOFF;
    use crate::{FaultCode, Machine, MachineBuilder, RunSignal, StepOutcome};

    fn machine(program: &[u16]) -> Machine {
        let mut m = MachineBuilder::new()
            .register(0x0200..=0x09FF, Box::new(MemoryRegion::ram()))
            .register(0xC000..=0xFFFF, Box::new(MemoryRegion::rom()))
            .build()
            .expect("disjoint regions");
        m.load_words(0xC000, program);
        m.write_word(0xFFFE, 0xC000);
        m.reset();
        m
    }

    #[test]
    fn illegal_word_faults_without_side_effects() {
        let mut m = machine(&[0x0000]);
        let before = *m.registers();
        assert_eq!(
            m.step(),
            StepOutcome::Faulted {
                cause: FaultCode::IllegalInstruction
            }
        );
        assert_eq!(*m.registers(), before);
        assert_eq!(m.signal(), RunSignal::ILLEGAL_INSTRUCTION);
        assert_eq!(m.counters().cycles, 0);
    }

    #[test]
    fn run_stops_after_max_steps() {
        let mut m = machine(&[encode_jump(JumpCondition::Jmp, -1)]);
        let outcome = m.run(10);
        assert_eq!(outcome.steps, 10);
        assert!(outcome.signal.is_empty());
        assert_eq!(m.counters().cycles, 20);
        assert_eq!(m.counters().elapsed_ns, 2_500);
    }

    #[test]
    fn host_stop_prevents_any_step() {
        let mut m = machine(&[encode_jump(JumpCondition::Jmp, -1)]);
        m.add_signal(RunSignal::HOST_STOP);
        assert_eq!(m.run(10).steps, 0);
    }

    #[test]
    fn single_step_runs_exactly_once_and_stays_armed() {
        let mut m = machine(&[
            encode_double(DoubleOp::Mov, 3, 1, false, 4, false),
            encode_double(DoubleOp::Mov, 3, 2, false, 4, false),
        ]);
        m.set_signal(RunSignal::SINGLE_STEP);

        let outcome = m.run(u64::MAX);
        assert_eq!(outcome.steps, 1);
        assert_eq!(outcome.signal, RunSignal::SINGLE_STEP);
        assert_eq!(m.register(4), 1);

        m.run(u64::MAX);
        assert_eq!(m.register(4), 2);
    }

    #[test]
    fn cpu_off_idles_without_fetching() {
        let mut m = machine(&[encode_double(DoubleOp::Bis, 0, 3, false, 2, false), SR_CPUOFF]);
        assert!(matches!(m.step(), StepOutcome::Retired { .. }));
        let pc = m.next_pc();

        for _ in 0..5 {
            assert_eq!(m.step(), StepOutcome::Idle { cycles: 1 });
        }
        assert_eq!(m.next_pc(), pc);
        assert_eq!(m.counters().idle_ticks, 5);
        assert_eq!(m.counters().instructions, 1);
    }
}
