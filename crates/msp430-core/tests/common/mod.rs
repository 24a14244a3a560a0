//! Shared fixture: RAM low, ROM high, reset vector pointing at the ROM base.

#![allow(dead_code)]

use msp430_core::{Machine, MachineBuilder, MemoryRegion, Peripheral, StepOutcome};

pub const RAM_START: u16 = 0x0200;
pub const RAM_END: u16 = 0x09FF;
pub const ROM_START: u16 = 0xC000;
pub const STACK_TOP: u16 = RAM_END + 1;

pub fn builder() -> MachineBuilder {
    MachineBuilder::new()
        .register(RAM_START..=RAM_END, Box::new(MemoryRegion::ram()))
        .register(ROM_START..=0xFFFF, Box::new(MemoryRegion::rom()))
}

/// Loads `program` at the ROM base, resets, and sets SP to the top of RAM.
pub fn boot(mut machine: Machine, program: &[u16]) -> Machine {
    machine.load_words(ROM_START, program);
    machine.write_word(0xFFFE, ROM_START);
    machine.reset();
    machine.set_register(1, STACK_TOP);
    machine
}

pub fn machine(program: &[u16]) -> Machine {
    boot(builder().build().expect("disjoint regions"), program)
}

pub fn machine_with(
    program: &[u16],
    extra: Vec<(std::ops::RangeInclusive<u16>, Box<dyn Peripheral>)>,
) -> Machine {
    let mut builder = builder();
    for (range, handler) in extra {
        builder = builder.register(range, handler);
    }
    boot(builder.build().expect("disjoint regions"), program)
}

/// Steps once, expecting a retired instruction; returns its cycles.
pub fn retire(machine: &mut Machine) -> u32 {
    match machine.step() {
        StepOutcome::Retired { cycles } => cycles,
        other => panic!("expected a retired instruction, got {other:?}"),
    }
}
