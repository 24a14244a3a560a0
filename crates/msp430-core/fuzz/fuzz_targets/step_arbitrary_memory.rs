#![no_main]

use libfuzzer_sys::fuzz_target;
use msp430_core::{Decoder, MachineBuilder, MemoryRegion, StepOutcome, REGISTER_COUNT};

const RAM_END: u16 = 0x09FF;

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }

    let word = u16::from_le_bytes([data[0], data[1]]);
    let _ = Decoder::decode(word);

    // RAM low, arbitrary program high, a hole in between for bus errors.
    let Ok(mut machine) = MachineBuilder::new()
        .register(0x0000..=RAM_END, Box::new(MemoryRegion::ram()))
        .register(0xC000..=0xFFFF, Box::new(MemoryRegion::ram()))
        .build()
    else {
        return;
    };
    machine.load_image(0xC000, &data[2..]);
    machine.write_word(0xFFFE, 0xC000);
    machine.reset();
    machine.set_register(1, RAM_END + 1);
    machine.raise_interrupt(data[0] & 0x0F);

    for _ in 0..256 {
        machine.clear_signal();
        let before = *machine.registers();
        if let StepOutcome::Faulted { .. } = machine.step() {
            // Only the next-PC commit may survive a fault.
            assert_eq!(machine.pc(), before.next_pc());
            assert_eq!(machine.next_pc(), before.next_pc());
            for index in 1..REGISTER_COUNT {
                assert_eq!(machine.register(index), before.get(index));
            }
            assert!(!machine.signal().is_empty());
        }
    }
});
