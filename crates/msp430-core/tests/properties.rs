//! Property coverage: ALU arithmetic against integer reference models, stack
//! round-trips, snapshot restore and fault precision over arbitrary code.

#![allow(clippy::cast_possible_wrap)]

mod common;

use bitflags as _;
use common::{machine, retire, RAM_END, RAM_START};
use log as _;
use msp430_core::{encode_double, encode_single, DoubleOp, SingleOp, StepOutcome};
use proptest::prelude::*;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

fn to_bcd(mut value: u16) -> u16 {
    let mut out = 0;
    for shift in [0, 4, 8, 12] {
        out |= (value % 10) << shift;
        value /= 10;
    }
    out
}

proptest! {
    #[test]
    fn add_matches_integer_model(a in any::<u16>(), b in any::<u16>()) {
        let mut m = machine(&[encode_double(DoubleOp::Add, 4, 0, false, 5, false)]);
        m.set_register(4, a);
        m.set_register(5, b);
        retire(&mut m);

        let (sum, carry) = b.overflowing_add(a);
        let status = m.status();
        prop_assert_eq!(m.register(5), sum);
        prop_assert_eq!(status.carry(), carry);
        prop_assert_eq!(status.zero(), sum == 0);
        prop_assert_eq!(status.negative(), (sum as i16) < 0);
        prop_assert_eq!(status.overflow(), (b as i16).checked_add(a as i16).is_none());
    }

    #[test]
    fn cmp_orders_like_integers(a in any::<u16>(), b in any::<u16>()) {
        let mut m = machine(&[encode_double(DoubleOp::Cmp, 4, 0, false, 5, false)]);
        m.set_register(4, a);
        m.set_register(5, b);
        retire(&mut m);

        let status = m.status();
        prop_assert_eq!(m.register(5), b);
        prop_assert_eq!(status.carry(), b >= a);
        prop_assert_eq!(status.zero(), a == b);
        prop_assert_eq!(status.negative() != status.overflow(), (b as i16) < (a as i16));
    }

    #[test]
    fn dadd_matches_decimal_sum(a in 0u16..10_000, b in 0u16..10_000) {
        let mut m = machine(&[encode_double(DoubleOp::Dadd, 4, 0, false, 5, false)]);
        m.set_register(4, to_bcd(a));
        m.set_register(5, to_bcd(b));
        retire(&mut m);

        prop_assert_eq!(m.register(5), to_bcd((a + b) % 10_000));
        prop_assert_eq!(m.status().carry(), a + b >= 10_000);
    }

    #[test]
    fn push_then_pop_round_trips(value in any::<u16>(), slot in 2u16..=((RAM_END - RAM_START) / 2)) {
        let sp = RAM_START + slot * 2;
        let mut m = machine(&[
            encode_single(SingleOp::Push, 0, false, 4),
            encode_double(DoubleOp::Mov, 1, 3, false, 5, false),
        ]);
        m.set_register(1, sp);
        m.set_register(4, value);

        retire(&mut m);
        prop_assert_eq!(m.register(1), sp - 2);
        retire(&mut m);
        prop_assert_eq!(m.register(5), value);
        prop_assert_eq!(m.register(1), sp);
    }

    #[test]
    fn restore_returns_to_snapshot(
        regs in prop::array::uniform16(any::<u16>()),
        addr in RAM_START..=RAM_END,
        byte in any::<u8>(),
    ) {
        let mut m = machine(&[]);
        for (index, value) in regs.iter().enumerate().skip(3) {
            m.set_register(index, *value);
        }
        m.write_byte(addr, byte);
        let snapshot = m.snapshot();

        for index in 3..16 {
            m.set_register(index, 0);
        }
        m.write_byte(addr, byte.wrapping_add(1));
        m.restore(&snapshot).expect("snapshot of the same machine");

        prop_assert_eq!(*m.registers(), snapshot.registers);
        prop_assert_eq!(m.read_byte(addr), byte);
    }

    #[test]
    fn faulted_steps_leave_no_trace(
        code in prop::collection::vec(any::<u16>(), 1..=6),
        regs in prop::array::uniform16(any::<u16>()),
    ) {
        let mut m = machine(&code);
        for (index, value) in regs.iter().enumerate().skip(4) {
            m.set_register(index, *value);
        }
        m.set_register(1, regs[1]);

        for _ in 0..code.len() {
            let before_regs = *m.registers();
            let before_memory = m.snapshot().memory;
            let before_cycles = m.counters().cycles;

            if let StepOutcome::Faulted { .. } = m.step() {
                prop_assert_eq!(m.pc(), before_regs.next_pc());
                prop_assert_eq!(m.next_pc(), before_regs.next_pc());
                for index in 1..16 {
                    prop_assert_eq!(m.register(index), before_regs.get(index));
                }
                prop_assert_eq!(m.counters().cycles, before_cycles);
                prop_assert!(m.snapshot().memory == before_memory);
                break;
            }
        }
    }
}

#[test]
fn to_bcd_packs_digits() {
    assert_eq!(to_bcd(1234), 0x1234);
    assert_eq!(to_bcd(9), 0x0009);
}
