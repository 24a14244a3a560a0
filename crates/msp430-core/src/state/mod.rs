//! Architectural CPU state: register file, status word and run signal.

/// Register file with the uncommitted next-PC latch.
pub mod registers;
/// Run-signal bitmask polled by the run loop.
pub mod run_signal;
/// Status-word (`R2`) field accessors and low-power mode decoding.
pub mod status;

pub use registers::{RegisterFile, StatusWrite, CG2, PC, REGISTER_COUNT, SP, SR};
pub use run_signal::RunSignal;
pub use status::{Flag, LowPowerMode, StatusWord};
