//! Cycle-accurate MSP430-class CPU core.
//!
//! A [`Machine`] owns the register file, the 64 KiB address space and the
//! dispatch table that routes every access to a registered [`Peripheral`].
//! Hosts drive it with [`Machine::step`] or [`Machine::run`] and steer it
//! through the [`RunSignal`].

/// Architectural CPU state model primitives.
pub mod state;
pub use state::{
    Flag, LowPowerMode, RegisterFile, RunSignal, StatusWord, StatusWrite, CG2, PC,
    REGISTER_COUNT, SP, SR,
};

/// Address space, access kinds and the handler dispatch table.
pub mod memory;
pub use memory::{
    is_word_aligned, new_address_space, read_u16_le, write_u16_le, AccessKind, AccessObserver,
    BusErrorHandler, DispatchTable, HandlerContext, HandlerId, MappedRange, Peripheral,
    WatchList, Width, ADDRESS_SPACE_BYTES,
};

/// Fault and construction error types.
pub mod fault;
pub use fault::{FaultCode, MapError};

/// Instruction formats, opcode tables and encoders.
pub mod encoding;
pub use encoding::{
    classify_format, encode_double, encode_jump, encode_single, DoubleOp, InstructionFormat,
    JumpCondition, SingleOp,
};

/// Instruction-word decoder.
pub mod decoder;
pub use decoder::{AddressingMode, DecodedInstruction, Decoder};

/// Operand resolution and extension-word fetch.
pub mod addressing;
pub use addressing::{Location, Operand, OperandKind};

/// Instruction cycle tables.
pub mod timing;
pub use timing::{
    double_operand_cycles, single_operand_cycles, DestinationClass, SingleClass, SingleColumn,
    SourceClass, INTERRUPT_ENTRY_CYCLES, JUMP_CYCLES, RESET_CYCLES, RETI_CYCLES,
};

/// ALU and instruction execution.
pub mod execute;
pub use execute::{AluResult, FlagsUpdate};

/// Pending-interrupt controller and vector table.
pub mod interrupt;
pub use interrupt::{
    vector_address, InterruptController, INTERRUPT_LEVELS, NMI_PRIORITY, RESET_PRIORITY,
    RESET_VECTOR, VECTOR_TABLE_START,
};

/// Host-facing configuration, clock seam, outcomes and snapshots.
pub mod api;
pub use api::{
    Clock, CoreConfig, CoreSnapshot, FixedClock, RunOutcome, SnapshotError, SnapshotVersion,
    StepOutcome, DEFAULT_MCLK_HZ,
};

/// Diagnostic counters and fault dumps.
pub mod diag;
pub use diag::{stack_dump, Counters, RegisterDump};

/// Machine context and builder.
pub mod machine;
pub use machine::{Machine, MachineBuilder};

/// Step and run loop.
mod run;

/// Built-in memory region handlers.
pub mod peripherals;
pub use peripherals::MemoryRegion;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
