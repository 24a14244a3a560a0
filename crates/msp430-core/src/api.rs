//! Public host-facing API: configuration, clock seam, step/run outcomes
//! and snapshots.

use thiserror::Error;

use crate::fault::FaultCode;
use crate::state::{RegisterFile, RunSignal};
use crate::ADDRESS_SPACE_BYTES;

/// Default main clock frequency.
pub const DEFAULT_MCLK_HZ: u32 = 8_000_000;

/// Top-level immutable configuration for a machine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CoreConfig {
    /// Main clock frequency used by the default [`FixedClock`].
    pub mclk_hz: u32,
    /// Cycles charged per idle tick while the CPU is off.
    pub idle_tick_cycles: u32,
    /// Stack words included in fault dumps.
    pub stack_dump_words: u16,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            mclk_hz: DEFAULT_MCLK_HZ,
            idle_tick_cycles: 1,
            stack_dump_words: 8,
        }
    }
}

/// Clock subsystem collaborator.
///
/// Told the cycle count of every instruction and idle tick; answers with the
/// simulated nanoseconds that elapsed.
pub trait Clock {
    /// Advances by `cycles` MCLK cycles and returns the elapsed nanoseconds.
    fn advance(&mut self, cycles: u32) -> u64;
}

/// Clock running MCLK at a fixed frequency.
///
/// Keeps the sub-nanosecond remainder so long runs do not drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct FixedClock {
    hz: u64,
    remainder: u64,
}

impl FixedClock {
    /// Creates a clock at `hz` (clamped to at least 1 Hz).
    #[must_use]
    pub fn new(hz: u32) -> Self {
        Self {
            hz: u64::from(hz.max(1)),
            remainder: 0,
        }
    }

    /// Clock frequency in hertz.
    #[must_use]
    pub const fn hz(&self) -> u64 {
        self.hz
    }
}

impl Clock for FixedClock {
    fn advance(&mut self, cycles: u32) -> u64 {
        let scaled = u64::from(cycles) * 1_000_000_000 + self.remainder;
        self.remainder = scaled % self.hz;
        scaled / self.hz
    }
}

/// Result of one [`crate::Machine::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepOutcome {
    /// An instruction retired.
    Retired {
        /// Instruction cycles, excluding any interrupt entry that followed.
        cycles: u32,
    },
    /// The CPU is off; time advanced without a fetch.
    Idle {
        /// Cycles charged for the idle tick.
        cycles: u32,
    },
    /// The instruction aborted with no architectural effect.
    Faulted {
        /// Reason for the abort.
        cause: FaultCode,
    },
}

/// Aggregated result of [`crate::Machine::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunOutcome {
    /// Steps (instructions or idle ticks) taken during this call.
    pub steps: u64,
    /// Run signal at the moment the loop stopped.
    pub signal: RunSignal,
}

/// Stable snapshot wire-version identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u16)]
pub enum SnapshotVersion {
    /// Register file plus the full 64 KiB backing memory.
    V1 = 1,
}

impl SnapshotVersion {
    /// Converts wire value to known snapshot version.
    #[must_use]
    pub const fn from_u16(version: u16) -> Option<Self> {
        match version {
            1 => Some(Self::V1),
            _ => None,
        }
    }
}

/// Pure value copy of the architectural state used for save/restore.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CoreSnapshot {
    /// Snapshot schema version.
    pub version: SnapshotVersion,
    /// Registers including the uncommitted next PC.
    pub registers: RegisterFile,
    /// Full backing memory array.
    pub memory: Box<[u8]>,
}

/// Rejected snapshot restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum SnapshotError {
    /// Memory image does not cover exactly the 64 KiB address space.
    #[error("snapshot memory is {actual} bytes, expected {expected}")]
    MemoryLength {
        /// Required length.
        expected: usize,
        /// Length found in the snapshot.
        actual: usize,
    },
}

impl CoreSnapshot {
    /// Checks that the snapshot can be restored.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::MemoryLength`] when the memory image is not
    /// exactly 64 KiB.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.memory.len() == ADDRESS_SPACE_BYTES {
            Ok(())
        } else {
            Err(SnapshotError::MemoryLength {
                expected: ADDRESS_SPACE_BYTES,
                actual: self.memory.len(),
            })
        }
    }
}
