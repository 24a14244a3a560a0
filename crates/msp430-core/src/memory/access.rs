//! Access widths, access kinds and the access-control observer seam.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use crate::RunSignal;

/// Operand width selected by an instruction's B/W bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    /// 8-bit access (`.B`).
    Byte,
    /// 16-bit access (`.W`).
    Word,
}

impl Width {
    /// Decodes the B/W bit (set = byte).
    #[must_use]
    pub const fn from_bw(byte: bool) -> Self {
        if byte {
            Self::Byte
        } else {
            Self::Word
        }
    }

    /// Value mask for this width.
    #[must_use]
    pub const fn mask(self) -> u16 {
        match self {
            Self::Byte => 0x00FF,
            Self::Word => 0xFFFF,
        }
    }

    /// Sign-bit mask for this width.
    #[must_use]
    pub const fn sign_bit(self) -> u16 {
        match self {
            Self::Byte => 0x0080,
            Self::Word => 0x8000,
        }
    }

    /// Post-increment step for `@Rn+` through a general register.
    #[must_use]
    pub const fn step(self) -> u16 {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
        }
    }
}

/// Kind of bus access reported to the access-control observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    /// Instruction or extension-word fetch.
    Fetch,
    /// Data read.
    Read,
    /// Data write.
    Write,
}

impl AccessKind {
    /// Run-signal bit raised when an access of this kind traps.
    #[must_use]
    pub const fn trap_signal(self) -> RunSignal {
        match self {
            Self::Fetch => RunSignal::TRAP_FETCH,
            Self::Read => RunSignal::TRAP_READ,
            Self::Write => RunSignal::TRAP_WRITE,
        }
    }
}

/// Breakpoint/watchpoint collaborator notified on every bus access.
pub trait AccessObserver {
    /// Returns `true` when the access should trap.
    fn on_access(&mut self, addr: u16, kind: AccessKind, width: Width) -> bool;
}

/// Returns `true` for addresses where word accesses are defined.
#[must_use]
pub const fn is_word_aligned(addr: u16) -> bool {
    addr & 1 == 0
}

/// Minimal address-set observer: fetch breakpoints plus read/write watch ranges.
#[derive(Debug, Clone, Default)]
pub struct WatchList {
    breakpoints: BTreeSet<u16>,
    read_watch: Vec<RangeInclusive<u16>>,
    write_watch: Vec<RangeInclusive<u16>>,
}

impl WatchList {
    /// Creates an empty watch list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Traps when an instruction word is fetched from `addr`.
    pub fn add_breakpoint(&mut self, addr: u16) {
        self.breakpoints.insert(addr);
    }

    /// Removes a fetch breakpoint; returns whether it existed.
    pub fn remove_breakpoint(&mut self, addr: u16) -> bool {
        self.breakpoints.remove(&addr)
    }

    /// Traps data reads touching `range`.
    pub fn watch_reads(&mut self, range: RangeInclusive<u16>) {
        self.read_watch.push(range);
    }

    /// Traps data writes touching `range`.
    pub fn watch_writes(&mut self, range: RangeInclusive<u16>) {
        self.write_watch.push(range);
    }

    fn touches(ranges: &[RangeInclusive<u16>], addr: u16, width: Width) -> bool {
        let last = match width {
            Width::Byte => addr,
            Width::Word => addr.wrapping_add(1),
        };
        ranges
            .iter()
            .any(|range| range.contains(&addr) || range.contains(&last))
    }
}

impl AccessObserver for WatchList {
    fn on_access(&mut self, addr: u16, kind: AccessKind, width: Width) -> bool {
        match kind {
            AccessKind::Fetch => self.breakpoints.contains(&addr),
            AccessKind::Read => Self::touches(&self.read_watch, addr, width),
            AccessKind::Write => Self::touches(&self.write_watch, addr, width),
        }
    }
}
