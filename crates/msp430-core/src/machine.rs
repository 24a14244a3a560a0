//! Machine context: owns registers, memory, dispatch table and run signal,
//! and exposes the host/debugger surface.

use std::ops::RangeInclusive;

use crate::api::{Clock, CoreConfig, CoreSnapshot, FixedClock, SnapshotError, SnapshotVersion};
use crate::diag::{stack_dump, Counters, RegisterDump};
use crate::fault::{FaultCode, MapError};
use crate::interrupt::{InterruptController, RESET_PRIORITY, RESET_VECTOR};
use crate::memory::{
    is_word_aligned, new_address_space, read_u16_le, write_u16_le, AccessKind, AccessObserver,
    DispatchTable, HandlerContext, HandlerId, Peripheral, Width,
};
use crate::state::{LowPowerMode, RegisterFile, RunSignal, StatusWord, PC, SR};

/// One simulated CPU with its address space and collaborators.
///
/// Machines share nothing with each other.
pub struct Machine {
    pub(crate) regs: RegisterFile,
    pub(crate) memory: Box<[u8]>,
    pub(crate) dispatch: DispatchTable,
    pub(crate) interrupts: InterruptController,
    pub(crate) signal: RunSignal,
    pub(crate) counters: Counters,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) config: CoreConfig,
    observer: Option<Box<dyn AccessObserver>>,
}

/// Staged construction of a [`Machine`].
///
/// Registration errors are kept and reported by [`MachineBuilder::build`].
pub struct MachineBuilder {
    config: CoreConfig,
    dispatch: DispatchTable,
    clock: Option<Box<dyn Clock>>,
    observer: Option<Box<dyn AccessObserver>>,
    error: Option<MapError>,
}

impl Default for MachineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MachineBuilder {
    /// Starts from the default configuration and an empty address map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: CoreConfig::default(),
            dispatch: DispatchTable::new(),
            clock: None,
            observer: None,
            error: None,
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn config(mut self, config: CoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Maps `handler` over `range`.
    #[must_use]
    pub fn register(mut self, range: RangeInclusive<u16>, handler: Box<dyn Peripheral>) -> Self {
        if self.error.is_none() {
            if let Err(err) = self.dispatch.register(range, handler) {
                self.error = Some(err);
            }
        }
        self
    }

    /// Uses `clock` instead of a [`FixedClock`] at `mclk_hz`.
    #[must_use]
    pub fn clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Installs an access-control observer.
    #[must_use]
    pub fn observer(mut self, observer: Box<dyn AccessObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Finishes construction.
    ///
    /// # Errors
    ///
    /// Returns the first [`MapError`] raised by [`MachineBuilder::register`].
    pub fn build(self) -> Result<Machine, MapError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let clock = self
            .clock
            .unwrap_or_else(|| Box::new(FixedClock::new(self.config.mclk_hz)));
        Ok(Machine {
            regs: RegisterFile::default(),
            memory: new_address_space(),
            dispatch: self.dispatch,
            interrupts: InterruptController::new(),
            signal: RunSignal::empty(),
            counters: Counters::default(),
            clock,
            config: self.config,
            observer: self.observer,
        })
    }
}

impl Machine {
    /// Machine with `config`, a fixed clock and nothing mapped.
    #[must_use]
    pub fn new(config: CoreConfig) -> Self {
        let clock = Box::new(FixedClock::new(config.mclk_hz));
        Self {
            regs: RegisterFile::default(),
            memory: new_address_space(),
            dispatch: DispatchTable::new(),
            interrupts: InterruptController::new(),
            signal: RunSignal::empty(),
            counters: Counters::default(),
            clock,
            config,
            observer: None,
        }
    }

    /// Maps `handler` over `range`.
    ///
    /// # Errors
    ///
    /// Returns [`MapError`] when the range overlaps an existing one or is
    /// inverted.
    pub fn register_handler(
        &mut self,
        range: RangeInclusive<u16>,
        handler: Box<dyn Peripheral>,
    ) -> Result<HandlerId, MapError> {
        self.dispatch.register(range, handler)
    }

    /// Maps another range onto an existing handler.
    ///
    /// # Errors
    ///
    /// Returns [`MapError`] for an unknown id or an unavailable range.
    pub fn alias_handler(
        &mut self,
        range: RangeInclusive<u16>,
        id: HandlerId,
    ) -> Result<(), MapError> {
        self.dispatch.alias(range, id)
    }

    /// Replaces the handler behind `id` for all of its ranges, returning the old one.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::UnknownHandler`] for a foreign id.
    pub fn swap_handler(
        &mut self,
        id: HandlerId,
        handler: Box<dyn Peripheral>,
    ) -> Result<Box<dyn Peripheral>, MapError> {
        self.dispatch.swap(id, handler)
    }

    /// Address map.
    #[must_use]
    pub const fn dispatch(&self) -> &DispatchTable {
        &self.dispatch
    }

    /// Installs or removes the access-control observer, returning the previous one.
    pub fn set_observer(
        &mut self,
        observer: Option<Box<dyn AccessObserver>>,
    ) -> Option<Box<dyn AccessObserver>> {
        std::mem::replace(&mut self.observer, observer)
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Running diagnostic totals.
    #[must_use]
    pub const fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Register file.
    #[must_use]
    pub const fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    /// Reads a register by index (`R0` is the current instruction's address).
    #[must_use]
    pub const fn register(&self, index: usize) -> u16 {
        self.regs.get(index)
    }

    /// Writes a register by index.
    ///
    /// `R0` moves both PC and next PC; `R2` goes through the full status-word
    /// path and may raise [`RunSignal::LPM_CHANGED`].
    pub fn set_register(&mut self, index: usize, value: u16) {
        match index & 0xF {
            PC => self.regs.jump_to(value),
            SR => self.write_status_register(value),
            other => self.regs.set(other, value),
        }
    }

    /// Address of the instruction last fetched.
    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.regs.pc()
    }

    /// Address of the next fetch.
    #[must_use]
    pub const fn next_pc(&self) -> u16 {
        self.regs.next_pc()
    }

    /// Redirects the next fetch.
    pub const fn set_next_pc(&mut self, value: u16) {
        self.regs.set_next_pc(value);
    }

    /// Status word.
    #[must_use]
    pub const fn status(&self) -> StatusWord {
        self.regs.status()
    }

    /// Low-power mode selected by the status word.
    #[must_use]
    pub const fn low_power_mode(&self) -> LowPowerMode {
        self.regs.status().low_power_mode()
    }

    /// Current run signal.
    #[must_use]
    pub const fn signal(&self) -> RunSignal {
        self.signal
    }

    /// Replaces the run signal.
    pub const fn set_signal(&mut self, signal: RunSignal) {
        self.signal = signal;
    }

    /// Adds bits to the run signal.
    pub fn add_signal(&mut self, bits: RunSignal) {
        self.signal.insert(bits);
    }

    /// Removes bits from the run signal.
    pub fn remove_signal(&mut self, bits: RunSignal) {
        self.signal.remove(bits);
    }

    /// Clears the run signal.
    pub fn clear_signal(&mut self) {
        self.signal = RunSignal::empty();
    }

    /// Pends an interrupt at `priority`.
    pub const fn raise_interrupt(&mut self, priority: u8) {
        self.interrupts.raise(priority);
    }

    /// Clears a pending interrupt at `priority`.
    pub const fn clear_interrupt(&mut self, priority: u8) {
        self.interrupts.clear(priority);
    }

    /// Pending-interrupt bits.
    #[must_use]
    pub const fn pending_interrupts(&self) -> u16 {
        self.interrupts.pending()
    }

    /// Reads one byte of backing memory, bypassing handlers and the observer.
    #[must_use]
    pub fn read_byte(&self, addr: u16) -> u8 {
        self.memory[usize::from(addr)]
    }

    /// Writes one byte of backing memory, bypassing handlers and the observer.
    pub fn write_byte(&mut self, addr: u16, value: u8) {
        self.memory[usize::from(addr)] = value;
    }

    /// Reads a little-endian word of backing memory.
    #[must_use]
    pub fn read_word(&self, addr: u16) -> u16 {
        read_u16_le(&self.memory, addr)
    }

    /// Writes a little-endian word of backing memory.
    pub fn write_word(&mut self, addr: u16, value: u16) {
        write_u16_le(&mut self.memory, addr, value);
    }

    /// Copies `image` into backing memory at `origin`, wrapping at the top.
    pub fn load_image(&mut self, origin: u16, image: &[u8]) {
        let mut addr = origin;
        for byte in image {
            self.memory[usize::from(addr)] = *byte;
            addr = addr.wrapping_add(1);
        }
    }

    /// Copies little-endian words into backing memory at `origin`.
    pub fn load_words(&mut self, origin: u16, words: &[u16]) {
        let mut addr = origin;
        for word in words {
            write_u16_le(&mut self.memory, addr, *word);
            addr = addr.wrapping_add(2);
        }
    }

    /// Value copy of registers and backing memory.
    #[must_use]
    pub fn snapshot(&self) -> CoreSnapshot {
        CoreSnapshot {
            version: SnapshotVersion::V1,
            registers: self.regs,
            memory: self.memory.clone(),
        }
    }

    /// Restores registers and backing memory from `snapshot`.
    ///
    /// Handlers, pending interrupts and the run signal are left as they are.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] when the memory image has the wrong size.
    pub fn restore(&mut self, snapshot: &CoreSnapshot) -> Result<(), SnapshotError> {
        snapshot.validate()?;
        self.regs = snapshot.registers;
        self.memory.copy_from_slice(&snapshot.memory);
        Ok(())
    }

    /// Full machine reset.
    ///
    /// Clears registers, pending interrupts and every run-signal bit except
    /// the host's own, resets every handler, then loads PC from the reset
    /// vector.
    pub fn reset(&mut self) {
        let previous = self.regs.status();
        self.regs = RegisterFile::default();
        self.interrupts.clear_all();
        self.signal &= RunSignal::HOST_STOP | RunSignal::SINGLE_STEP;

        {
            let mut ctx = HandlerContext::new(&mut self.memory, &mut self.signal, &mut self.interrupts);
            self.dispatch.reset_all(&mut ctx);
        }
        // A handler asking for reset from inside its own reset would loop.
        self.interrupts.clear(RESET_PRIORITY);

        let entry = read_u16_le(&self.memory, RESET_VECTOR);
        self.regs.jump_to(entry);
        self.counters.resets += 1;
        if previous.lpm_bits() != 0 {
            self.signal.insert(RunSignal::LPM_CHANGED);
        }
        log::debug!("reset: entry {entry:#06x}");
    }

    /// Full status-word write with low-power and GIE transition reporting.
    pub(crate) fn write_status_register(&mut self, value: u16) {
        let write = self.regs.write_status(value);
        if write.gie_changed() {
            log::trace!("gie -> {}", write.current.gie());
        }
        if write.lpm_changed() {
            log::debug!(
                "low-power mode {:?} -> {:?}",
                write.previous.low_power_mode(),
                write.current.low_power_mode()
            );
            self.signal.insert(RunSignal::LPM_CHANGED);
        }
    }

    /// Reads through the observer and dispatch table.
    pub(crate) fn bus_read(
        &mut self,
        addr: u16,
        width: Width,
        kind: AccessKind,
    ) -> Result<u16, FaultCode> {
        if let Some(observer) = self.observer.as_mut() {
            if observer.on_access(addr, kind, width) {
                self.signal.insert(kind.trap_signal());
                log::debug!("access trap: {kind:?} {width:?} at {addr:#06x}");
                return Err(FaultCode::AccessTrap);
            }
        }
        self.dispatch_read(addr, width, kind)
    }

    /// Reads through the dispatch table only; debugger watches never see it.
    pub(crate) fn dispatch_read(
        &mut self,
        addr: u16,
        width: Width,
        kind: AccessKind,
    ) -> Result<u16, FaultCode> {
        if width == Width::Word && !is_word_aligned(addr) {
            log::warn!("unaligned word {kind:?} at {addr:#06x}");
        }

        let mut ctx = HandlerContext::new(&mut self.memory, &mut self.signal, &mut self.interrupts);
        let value = match width {
            Width::Byte => u16::from(self.dispatch.read_byte(&mut ctx, addr)),
            Width::Word => self.dispatch.read_word(&mut ctx, addr),
        };
        match ctx.take_fault() {
            Some(fault) => {
                self.log_bus_fault(addr, kind);
                Err(fault)
            }
            None => Ok(value),
        }
    }

    /// Writes through the observer and dispatch table.
    ///
    /// A write trap raises its signal but lets the write land; only bus
    /// errors abort.
    pub(crate) fn bus_write(&mut self, addr: u16, width: Width, value: u16) -> Result<(), FaultCode> {
        if let Some(observer) = self.observer.as_mut() {
            if observer.on_access(addr, AccessKind::Write, width) {
                self.signal.insert(RunSignal::TRAP_WRITE);
                log::debug!("access trap: write {width:?} {value:#06x} at {addr:#06x}");
            }
        }
        if width == Width::Word && !is_word_aligned(addr) {
            log::warn!("unaligned word write at {addr:#06x}");
        }

        let mut ctx = HandlerContext::new(&mut self.memory, &mut self.signal, &mut self.interrupts);
        match width {
            Width::Byte => self.dispatch.write_byte(&mut ctx, addr, value.to_le_bytes()[0]),
            Width::Word => self.dispatch.write_word(&mut ctx, addr, value),
        }
        match ctx.take_fault() {
            Some(fault) => {
                self.log_bus_fault(addr, AccessKind::Write);
                Err(fault)
            }
            None => Ok(()),
        }
    }

    fn log_bus_fault(&self, addr: u16, kind: AccessKind) {
        let stack = stack_dump(&self.memory, self.regs.sp(), self.config.stack_dump_words);
        log::error!(
            "bus error: {kind:?} at {addr:#06x} while executing {:#06x}\n{}\nstack @{:#06x}: {stack:04x?}",
            self.regs.pc(),
            RegisterDump(&self.regs),
            self.regs.sp()
        );
    }

    pub(crate) fn log_illegal_instruction(&self) {
        log::error!(
            "illegal instruction {:#06x} at {:#06x}\n{}",
            self.read_word(self.regs.pc()),
            self.regs.pc(),
            RegisterDump(&self.regs)
        );
    }
}
