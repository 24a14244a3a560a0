//! Address-space dispatch table: sorted, non-overlapping ranges routed to peripheral handlers.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use crate::{FaultCode, InterruptController, MapError, RunSignal, RESET_PRIORITY};

/// View of core-owned state lent to a handler for the duration of one call.
pub struct HandlerContext<'a> {
    memory: &'a mut [u8],
    signal: &'a mut RunSignal,
    interrupts: &'a mut InterruptController,
    fault: Option<FaultCode>,
}

impl<'a> HandlerContext<'a> {
    /// Borrows the core state a handler may touch.
    pub fn new(
        memory: &'a mut [u8],
        signal: &'a mut RunSignal,
        interrupts: &'a mut InterruptController,
    ) -> Self {
        Self {
            memory,
            signal,
            interrupts,
            fault: None,
        }
    }

    /// Backing memory array of the whole address space.
    #[must_use]
    pub fn memory(&self) -> &[u8] {
        self.memory
    }

    /// Mutable backing memory array of the whole address space.
    pub fn memory_mut(&mut self) -> &mut [u8] {
        self.memory
    }

    /// Pends an interrupt at `priority`.
    pub fn raise_interrupt(&mut self, priority: u8) {
        self.interrupts.raise(priority);
    }

    /// Clears a pending interrupt at `priority`.
    pub fn clear_interrupt(&mut self, priority: u8) {
        self.interrupts.clear(priority);
    }

    /// Adds bits to the run signal.
    pub fn raise_signal(&mut self, bits: RunSignal) {
        self.signal.insert(bits);
    }

    /// Current run signal.
    #[must_use]
    pub fn signal(&self) -> RunSignal {
        *self.signal
    }

    /// Flags the access in flight as a bus error.
    pub fn raise_bus_error(&mut self) {
        self.signal.insert(RunSignal::BUS_ERROR);
        self.fault = Some(FaultCode::BusError);
    }

    /// Requests a full machine reset (e.g. watchdog password violation).
    pub fn request_reset(&mut self) {
        self.interrupts.raise(RESET_PRIORITY);
    }

    /// Takes the fault raised during this context's lifetime, if any.
    pub fn take_fault(&mut self) -> Option<FaultCode> {
        self.fault.take()
    }
}

/// Memory-mapped device owning one or more address ranges.
///
/// Word accessors default to two byte accesses with the least significant
/// byte at the lower address.
pub trait Peripheral {
    /// Reads one byte.
    fn read_byte(&mut self, ctx: &mut HandlerContext<'_>, addr: u16) -> u8;

    /// Writes one byte.
    fn write_byte(&mut self, ctx: &mut HandlerContext<'_>, addr: u16, value: u8);

    /// Reads one little-endian word.
    fn read_word(&mut self, ctx: &mut HandlerContext<'_>, addr: u16) -> u16 {
        let lo = self.read_byte(ctx, addr);
        let hi = self.read_byte(ctx, addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    /// Writes one little-endian word.
    fn write_word(&mut self, ctx: &mut HandlerContext<'_>, addr: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write_byte(ctx, addr, lo);
        self.write_byte(ctx, addr.wrapping_add(1), hi);
    }

    /// Advances internal state by the cycles the last step consumed.
    fn update(&mut self, _ctx: &mut HandlerContext<'_>, _cycles: u32, _elapsed_ns: u64) {}

    /// Returns the device to its power-on state.
    fn reset(&mut self, _ctx: &mut HandlerContext<'_>) {}

    /// Short name used in logs.
    fn name(&self) -> &str {
        "peripheral"
    }
}

/// Fallback handler for addresses nobody registered.
#[derive(Debug, Clone, Copy, Default)]
pub struct BusErrorHandler;

impl Peripheral for BusErrorHandler {
    fn read_byte(&mut self, ctx: &mut HandlerContext<'_>, addr: u16) -> u8 {
        log::error!("bus error: read from unmapped address {addr:#06x}");
        ctx.raise_bus_error();
        0
    }

    fn write_byte(&mut self, ctx: &mut HandlerContext<'_>, addr: u16, value: u8) {
        log::error!("bus error: write {value:#04x} to unmapped address {addr:#06x}");
        ctx.raise_bus_error();
    }

    fn read_word(&mut self, ctx: &mut HandlerContext<'_>, addr: u16) -> u16 {
        log::error!("bus error: word read from unmapped address {addr:#06x}");
        ctx.raise_bus_error();
        0
    }

    fn write_word(&mut self, ctx: &mut HandlerContext<'_>, addr: u16, value: u16) {
        log::error!("bus error: word write {value:#06x} to unmapped address {addr:#06x}");
        ctx.raise_bus_error();
    }

    fn name(&self) -> &str {
        "bus-error"
    }
}

/// Opaque id of a registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(usize);

impl HandlerId {
    /// Registration order index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// One registered address range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedRange {
    /// Inclusive start address.
    pub start: u16,
    /// Inclusive end address.
    pub end: u16,
    /// Owning handler.
    pub handler: HandlerId,
}

impl MappedRange {
    /// Returns `true` when `addr` falls inside this range.
    #[must_use]
    pub const fn contains(&self, addr: u16) -> bool {
        addr >= self.start && addr <= self.end
    }
}

/// Sorted range map from addresses to handlers.
pub struct DispatchTable {
    ranges: BTreeMap<u16, MappedRange>,
    handlers: Vec<Box<dyn Peripheral>>,
    bus_error: BusErrorHandler,
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchTable {
    /// Creates a table where every address resolves to the bus-error handler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ranges: BTreeMap::new(),
            handlers: Vec::new(),
            bus_error: BusErrorHandler,
        }
    }

    /// Registers `handler` for `range`.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Conflict`] when any address in `range` is already
    /// registered, or [`MapError::InvertedRange`] for an empty range.
    pub fn register(
        &mut self,
        range: RangeInclusive<u16>,
        handler: Box<dyn Peripheral>,
    ) -> Result<HandlerId, MapError> {
        let (start, end) = (*range.start(), *range.end());
        self.check_free(start, end)?;
        let id = HandlerId(self.handlers.len());
        self.handlers.push(handler);
        self.insert_range(start, end, id);
        Ok(id)
    }

    /// Maps an additional range onto an already registered handler.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::UnknownHandler`] for a foreign id, or the same
    /// range errors as [`DispatchTable::register`].
    pub fn alias(&mut self, range: RangeInclusive<u16>, id: HandlerId) -> Result<(), MapError> {
        if id.0 >= self.handlers.len() {
            return Err(MapError::UnknownHandler(id.0));
        }
        let (start, end) = (*range.start(), *range.end());
        self.check_free(start, end)?;
        self.insert_range(start, end, id);
        Ok(())
    }

    /// Atomically replaces the handler behind `id` for all of its ranges.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::UnknownHandler`] for a foreign id.
    pub fn swap(
        &mut self,
        id: HandlerId,
        handler: Box<dyn Peripheral>,
    ) -> Result<Box<dyn Peripheral>, MapError> {
        let slot = self
            .handlers
            .get_mut(id.0)
            .ok_or(MapError::UnknownHandler(id.0))?;
        log::debug!("swapping handler {} for {}", slot.name(), handler.name());
        Ok(std::mem::replace(slot, handler))
    }

    /// Finds the registered range covering `addr`.
    #[must_use]
    pub fn lookup(&self, addr: u16) -> Option<MappedRange> {
        self.ranges
            .range(..=addr)
            .next_back()
            .map(|(_, mapped)| *mapped)
            .filter(|mapped| mapped.contains(addr))
    }

    /// Registered ranges in ascending address order.
    pub fn ranges(&self) -> impl Iterator<Item = &MappedRange> {
        self.ranges.values()
    }

    /// Reads one byte through the owning handler.
    pub fn read_byte(&mut self, ctx: &mut HandlerContext<'_>, addr: u16) -> u8 {
        self.handler_for(addr).read_byte(ctx, addr)
    }

    /// Writes one byte through the owning handler.
    pub fn write_byte(&mut self, ctx: &mut HandlerContext<'_>, addr: u16, value: u8) {
        self.handler_for(addr).write_byte(ctx, addr, value);
    }

    /// Reads one word through the handler owning `addr`.
    ///
    /// When `addr + 1` belongs to another handler the word is split into two
    /// byte reads routed separately. If either byte is unmapped the whole
    /// access goes to the bus-error handler.
    pub fn read_word(&mut self, ctx: &mut HandlerContext<'_>, addr: u16) -> u16 {
        let high = addr.wrapping_add(1);
        match (self.owner(addr), self.owner(high)) {
            (lo, hi) if lo == hi => self.handler_for(addr).read_word(ctx, addr),
            (Some(_), Some(_)) => {
                log::debug!("word read at {addr:#06x} straddles two handlers");
                let lo = self.read_byte(ctx, addr);
                let hi = self.read_byte(ctx, high);
                u16::from_le_bytes([lo, hi])
            }
            _ => self.bus_error.read_word(ctx, addr),
        }
    }

    /// Writes one word through the handler owning `addr`.
    ///
    /// Routed like [`DispatchTable::read_word`]; a partly unmapped word
    /// writes neither byte.
    pub fn write_word(&mut self, ctx: &mut HandlerContext<'_>, addr: u16, value: u16) {
        let high = addr.wrapping_add(1);
        match (self.owner(addr), self.owner(high)) {
            (lo, hi) if lo == hi => self.handler_for(addr).write_word(ctx, addr, value),
            (Some(_), Some(_)) => {
                log::debug!("word write at {addr:#06x} straddles two handlers");
                let [lo, hi] = value.to_le_bytes();
                self.write_byte(ctx, addr, lo);
                self.write_byte(ctx, high, hi);
            }
            _ => self.bus_error.write_word(ctx, addr, value),
        }
    }

    /// Advances every registered handler.
    pub fn update_all(&mut self, ctx: &mut HandlerContext<'_>, cycles: u32, elapsed_ns: u64) {
        for handler in &mut self.handlers {
            handler.update(ctx, cycles, elapsed_ns);
        }
    }

    /// Resets every registered handler.
    pub fn reset_all(&mut self, ctx: &mut HandlerContext<'_>) {
        for handler in &mut self.handlers {
            handler.reset(ctx);
        }
    }

    fn owner(&self, addr: u16) -> Option<HandlerId> {
        self.lookup(addr).map(|mapped| mapped.handler)
    }

    fn handler_for(&mut self, addr: u16) -> &mut dyn Peripheral {
        match self.lookup(addr) {
            Some(mapped) => self.handlers[mapped.handler.0].as_mut(),
            None => &mut self.bus_error,
        }
    }

    fn check_free(&self, start: u16, end: u16) -> Result<(), MapError> {
        if start > end {
            return Err(MapError::InvertedRange { start, end });
        }
        // Ranges never overlap, so the last one starting at or before `end`
        // is the only candidate that can reach into `start..=end`.
        if let Some((_, existing)) = self.ranges.range(..=end).next_back() {
            if existing.end >= start {
                return Err(MapError::Conflict {
                    start,
                    end,
                    existing_start: existing.start,
                    existing_end: existing.end,
                });
            }
        }
        Ok(())
    }

    fn insert_range(&mut self, start: u16, end: u16, handler: HandlerId) {
        self.ranges.insert(
            start,
            MappedRange {
                start,
                end,
                handler,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{DispatchTable, HandlerContext, Peripheral};
    use crate::{FaultCode, InterruptController, MapError, RunSignal, ADDRESS_SPACE_BYTES};

    struct Latch {
        value: u8,
        label: &'static str,
    }

    impl Peripheral for Latch {
        fn read_byte(&mut self, _ctx: &mut HandlerContext<'_>, _addr: u16) -> u8 {
            self.value
        }

        fn write_byte(&mut self, _ctx: &mut HandlerContext<'_>, _addr: u16, value: u8) {
            self.value = value;
        }

        fn name(&self) -> &str {
            self.label
        }
    }

    fn latch(value: u8) -> Box<Latch> {
        Box::new(Latch {
            value,
            label: "latch",
        })
    }

    fn with_ctx<R>(f: impl FnOnce(&mut HandlerContext<'_>) -> R) -> (R, RunSignal) {
        let mut memory = vec![0; ADDRESS_SPACE_BYTES];
        let mut signal = RunSignal::empty();
        let mut interrupts = InterruptController::new();
        let result = {
            let mut ctx = HandlerContext::new(&mut memory, &mut signal, &mut interrupts);
            f(&mut ctx)
        };
        (result, signal)
    }

    #[test]
    fn overlapping_registration_is_rejected() {
        let mut table = DispatchTable::new();
        table.register(0x0200..=0x02FF, latch(0)).expect("free range");

        let err = table
            .register(0x0280..=0x0300, latch(0))
            .err()
            .expect("overlap must fail");
        assert_eq!(
            err,
            MapError::Conflict {
                start: 0x0280,
                end: 0x0300,
                existing_start: 0x0200,
                existing_end: 0x02FF,
            }
        );

        let below = table.register(0x0100..=0x0200, latch(0)).err();
        assert!(matches!(below, Some(MapError::Conflict { .. })));

        assert!(table.register(0x0100..=0x01FF, latch(0)).is_ok());
        assert!(table.register(0x0300..=0x03FF, latch(0)).is_ok());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut table = DispatchTable::new();
        #[allow(clippy::reversed_empty_ranges)]
        let err = table.register(0x0300..=0x0200, latch(0)).err();
        assert_eq!(
            err,
            Some(MapError::InvertedRange {
                start: 0x0300,
                end: 0x0200
            })
        );
    }

    #[test]
    fn lookup_respects_inclusive_bounds() {
        let mut table = DispatchTable::new();
        let id = table.register(0x0120..=0x0121, latch(0)).expect("free range");

        assert_eq!(table.lookup(0x0120).map(|r| r.handler), Some(id));
        assert_eq!(table.lookup(0x0121).map(|r| r.handler), Some(id));
        assert!(table.lookup(0x011F).is_none());
        assert!(table.lookup(0x0122).is_none());
    }

    #[test]
    fn alias_routes_second_range_to_same_handler() {
        let mut table = DispatchTable::new();
        let id = table.register(0x0056..=0x0058, latch(0x11)).expect("free");
        table.alias(0x0004..=0x0005, id).expect("free alias");

        let ((), _) = with_ctx(|ctx| table.write_byte(ctx, 0x0004, 0x5A));
        let (value, _) = with_ctx(|ctx| table.read_byte(ctx, 0x0057));
        assert_eq!(value, 0x5A);
    }

    #[test]
    fn unmapped_access_hits_bus_error_handler() {
        let mut table = DispatchTable::new();
        let ((value, fault), signal) = with_ctx(|ctx| {
            let value = table.read_word(ctx, 0x8000);
            (value, ctx.take_fault())
        });
        assert_eq!(value, 0);
        assert_eq!(fault, Some(FaultCode::BusError));
        assert!(signal.contains(RunSignal::BUS_ERROR));
    }

    #[test]
    fn swap_replaces_handler_for_all_ranges() {
        let mut table = DispatchTable::new();
        let id = table.register(0x1000..=0x10FF, latch(0xAA)).expect("free");
        table.alias(0x1100..=0x11FF, id).expect("free alias");

        let old = table.swap(id, latch(0xBB)).expect("known id");
        assert_eq!(old.name(), "latch");

        let ((lo, hi), _) = with_ctx(|ctx| (table.read_byte(ctx, 0x1000), table.read_byte(ctx, 0x1180)));
        assert_eq!((lo, hi), (0xBB, 0xBB));
    }

    #[test]
    fn default_word_access_is_little_endian() {
        struct Bytes([u8; 2]);
        impl Peripheral for Bytes {
            fn read_byte(&mut self, _ctx: &mut HandlerContext<'_>, addr: u16) -> u8 {
                self.0[usize::from(addr & 1)]
            }
            fn write_byte(&mut self, _ctx: &mut HandlerContext<'_>, addr: u16, value: u8) {
                self.0[usize::from(addr & 1)] = value;
            }
        }

        let mut table = DispatchTable::new();
        table
            .register(0x0200..=0x0201, Box::new(Bytes([0, 0])))
            .expect("free");
        let (word, _) = with_ctx(|ctx| {
            table.write_word(ctx, 0x0200, 0x1234);
            (table.read_byte(ctx, 0x0200), table.read_byte(ctx, 0x0201))
        });
        assert_eq!(word, (0x34, 0x12));
    }

    #[test]
    fn word_straddling_into_unmapped_space_faults() {
        let mut table = DispatchTable::new();
        table.register(0x0200..=0x09FF, latch(0x77)).expect("free");

        let ((value, fault), signal) = with_ctx(|ctx| {
            let value = table.read_word(ctx, 0x09FF);
            (value, ctx.take_fault())
        });
        assert_eq!(value, 0);
        assert_eq!(fault, Some(FaultCode::BusError));
        assert!(signal.contains(RunSignal::BUS_ERROR));

        let ((fault, kept), _) = with_ctx(|ctx| {
            table.write_word(ctx, 0x09FF, 0x1234);
            (ctx.take_fault(), table.read_byte(ctx, 0x09FF))
        });
        assert_eq!(fault, Some(FaultCode::BusError));
        assert_eq!(kept, 0x77);
    }

    #[test]
    fn word_straddling_two_handlers_reaches_both() {
        let mut table = DispatchTable::new();
        table.register(0x0100..=0x0100, latch(0x11)).expect("free");
        table.register(0x0101..=0x0101, latch(0x22)).expect("free");

        let ((before, after, fault), _) = with_ctx(|ctx| {
            let before = table.read_word(ctx, 0x0100);
            table.write_word(ctx, 0x0100, 0xBBAA);
            let after = (table.read_byte(ctx, 0x0100), table.read_byte(ctx, 0x0101));
            (before, after, ctx.take_fault())
        });
        assert_eq!(before, 0x2211);
        assert_eq!(after, (0xAA, 0xBB));
        assert_eq!(fault, None);
    }
}
