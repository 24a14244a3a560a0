//! Memory regions backed directly by the core's memory array.

use crate::memory::{read_u16_le, write_u16_le, HandlerContext, Peripheral};

/// RAM or read-only region reading and writing the core's backing store.
///
/// The read-only variant logs and drops every write, the way flash behaves
/// when its controller is not in program mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    writable: bool,
}

impl MemoryRegion {
    /// Read/write region.
    #[must_use]
    pub const fn ram() -> Self {
        Self { writable: true }
    }

    /// Read-only region; host image loads still reach it through raw access.
    #[must_use]
    pub const fn rom() -> Self {
        Self { writable: false }
    }

    /// Returns `true` for RAM.
    #[must_use]
    pub const fn is_writable(&self) -> bool {
        self.writable
    }
}

impl Peripheral for MemoryRegion {
    fn read_byte(&mut self, ctx: &mut HandlerContext<'_>, addr: u16) -> u8 {
        ctx.memory()[usize::from(addr)]
    }

    fn write_byte(&mut self, ctx: &mut HandlerContext<'_>, addr: u16, value: u8) {
        if self.writable {
            ctx.memory_mut()[usize::from(addr)] = value;
        } else {
            log::warn!("write {value:#04x} to read-only address {addr:#06x} ignored");
        }
    }

    fn read_word(&mut self, ctx: &mut HandlerContext<'_>, addr: u16) -> u16 {
        read_u16_le(ctx.memory(), addr)
    }

    fn write_word(&mut self, ctx: &mut HandlerContext<'_>, addr: u16, value: u16) {
        if self.writable {
            write_u16_le(ctx.memory_mut(), addr, value);
        } else {
            log::warn!("write {value:#06x} to read-only address {addr:#06x} ignored");
        }
    }

    fn name(&self) -> &str {
        if self.writable {
            "ram"
        } else {
            "rom"
        }
    }
}
