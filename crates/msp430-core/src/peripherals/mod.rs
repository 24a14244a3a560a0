//! Built-in handlers for plain memory regions.

/// RAM and read-only (flash/ROM) regions backed by the core's memory array.
pub mod memory_region;

pub use memory_region::MemoryRegion;
