//! Address space backing store and the dispatch layer routing every access.

/// Access widths, kinds and the access-control observer seam.
pub mod access;
/// Range map from addresses to peripheral handlers.
pub mod map;

pub use access::{is_word_aligned, AccessKind, AccessObserver, WatchList, Width};
pub use map::{
    BusErrorHandler, DispatchTable, HandlerContext, HandlerId, MappedRange, Peripheral,
};

/// Size in bytes of the flat address space (64 KiB).
pub const ADDRESS_SPACE_BYTES: usize = u16::MAX as usize + 1;

/// Allocates a zeroed 64 KiB backing store.
#[must_use]
pub fn new_address_space() -> Box<[u8]> {
    vec![0; ADDRESS_SPACE_BYTES].into_boxed_slice()
}

/// Reads a little-endian word straight from a backing store.
#[must_use]
pub fn read_u16_le(memory: &[u8], addr: u16) -> u16 {
    let lo = memory[usize::from(addr)];
    let hi = memory[usize::from(addr.wrapping_add(1))];
    u16::from_le_bytes([lo, hi])
}

/// Writes a little-endian word straight into a backing store.
pub fn write_u16_le(memory: &mut [u8], addr: u16, value: u16) {
    let [lo, hi] = value.to_le_bytes();
    memory[usize::from(addr)] = lo;
    memory[usize::from(addr.wrapping_add(1))] = hi;
}

#[cfg(test)]
mod tests {
    use super::{new_address_space, read_u16_le, write_u16_le, ADDRESS_SPACE_BYTES};

    #[test]
    fn backing_store_size_is_64kib() {
        let memory = new_address_space();
        assert_eq!(memory.len(), ADDRESS_SPACE_BYTES);
        assert!(memory.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn raw_words_are_little_endian() {
        let mut memory = new_address_space();
        write_u16_le(&mut memory, 0x0200, 0xBEEF);
        assert_eq!(memory[0x0200], 0xEF);
        assert_eq!(memory[0x0201], 0xBE);
        assert_eq!(read_u16_le(&memory, 0x0200), 0xBEEF);
    }

    #[test]
    fn raw_word_at_top_of_space_wraps() {
        let mut memory = new_address_space();
        write_u16_le(&mut memory, 0xFFFF, 0x1234);
        assert_eq!(memory[0xFFFF], 0x34);
        assert_eq!(memory[0x0000], 0x12);
    }
}
