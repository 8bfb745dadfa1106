//! Guest memory interface
//!
//! Guest memory is little-endian. Sample sources are read through this trait
//! so the engine never touches raw host pointers.

/// Bounds-checked access to emulated memory.
pub trait GuestMemory {
    /// Whether `address` maps to readable guest memory.
    fn is_valid_address(&self, address: u32) -> bool;

    /// Borrow `len` bytes starting at `address`, or `None` if any part of the
    /// range is unmapped.
    fn slice(&self, address: u32, len: usize) -> Option<&[u8]>;

    /// Read a little-endian halfword. Unmapped reads return 0.
    fn read_u16(&self, address: u32) -> u16 {
        self.slice(address, 2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .unwrap_or(0)
    }
}

/// Whether the last byte of a `len`-byte block at `address` is mapped.
///
/// The address arithmetic is done in 64 bits so a block that would wrap the
/// 32-bit address space is rejected rather than aliased to low memory.
pub fn is_valid_range<M: GuestMemory + ?Sized>(memory: &M, address: u32, len: usize) -> bool {
    if len == 0 {
        return memory.is_valid_address(address);
    }
    let last = address as u64 + len as u64 - 1;
    u32::try_from(last).is_ok_and(|last| memory.is_valid_address(last))
}
