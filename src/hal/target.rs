//! Access to a halted target.

use memory_addr::{VirtAddr, va};

use super::Reg;
use crate::RtosResult;

/// Size of a target word in bytes.
pub const WORD_SIZE: usize = 4;

/// Debug access to a halted, single-core, little-endian 32-bit target.
///
/// Memory is only ever read. Registers are read and written. Backends that
/// need mutable state to perform a read (a socket, a probe) keep it behind
/// interior mutability so readers can share the target.
pub trait Target {
    /// Reads `buf.len()` bytes starting at `addr`.
    fn read_memory(&self, addr: VirtAddr, buf: &mut [u8]) -> RtosResult<()>;

    /// Reads a 32-bit register.
    fn read_register(&self, reg: Reg) -> RtosResult<u32>;

    /// Writes a 32-bit register.
    fn write_register(&mut self, reg: Reg, value: u32) -> RtosResult<()>;

    /// Reads one little-endian word.
    fn read_u32(&self, addr: VirtAddr) -> RtosResult<u32> {
        let mut buf = [0u8; WORD_SIZE];
        self.read_memory(addr, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Reads a target pointer.
    fn read_ptr(&self, addr: VirtAddr) -> RtosResult<VirtAddr> {
        self.read_u32(addr).map(word_to_addr)
    }
}

/// Turns a word read from the target into an address handle.
#[inline]
pub const fn word_to_addr(word: u32) -> VirtAddr {
    va!(word as usize)
}

/// Returns `base + offset`.
#[inline]
pub const fn offset(base: VirtAddr, offset: usize) -> VirtAddr {
    va!(base.as_usize() + offset)
}
