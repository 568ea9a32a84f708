//! In-memory target backend.
//!
//! Holds a sparse byte image and a register file. Backs the scenario tests
//! in place of a live gdbserver.

use std::collections::BTreeMap;

use memory_addr::VirtAddr;

use crate::hal::{Reg, Target};
use crate::{RtosError, RtosResult};

/// A target whose memory and registers live in the host process.
#[derive(Debug, Default, Clone)]
pub struct MemoryTarget {
    memory: BTreeMap<usize, u8>,
    registers: BTreeMap<Reg, u32>,
    read_only: Vec<Reg>,
}

impl MemoryTarget {
    /// Creates an empty target: no mapped memory, no registers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `bytes` at `addr`, replacing what was there.
    pub fn write_bytes(&mut self, addr: usize, bytes: &[u8]) {
        for (i, &b) in bytes.iter().enumerate() {
            self.memory.insert(addr + i, b);
        }
    }

    /// Maps one little-endian word at `addr`.
    pub fn write_u32(&mut self, addr: usize, value: u32) {
        self.write_bytes(addr, &value.to_le_bytes());
    }

    /// Maps consecutive words starting at `addr`.
    pub fn write_words(&mut self, addr: usize, words: &[u32]) {
        for (i, &w) in words.iter().enumerate() {
            self.write_u32(addr + i * 4, w);
        }
    }

    /// Removes `len` bytes at `addr` from the image.
    pub fn unmap(&mut self, addr: usize, len: usize) {
        for a in addr..addr + len {
            self.memory.remove(&a);
        }
    }

    /// Sets a register value directly.
    pub fn set_register(&mut self, reg: Reg, value: u32) {
        self.registers.insert(reg, value);
    }

    /// Returns a register value, if the register exists.
    pub fn register(&self, reg: Reg) -> Option<u32> {
        self.registers.get(&reg).copied()
    }

    /// Returns the whole register file.
    pub fn registers(&self) -> &BTreeMap<Reg, u32> {
        &self.registers
    }

    /// Makes writes to `reg` fail, as a probe refusing the access would.
    pub fn reject_writes(&mut self, reg: Reg) {
        self.read_only.push(reg);
    }
}

impl Target for MemoryTarget {
    fn read_memory(&self, addr: VirtAddr, buf: &mut [u8]) -> RtosResult<()> {
        let base = addr.as_usize();
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = *self
                .memory
                .get(&(base + i))
                .ok_or(RtosError::MemoryRead { addr: base + i })?;
        }
        Ok(())
    }

    fn read_register(&self, reg: Reg) -> RtosResult<u32> {
        self.register(reg).ok_or(RtosError::RegisterAccess { reg })
    }

    fn write_register(&mut self, reg: Reg, value: u32) -> RtosResult<()> {
        if self.read_only.contains(&reg) || !self.registers.contains_key(&reg) {
            return Err(RtosError::RegisterAccess { reg });
        }
        self.registers.insert(reg, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory_addr::va;

    #[test]
    fn test_word_access() {
        let mut target = MemoryTarget::new();
        target.write_words(0x2000_0000, &[0x1122_3344, 0xdead_beef]);
        assert_eq!(target.read_u32(va!(0x2000_0000)).unwrap(), 0x1122_3344);
        assert_eq!(target.read_u32(va!(0x2000_0004)).unwrap(), 0xdead_beef);
        assert_eq!(target.read_ptr(va!(0x2000_0004)).unwrap(), va!(0xdead_beef));
    }

    #[test]
    fn test_unmapped_read_fails() {
        let mut target = MemoryTarget::new();
        target.write_bytes(0x100, &[1, 2]);
        match target.read_u32(va!(0x100)) {
            Err(RtosError::MemoryRead { addr }) => assert_eq!(addr, 0x102),
            other => panic!("unexpected result: {other:?}"),
        }
        target.write_u32(0x200, 7);
        target.unmap(0x200, 4);
        assert!(target.read_u32(va!(0x200)).is_err());
    }

    #[test]
    fn test_register_writes() {
        let mut target = MemoryTarget::new();
        assert!(target.write_register(Reg::R(0), 1).is_err());
        target.set_register(Reg::R(0), 0);
        target.write_register(Reg::R(0), 5).unwrap();
        assert_eq!(target.read_register(Reg::R(0)).unwrap(), 5);

        target.reject_writes(Reg::R(0));
        assert!(target.write_register(Reg::R(0), 6).is_err());
        assert_eq!(target.register(Reg::R(0)), Some(5));
    }
}
