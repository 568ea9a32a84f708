//! Sequential reader over a saved register frame.

use memory_addr::VirtAddr;

use crate::RtosResult;
use crate::hal::target::{Target, WORD_SIZE, offset};

/// Pops words off a task stack, lowest address first.
///
/// The cursor only moves forward; a frame is read exactly once.
pub struct StackCursor<'a> {
    target: &'a dyn Target,
    pointer: VirtAddr,
}

impl<'a> StackCursor<'a> {
    pub fn new(target: &'a dyn Target, top: VirtAddr) -> Self {
        Self {
            target,
            pointer: top,
        }
    }

    /// Reads the word at the cursor and moves past it.
    pub fn pop(&mut self) -> RtosResult<u32> {
        let word = self.target.read_u32(self.pointer)?;
        self.pointer = offset(self.pointer, WORD_SIZE);
        Ok(word)
    }

    /// Pops `N` consecutive words.
    pub fn pop_array<const N: usize>(&mut self) -> RtosResult<[u32; N]> {
        let mut words = [0u32; N];
        for word in words.iter_mut() {
            *word = self.pop()?;
        }
        Ok(words)
    }

    /// Current address, not consumed.
    pub fn pointer(&self) -> VirtAddr {
        self.pointer
    }
}
