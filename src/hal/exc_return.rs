//! EXC_RETURN decoding.

use bitflags::bitflags;

bitflags! {
    /// Bits of the EXC_RETURN value a Cortex-M exception handler returns
    /// through.
    ///
    /// The context-switch handler stacks this value as the task's link
    /// register, so the saved `lr` word tells how the rest of the frame is
    /// laid out.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExcReturn: u32 {
        /// SPSEL: return to the process stack.
        const PROCESS_STACK = 1 << 2;
        /// Return to thread mode.
        const THREAD_MODE = 1 << 3;
        /// FType: set for a basic frame, clear when an extended
        /// floating-point frame was stacked.
        const BASIC_FRAME = 1 << 4;

        const _ = !0;
    }
}

impl ExcReturn {
    /// Interprets a saved link register word.
    pub const fn from_lr(lr: u32) -> Self {
        Self::from_bits_retain(lr)
    }

    /// Returns true when `s16..=s31` were stacked after the link register.
    pub const fn has_extended_frame(self) -> bool {
        !self.contains(Self::BASIC_FRAME)
    }
}
