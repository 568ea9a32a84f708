//! HAL (Hardware Abstraction Layer) module.
//!
//! This module describes the halted Cortex-M core as the debugger sees it:
//! register names, the EXC_RETURN encoding, the live register snapshot and
//! the [`Target`] capability every other component reads through.

pub mod context;
pub mod exc_return;
pub mod regs;
pub mod target;

pub use context::LiveRegisters;
pub use exc_return::ExcReturn;
pub use regs::Reg;
pub use target::{Target, WORD_SIZE};
