//! Target backends.
//!
//! Each backend implements [`crate::hal::Target`]:
//! - `gdb_remote` - a live target behind a gdbserver
//! - `memory` - a target image held in host memory

pub mod gdb_remote;
pub mod memory;

pub use gdb_remote::{GdbRemote, RegisterMap};
pub use memory::MemoryTarget;
