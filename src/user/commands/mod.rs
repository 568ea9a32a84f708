//! Command implementations.
//!
//! Each command is defined in its own module file.

pub mod help;
pub mod regs;
pub mod restore;
pub mod system;
pub mod thread;
pub mod threads;

// Re-export command instances for registry
pub use help::HELP;
pub use regs::REGS;
pub use restore::RESTORE;
pub use system::EXIT;
pub use thread::THREAD;
pub use threads::THREADS;
