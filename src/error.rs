//! Unified error types for rtos-switch.
//!
//! The inspection engine reports failures through [`RtosError`], a closed set
//! of kinds the command surface can match on. Commands themselves use anyhow
//! for flexible error handling; every command returns `ShellResult<T>`.
//!
//! ## Usage Examples
//!
//! Creating errors in a command:
//! ```ignore
//! anyhow::bail!("Invalid thread id: {}", arg);
//! ```
//!
//! Adding context:
//! ```ignore
//! session.restore()
//!     .context("Failed to restore the live context")?;
//! ```
//!
//! Matching an engine error that went through anyhow:
//! ```ignore
//! if let Some(RtosError::NotFound(id)) = err.downcast_ref::<RtosError>() { .. }
//! ```

use crate::hal::Reg;

/// Failures of the task-inspection and context-replay engine.
#[derive(thiserror::Error, Debug)]
pub enum RtosError {
    /// A frame replay was requested for the task that is already running.
    #[error("cannot replay a frame for the task that is already live")]
    InvalidOperation,
    /// No enumerated task carries this number.
    #[error("unknown thread {0}")]
    NotFound(u32),
    /// A word could not be read from target memory.
    #[error("cannot read target memory at {addr:#010x}")]
    MemoryRead { addr: usize },
    /// A second frame replay was attempted without restoring the live state.
    #[error("precondition violated: {0}")]
    Precondition(&'static str),
    /// A register could not be read or written.
    #[error("register {reg} is not accessible")]
    RegisterAccess { reg: Reg },
    /// A scheduler list does not close back on its sentinel.
    #[error("task list at {list:#010x} is inconsistent")]
    CorruptList { list: usize },
    #[error("symbol: {0}")]
    Symbol(String),
    #[error("remote: {0}")]
    Remote(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type of the inspection engine.
pub type RtosResult<T> = Result<T, RtosError>;

/// Result type alias using anyhow::Error, used by commands and the binary.
pub type ShellResult<T> = anyhow::Result<T>;
