//! FreeRTOS task inspection for a halted Cortex-M target.
//!
//! Enumerates the scheduler's tasks from target memory and lets a debugger
//! look at any of them by replaying the register frame the context-switch
//! handler left on the task's stack, then return to the live context.

#[macro_use]
extern crate log;

pub mod config;
pub mod console;
pub mod drivers;
pub mod error;
pub mod hal;
pub mod symbols;
pub mod task;
pub mod user;

#[cfg(test)]
mod tests;

pub use error::{RtosError, RtosResult, ShellResult};
