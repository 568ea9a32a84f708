//! Task inspection module.
//!
//! This module provides:
//! - Traversal of the scheduler's circular lists
//! - Task handles read lazily from their TCBs
//! - Task enumeration and lookup
//! - Simulated context switching on the halted core

mod list;
mod manager;
mod stack;
mod switch;
mod task;

pub use list::{ListIter, RtosList};
pub use manager::{KernelMap, TaskManager};
pub use stack::StackCursor;
pub use switch::{ContextSwitcher, SavedFrame};
pub use task::{Task, TaskStatus, decode_name};
