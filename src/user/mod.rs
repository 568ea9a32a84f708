//! User command system - Modular command architecture.
//!
//! This module provides the operator-facing commands of a debug session.
//!
//! # Architecture
//!
//! - `command.rs` - Defines the `Command` trait and execution context
//! - `registry.rs` - Static command registration and lookup
//! - `session.rs` - The attached target and context switcher commands act on
//! - `commands/` - Individual command implementations
//!
//! # Adding a New Command
//!
//! 1. Create a new file in `commands/` (e.g., `commands/mycommand.rs`)
//! 2. Define a struct and implement the `Command` trait
//! 3. Export a static instance: `pub static MYCOMMAND: MyCommand = MyCommand;`
//! 4. Add to `commands/mod.rs`: `pub mod mycommand;` and `pub use mycommand::MYCOMMAND;`
//! 5. Register in `registry.rs` COMMANDS array: `&commands::MYCOMMAND,`

pub mod command;
pub mod commands;
pub mod registry;
mod session;

pub use command::{Args, Command, CommandContext};
pub use registry::execute;
pub use session::Session;
