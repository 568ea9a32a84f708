//! Command registry - static command registration and lookup.

use crate::ShellResult;
use crate::user::Session;
use crate::user::command::{Command, CommandContext};
use crate::user::commands;

/// Static array of all registered commands.
///
/// To add a new command:
/// 1. Create a new file in `commands/` directory
/// 2. Implement the `Command` trait
/// 3. Export a static instance
/// 4. Add it to this array
static COMMANDS: &[&dyn Command] = &[
    &commands::HELP,
    &commands::THREADS,
    &commands::THREAD,
    &commands::REGS,
    &commands::RESTORE,
    &commands::EXIT,
];

/// Find a command by name or alias.
pub fn find_command(name: &str) -> Option<&'static dyn Command> {
    COMMANDS
        .iter()
        .copied()
        .find(|cmd| cmd.name() == name || cmd.aliases().contains(&name))
}

/// Get all registered commands.
pub fn all_commands() -> &'static [&'static dyn Command] {
    COMMANDS
}

/// Execute a command line.
///
/// Parses the input, finds the matching command, and executes it. A blank
/// line does nothing.
pub fn execute(session: &mut Session, line: &str) -> ShellResult<()> {
    let Some(ctx) = CommandContext::parse(line) else {
        return Ok(());
    };

    match find_command(ctx.command) {
        Some(cmd) => {
            debug!("execute {:?}", ctx.raw);
            cmd.execute(session, &ctx)
        }
        None => anyhow::bail!(
            "Unknown command: {}. Type 'help' to see available commands.",
            ctx.command
        ),
    }
}
