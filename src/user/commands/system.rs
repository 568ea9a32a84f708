//! Session control.

use crate::ShellResult;
use crate::user::{Command, CommandContext, Session};

/// Exit command instance.
pub static EXIT: ExitCommand = ExitCommand;

/// Exit command implementation.
pub struct ExitCommand;

impl Command for ExitCommand {
    fn name(&self) -> &'static str {
        "exit"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["quit", "q"]
    }

    fn description(&self) -> &'static str {
        "Leave the session"
    }

    fn usage(&self) -> &'static str {
        "Usage: exit\n\
         Aliases: quit, q\n\
         \n\
         Restores the live context if a task frame is loaded, then exits."
    }

    fn category(&self) -> &'static str {
        "system"
    }

    fn execute(&self, session: &mut Session, _ctx: &CommandContext) -> ShellResult<()> {
        session.request_exit();
        Ok(())
    }
}
