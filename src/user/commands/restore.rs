//! Return to the live context.

use anyhow::Context;

use crate::ShellResult;
use crate::user::{Command, CommandContext, Session};

/// Restore command instance.
pub static RESTORE: RestoreCommand = RestoreCommand;

pub struct RestoreCommand;

impl Command for RestoreCommand {
    fn name(&self) -> &'static str {
        "restore"
    }

    fn description(&self) -> &'static str {
        "Write the registers captured at attach time back to the core"
    }

    fn category(&self) -> &'static str {
        "tasks"
    }

    fn execute(&self, session: &mut Session, _ctx: &CommandContext) -> ShellResult<()> {
        let had_replay = session.switcher().replayed().is_some();
        session
            .restore()
            .context("Failed to restore the live context")?;

        if had_replay {
            writeln!(session.out(), "Live context restored.")?;
        } else {
            writeln!(session.out(), "Live context already loaded.")?;
        }
        Ok(())
    }
}
