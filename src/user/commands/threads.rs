//! Task listing.

use crate::ShellResult;
use crate::user::{Command, CommandContext, Session};

/// Threads command instance.
pub static THREADS: ThreadsCommand = ThreadsCommand;

pub struct ThreadsCommand;

impl Command for ThreadsCommand {
    fn name(&self) -> &'static str {
        "threads"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["list-tasks", "info-threads"]
    }

    fn description(&self) -> &'static str {
        "List all FreeRTOS tasks"
    }

    fn usage(&self) -> &'static str {
        "Usage: threads\n\
         Aliases: list-tasks, info-threads\n\
         \n\
         Lists every task found in the delayed and ready lists, sorted by\n\
         task number, with its name, status and priority."
    }

    fn category(&self) -> &'static str {
        "tasks"
    }

    fn execute(&self, session: &mut Session, _ctx: &CommandContext) -> ShellResult<()> {
        let mut rows = Vec::new();
        {
            let tasks = session.tasks();
            for task in tasks.sorted_tasks()? {
                rows.push(format!(
                    "  {:>2} {:<16} {:<7} {:>8}",
                    task.number(&tasks)?,
                    task.name(&tasks)?,
                    task.status(&tasks)?,
                    task.priority(&tasks)?
                ));
            }
        }

        let out = session.out();
        writeln!(out, "  Id Name             Status  Priority")?;
        writeln!(out, "  {}", "-".repeat(36))?;
        for row in rows {
            writeln!(out, "{row}")?;
        }
        Ok(())
    }
}
