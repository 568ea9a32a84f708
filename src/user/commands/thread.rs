//! Thread selection.

use anyhow::{Context, bail};

use crate::hal::Reg;
use crate::task::Task;
use crate::user::{Command, CommandContext, Session, registry};
use crate::ShellResult;

/// Thread command instance.
pub static THREAD: ThreadCommand = ThreadCommand;

pub struct ThreadCommand;

impl Command for ThreadCommand {
    fn name(&self) -> &'static str {
        "thread"
    }

    fn description(&self) -> &'static str {
        "Show or switch the task the debugger sees"
    }

    fn usage(&self) -> &'static str {
        "Usage: thread [id]\n\
         Usage: thread apply all <command...>\n\
         \n\
         Without arguments: reports the running task.\n\
         With an id: loads that task's saved registers into the core.\n\
         apply all: switches to every task in turn and runs <command>."
    }

    fn category(&self) -> &'static str {
        "tasks"
    }

    fn execute(&self, session: &mut Session, ctx: &CommandContext) -> ShellResult<()> {
        match (ctx.args.get(0), ctx.args.get(1)) {
            (None, _) => show_current(session),
            (Some("apply"), Some("all")) => apply_all(session, ctx.args.rest(2)),
            (Some("apply"), _) => bail!("Usage: thread apply all <command...>"),
            (Some(id), _) => {
                let number = id
                    .parse::<u32>()
                    .with_context(|| format!("Invalid thread id: {id}"))?;
                switch(session, number)
            }
        }
    }
}

fn show_current(session: &mut Session) -> ShellResult<()> {
    let current = {
        let tasks = session.tasks();
        match tasks.current_task()? {
            Some(task) => Some(task.display_name(&tasks)?),
            None => None,
        }
    };

    match current {
        Some(name) => writeln!(session.out(), "[Current thread is {name}]")?,
        None => writeln!(session.out(), "No current thread, the scheduler has not started.")?,
    }
    Ok(())
}

fn switch(session: &mut Session, number: u32) -> ShellResult<()> {
    let (task, name) = {
        let tasks = session.tasks();
        let task = tasks.find(number)?;
        (task, task.display_name(&tasks)?)
    };

    writeln!(session.out(), "[Switching to thread {name}]")?;
    select(session, task)?;
    print_frame(session)
}

fn apply_all(session: &mut Session, command: &str) -> ShellResult<()> {
    if command.is_empty() {
        return Ok(());
    }

    let targets = {
        let tasks = session.tasks();
        tasks
            .sorted_tasks()?
            .into_iter()
            .map(|task| -> ShellResult<_> { Ok((task, task.display_name(&tasks)?)) })
            .collect::<ShellResult<Vec<_>>>()?
    };

    for (task, name) in targets {
        writeln!(session.out(), "\nThread {name}:")?;
        select(session, task)?;
        registry::execute(session, command)?;
    }
    Ok(())
}

fn select(session: &mut Session, task: Task) -> ShellResult<()> {
    session
        .select(task)
        .with_context(|| format!("Failed to switch to task at {:#x}", task.tcb().as_usize()))?;
    Ok(())
}

/// Prints where the selected task resumes.
fn print_frame(session: &mut Session) -> ShellResult<()> {
    let target = session.target();
    let pc = target.read_register(Reg::PC)?;
    let lr = target.read_register(Reg::LR)?;
    let psp = target.read_register(Reg::Psp)?;
    writeln!(
        session.out(),
        "#0  pc {pc:#010x}  lr {lr:#010x}  psp {psp:#010x}"
    )?;
    Ok(())
}
