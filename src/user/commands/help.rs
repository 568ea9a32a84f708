//! Help command - displays available commands and their usage.

use std::io::Write;

use crate::ShellResult;
use crate::user::registry::{all_commands, find_command};
use crate::user::{Command, CommandContext, Session};

/// Help command instance.
pub static HELP: HelpCommand = HelpCommand;

/// Help command implementation.
pub struct HelpCommand;

impl Command for HelpCommand {
    fn name(&self) -> &'static str {
        "help"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["?"]
    }

    fn description(&self) -> &'static str {
        "Show available commands or help for a specific command"
    }

    fn usage(&self) -> &'static str {
        "Usage: help [command]\n\
         \n\
         Without arguments: lists all available commands.\n\
         With a command name: shows detailed help for that command."
    }

    fn category(&self) -> &'static str {
        "general"
    }

    fn execute(&self, session: &mut Session, ctx: &CommandContext) -> ShellResult<()> {
        let out = session.out();
        if let Some(cmd_name) = ctx.args.get(0) {
            // Show help for specific command
            show_command_help(out, cmd_name)
        } else {
            // List all commands
            show_all_commands(out)
        }
    }
}

fn show_command_help(out: &mut dyn Write, name: &str) -> ShellResult<()> {
    let Some(cmd) = find_command(name) else {
        anyhow::bail!("Unknown command: {}. Type 'help' to see available commands.", name)
    };

    write!(out, "Command: {}", cmd.name())?;
    let aliases = cmd.aliases();
    if !aliases.is_empty() {
        write!(out, " (aliases: {})", aliases.join(", "))?;
    }
    writeln!(out)?;
    writeln!(out, "{}", cmd.usage())?;
    Ok(())
}

fn show_all_commands(out: &mut dyn Write) -> ShellResult<()> {
    writeln!(out, "Available commands:\n")?;

    let commands = all_commands();

    // Collect unique categories
    let mut categories: Vec<&'static str> = Vec::new();
    for cmd in commands {
        let cat = cmd.category();
        if !categories.contains(&cat) {
            categories.push(cat);
        }
    }

    // Sort categories (general first, then alphabetically)
    categories.sort_by(|a, b| match (*a, *b) {
        ("general", "general") => core::cmp::Ordering::Equal,
        ("general", _) => core::cmp::Ordering::Less,
        (_, "general") => core::cmp::Ordering::Greater,
        _ => a.cmp(b),
    });

    // Print commands by category
    for category in categories {
        writeln!(out, "[{}]", category)?;

        for cmd in commands.iter().filter(|cmd| cmd.category() == category) {
            writeln!(out, "  {:12} - {}", cmd.name(), cmd.description())?;
        }
        writeln!(out)?;
    }

    writeln!(out, "Type 'help <command>' for detailed usage.")?;
    Ok(())
}
