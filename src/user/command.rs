//! Command trait and context definitions.

use crate::ShellResult;
use crate::user::Session;

/// Parsed command arguments.
pub struct Args<'a> {
    /// Everything after the command name.
    raw: &'a str,
    args: Vec<&'a str>,
}

impl<'a> Args<'a> {
    /// Splits `raw` on whitespace.
    pub fn new(raw: &'a str) -> Self {
        Self {
            raw,
            args: raw.split_whitespace().collect(),
        }
    }

    /// Get argument at index (0 is first argument after command name).
    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.args.get(index).copied()
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Check if no arguments.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Iterate over arguments.
    pub fn iter(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.args.iter().copied()
    }

    /// Raw text following the first `skip` arguments, spacing preserved.
    pub fn rest(&self, skip: usize) -> &'a str {
        let mut rest = self.raw.trim_start();
        for _ in 0..skip {
            rest = match rest.find(char::is_whitespace) {
                Some(end) => rest[end..].trim_start(),
                None => "",
            };
        }
        rest.trim_end()
    }
}

/// Command execution context.
pub struct CommandContext<'a> {
    /// The original raw input line.
    pub raw: &'a str,
    /// The command name that was invoked.
    pub command: &'a str,
    /// Parsed arguments (excluding command name).
    pub args: Args<'a>,
}

impl<'a> CommandContext<'a> {
    /// Create a new command context by parsing a line.
    pub fn parse(line: &'a str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (command, args_raw) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest),
            None => (line, ""),
        };

        Some(Self {
            raw: line,
            command,
            args: Args::new(args_raw),
        })
    }
}

/// Trait for implementing commands.
///
/// Commands are registered statically and looked up by name or alias.
pub trait Command: Sync {
    /// Primary command name.
    fn name(&self) -> &'static str;

    /// Alternative names for this command.
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// Short description (shown in help list).
    fn description(&self) -> &'static str;

    /// Detailed usage information (shown in `help <command>`).
    fn usage(&self) -> &'static str {
        self.description()
    }

    /// Command category for grouping in help.
    fn category(&self) -> &'static str {
        "general"
    }

    /// Execute the command against the debug session.
    fn execute(&self, session: &mut Session, ctx: &CommandContext) -> ShellResult<()>;
}
