//! Register dump.

use anyhow::anyhow;

use crate::ShellResult;
use crate::hal::Reg;
use crate::user::{Command, CommandContext, Session};

/// Regs command instance.
pub static REGS: RegsCommand = RegsCommand;

pub struct RegsCommand;

impl Command for RegsCommand {
    fn name(&self) -> &'static str {
        "regs"
    }

    fn description(&self) -> &'static str {
        "Print the core registers as the debugger sees them"
    }

    fn usage(&self) -> &'static str {
        "Usage: regs [fp | <register>...]\n\
         \n\
         Prints r0-r15, xpsr, msp and psp. With 'fp', also prints s16-s31\n\
         and fpscr. Register names select what to print, e.g. 'regs pc psp'."
    }

    fn category(&self) -> &'static str {
        "tasks"
    }

    fn execute(&self, session: &mut Session, ctx: &CommandContext) -> ShellResult<()> {
        let regs: Vec<Reg> = match ctx.args.get(0) {
            None => Reg::core().chain([Reg::Xpsr, Reg::Msp, Reg::Psp]).collect(),
            Some("fp") => Reg::core()
                .chain([Reg::Xpsr, Reg::Msp, Reg::Psp])
                .chain(Reg::fp_callee_saved())
                .chain([Reg::Fpscr])
                .collect(),
            Some(_) => ctx
                .args
                .iter()
                .map(|name| name.parse::<Reg>().map_err(|e| anyhow!(e)))
                .collect::<ShellResult<_>>()?,
        };

        let values = regs
            .iter()
            .map(|&reg| session.target().read_register(reg))
            .collect::<Result<Vec<_>, _>>()?;

        let out = session.out();
        for (reg, value) in regs.iter().zip(values) {
            writeln!(out, "{:<6}{:#010x}", reg.to_string(), value)?;
        }
        Ok(())
    }
}
