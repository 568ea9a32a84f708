//! rtos-switch - FreeRTOS task inspector for a halted Cortex-M target.
//!
//! Usage:
//!   rtos-switch --elf firmware.elf --remote localhost:3333            # prompt
//!   rtos-switch --elf firmware.elf --remote localhost:3333 threads    # one command
//!   rtos-switch --elf firmware.elf --remote localhost:3333 thread apply all regs

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process::exit;

use anyhow::Context;
use clap::Parser;

use rtos_switch::ShellResult;
use rtos_switch::config::Config;
use rtos_switch::console;
use rtos_switch::drivers::GdbRemote;
use rtos_switch::symbols::{KernelSymbols, SymbolTable};
use rtos_switch::task::KernelMap;
use rtos_switch::user::{self, Session};

#[macro_use]
extern crate log;

const PROMPT: &str = "(rtos) ";

/// Inspect FreeRTOS tasks on a halted Cortex-M target
#[derive(Parser)]
#[command(name = "rtos-switch", version)]
struct Cli {
    /// Configuration file [default: rtosconfig.toml, if present]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Firmware ELF to read the scheduler symbols from
    #[arg(short, long)]
    elf: Option<PathBuf>,

    /// gdbserver address (host:port), overrides remote.address
    #[arg(short, long)]
    remote: Option<String>,

    /// Log filter, e.g. `info` or `rtos_switch=trace`
    #[arg(long)]
    log: Option<String>,

    /// Leave the last replayed task frame loaded on exit
    #[arg(long)]
    keep: bool,

    /// Command to run instead of starting the prompt
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    console::init_logger(cli.log.as_deref());

    if let Err(e) = try_main(cli) {
        error!("{:#}", e);
        exit(1);
    }
}

fn try_main(cli: Cli) -> ShellResult<()> {
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let table = load_symbols(cli.elf.as_deref())?;
    let symbols = KernelSymbols::resolve(table.as_ref(), &config.symbols)
        .context("Failed to resolve the scheduler symbols")?;

    let address = cli
        .remote
        .or(config.remote.address)
        .context("No gdbserver address, pass --remote or set remote.address")?;
    let target = GdbRemote::connect(&address, config.remote.registers)
        .with_context(|| format!("Failed to connect to {address}"))?;

    let mut session = Session::attach(
        Box::new(target),
        KernelMap::new(config.layout, symbols),
        config.fpu,
        Box::new(io::stdout()),
    )
    .context("Failed to attach to the target")?;

    let result = if cli.command.is_empty() {
        repl(&mut session)
    } else {
        user::execute(&mut session, &cli.command.join(" "))
    };

    session
        .detach(cli.keep)
        .context("Failed to restore the live context")?;
    result
}

/// Reads commands from stdin until `exit` or end of input.
fn repl(session: &mut Session) -> ShellResult<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    while !session.exit_requested() {
        write!(session.out(), "{PROMPT}")?;
        session.out().flush()?;

        let Some(line) = lines.next() else {
            writeln!(session.out())?;
            break;
        };
        if let Err(e) = user::execute(session, &line?) {
            writeln!(session.out(), "Error: {e:#}")?;
        }
    }
    Ok(())
}

#[cfg(feature = "elf")]
fn load_symbols(path: Option<&Path>) -> ShellResult<Option<SymbolTable>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let table = SymbolTable::load(path)
        .with_context(|| format!("Failed to read symbols from {}", path.display()))?;
    Ok(Some(table))
}

#[cfg(not(feature = "elf"))]
fn load_symbols(path: Option<&Path>) -> ShellResult<Option<SymbolTable>> {
    if path.is_some() {
        anyhow::bail!("ELF support is disabled, set the symbol addresses in the configuration");
    }
    Ok(None)
}
