//! Logger setup for the log crate.

use core::fmt::{self, Display};
use std::io::Write;

use log::Level;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorCode {
    Red = 31,
    Green = 32,
    Yellow = 33,
    Cyan = 36,
    BrightBlack = 90,
}

impl Display for ColorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\u{1B}[{}m", *self as u8)
    }
}

impl ColorCode {
    pub fn for_level(level: Level) -> Self {
        match level {
            Level::Error => ColorCode::Red,
            Level::Warn => ColorCode::Yellow,
            Level::Info => ColorCode::Green,
            Level::Debug => ColorCode::Cyan,
            Level::Trace => ColorCode::BrightBlack,
        }
    }
}

/// Initialize the logger.
///
/// `filter` takes precedence over `RUST_LOG`; the default level is `warn`.
/// Records go to stderr as `[file:line] message`, the message colored by
/// level. Calling this twice keeps the first logger.
pub fn init(filter: Option<&str>) {
    let env = env_logger::Env::default().default_filter_or("warn");
    let mut builder = env_logger::Builder::from_env(env);
    if let Some(filter) = filter {
        builder.parse_filters(filter);
    }

    let result = builder
        .format_timestamp(None)
        .format(|buf, record| {
            let file = record.file().unwrap_or("none");
            let line = record.line().unwrap_or(0);
            let color = ColorCode::for_level(record.level());
            let color_reset = "\u{1B}[0m";
            writeln!(buf, "[{file}:{line}] {color}{}{color_reset}", record.args())
        })
        .try_init();

    if result.is_err() {
        debug!("logger already initialized");
    }
}
