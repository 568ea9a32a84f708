//! Cortex-M register names as seen by the debugger.

use core::fmt;
use core::str::FromStr;

/// A register of the halted core.
///
/// `R(0)..=R(15)` are the core registers; `r13`, `r14` and `r15` are also
/// known as `sp`, `lr` and `pc`. `S(0)..=S(31)` are the single-precision
/// floating-point registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Reg {
    R(u8),
    Xpsr,
    Msp,
    Psp,
    S(u8),
    Fpscr,
}

impl Reg {
    pub const SP: Reg = Reg::R(13);
    pub const LR: Reg = Reg::R(14);
    pub const PC: Reg = Reg::R(15);

    /// Callee-saved registers restored by software on a context switch, in
    /// the order the switch handler stacks them.
    pub const PRESERVED: [Reg; 8] = [
        Reg::R(4),
        Reg::R(5),
        Reg::R(6),
        Reg::R(7),
        Reg::R(8),
        Reg::R(9),
        Reg::R(10),
        Reg::R(11),
    ];

    /// Returns the upper floating-point bank `s16..=s31`.
    pub fn fp_callee_saved() -> impl Iterator<Item = Reg> {
        (16..32).map(Reg::S)
    }

    /// Returns `r0..=r15`.
    pub fn core() -> impl Iterator<Item = Reg> {
        (0..16).map(Reg::R)
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Reg::R(13) => write!(f, "sp"),
            Reg::R(14) => write!(f, "lr"),
            Reg::R(15) => write!(f, "pc"),
            Reg::R(n) => write!(f, "r{n}"),
            Reg::Xpsr => write!(f, "xpsr"),
            Reg::Msp => write!(f, "msp"),
            Reg::Psp => write!(f, "psp"),
            Reg::S(n) => write!(f, "s{n}"),
            Reg::Fpscr => write!(f, "fpscr"),
        }
    }
}

impl FromStr for Reg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let reg = match name.as_str() {
            "sp" => Reg::SP,
            "lr" => Reg::LR,
            "pc" => Reg::PC,
            "xpsr" => Reg::Xpsr,
            "msp" => Reg::Msp,
            "psp" => Reg::Psp,
            "fpscr" => Reg::Fpscr,
            _ => {
                let index = |digits: &str, max: u8| {
                    digits.parse::<u8>().ok().filter(|n| *n <= max)
                };
                if let Some(n) = name.strip_prefix('r').and_then(|d| index(d, 15)) {
                    Reg::R(n)
                } else if let Some(n) = name.strip_prefix('s').and_then(|d| index(d, 31)) {
                    Reg::S(n)
                } else {
                    return Err(format!("unknown register: {s}"));
                }
            }
        };
        Ok(reg)
    }
}
