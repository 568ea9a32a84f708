//! Live register snapshot of the halted core.

use core::fmt;

use super::{Reg, Target};
use crate::RtosResult;

/// Registers captured when a session attaches, before any frame is replayed.
///
/// Covers `r0..=r15`, the process stack pointer and, when the core has an
/// FPU, the upper single-precision bank. These are exactly the registers a
/// frame replay may overwrite, so writing them back returns the debugger to
/// the true execution point.
#[derive(Clone, PartialEq, Eq)]
pub struct LiveRegisters {
    /// Core registers (r0..r15).
    pub r: [u32; 16],
    /// Process Stack Pointer.
    pub psp: u32,
    /// Floating-point registers s16..s31, if the core has an FPU.
    pub fp: Option<[u32; 16]>,
}

impl LiveRegisters {
    /// Reads the snapshot from the target.
    pub fn capture(target: &dyn Target, fpu: bool) -> RtosResult<Self> {
        let mut r = [0u32; 16];
        for (slot, reg) in r.iter_mut().zip(Reg::core()) {
            *slot = target.read_register(reg)?;
        }
        let psp = target.read_register(Reg::Psp)?;

        let fp = if fpu {
            let mut bank = [0u32; 16];
            for (slot, reg) in bank.iter_mut().zip(Reg::fp_callee_saved()) {
                *slot = target.read_register(reg)?;
            }
            Some(bank)
        } else {
            None
        };

        Ok(Self { r, psp, fp })
    }

    /// Returns every captured register with its value, in write-back order.
    pub fn entries(&self) -> impl Iterator<Item = (Reg, u32)> + '_ {
        let core = Reg::core().zip(self.r.iter().copied());
        let psp = core::iter::once((Reg::Psp, self.psp));
        let fp = self
            .fp
            .iter()
            .flat_map(|bank| Reg::fp_callee_saved().zip(bank.iter().copied()));
        core.chain(psp).chain(fp)
    }

    /// Writes the snapshot back verbatim.
    pub fn restore(&self, target: &mut dyn Target) -> RtosResult<()> {
        for (reg, value) in self.entries() {
            trace!("restore {} = {:#010x}", reg, value);
            target.write_register(reg, value)?;
        }
        Ok(())
    }
}

impl fmt::Debug for LiveRegisters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "LiveRegisters: {{")?;
        for (reg, value) in self.entries() {
            writeln!(f, "    {reg}: {value:#x},")?;
        }
        write!(f, "}}")?;
        Ok(())
    }
}
