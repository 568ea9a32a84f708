//! Task context switching, simulated on a halted core.
//!
//! A suspended task's registers live on its own stack, where the scheduler's
//! PendSV handler left them. Replaying that frame into the core registers
//! makes the debugger see the task as if it had just been switched in. The
//! live registers captured at attach time are the only way back.

use core::fmt;

use memory_addr::VirtAddr;

use super::manager::{KernelMap, TaskManager};
use super::stack::StackCursor;
use super::task::Task;
use crate::hal::{ExcReturn, LiveRegisters, Reg, Target};
use crate::{RtosError, RtosResult};

/// Callee-saved context stacked by software on a context switch.
///
/// Stack layout, lowest address first:
///
/// ```text
/// r4 r5 r6 r7 r8 r9 r10 r11 lr [s16 .. s31]
/// ```
///
/// `lr` holds EXC_RETURN; the floating-point bank is present only when it
/// reports an extended frame. The hardware-stacked frame (`r0-r3`, `r12`,
/// `lr`, `pc`, `xpsr`) follows and is left for the exception return to
/// unstack.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SavedFrame {
    /// r4..r11.
    pub preserved: [u32; 8],
    pub exc_return: ExcReturn,
    /// s16..s31, for an extended frame.
    pub fp: Option<[u32; 16]>,
    /// First address past the software frame.
    pub psp: VirtAddr,
}

impl SavedFrame {
    /// Decodes a frame, reading memory only.
    pub fn pop_from(stack: &mut StackCursor<'_>) -> RtosResult<Self> {
        let preserved = stack.pop_array::<8>()?;
        let exc_return = ExcReturn::from_lr(stack.pop()?);
        let fp = if exc_return.has_extended_frame() {
            Some(stack.pop_array::<16>()?)
        } else {
            None
        };

        Ok(Self {
            preserved,
            exc_return,
            fp,
            psp: stack.pointer(),
        })
    }

    /// The saved link register.
    pub fn lr(&self) -> u32 {
        self.exc_return.bits()
    }

    /// Where execution resumes once the frame is live (`bx lr`).
    pub fn resume_pc(&self) -> u32 {
        self.lr()
    }

    /// Number of stack words the frame occupies.
    pub fn words(&self) -> usize {
        Reg::PRESERVED.len() + 1 + self.fp.map_or(0, |bank| bank.len())
    }

    /// Writes the frame into the core registers.
    ///
    /// Only r4..r11, lr, s16..s31, psp and pc are touched. The first failed
    /// write is returned and leaves the registers partially updated.
    pub fn apply(&self, target: &mut dyn Target) -> RtosResult<()> {
        debug!(
            "replaying {} frame: lr {:#010x}, psp {:#010x}",
            if self.fp.is_some() { "extended" } else { "basic" },
            self.lr(),
            self.psp.as_usize()
        );

        let preserved = Reg::PRESERVED.into_iter().zip(self.preserved);
        let lr = core::iter::once((Reg::LR, self.lr()));
        let fp = self
            .fp
            .into_iter()
            .flat_map(|bank| Reg::fp_callee_saved().zip(bank));
        let tail = [
            (Reg::Psp, self.psp.as_usize() as u32),
            (Reg::PC, self.resume_pc()),
        ];

        for (reg, value) in preserved.chain(lr).chain(fp).chain(tail) {
            trace!("write {} = {:#010x}", reg, value);
            target.write_register(reg, value)?;
        }
        Ok(())
    }
}

impl fmt::Debug for SavedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SavedFrame: {{")?;
        for (reg, value) in Reg::PRESERVED.iter().zip(self.preserved) {
            writeln!(f, "    {reg}: {value:#x},")?;
        }
        writeln!(f, "    lr: {:#x},", self.lr())?;
        if let Some(bank) = self.fp {
            for (reg, value) in Reg::fp_callee_saved().zip(bank) {
                writeln!(f, "    {reg}: {value:#x},")?;
            }
        }
        writeln!(f, "    psp: {:#x},", self.psp.as_usize())?;
        write!(f, "}}")?;
        Ok(())
    }
}

/// Replays task frames and returns to the live context.
///
/// At most one replay is outstanding at a time: a second one must be
/// preceded by [`ContextSwitcher::restore`], or go through
/// [`ContextSwitcher::select`], which restores on its own.
pub struct ContextSwitcher {
    live: LiveRegisters,
    /// TCB of the task whose frame is currently loaded.
    replayed: Option<VirtAddr>,
}

impl ContextSwitcher {
    /// Captures the live registers. Must happen before any replay.
    pub fn attach(target: &dyn Target, fpu: bool) -> RtosResult<Self> {
        let live = LiveRegisters::capture(target, fpu)?;
        info!(
            "live context captured: pc {:#010x}, psp {:#010x}{}",
            live.r[15],
            live.psp,
            if live.fp.is_some() { ", with FPU bank" } else { "" }
        );
        Ok(Self {
            live,
            replayed: None,
        })
    }

    /// TCB of the task whose frame is loaded, if any.
    pub fn replayed(&self) -> Option<VirtAddr> {
        self.replayed
    }

    /// Loads `task`'s saved frame into the core registers.
    ///
    /// Fails with `InvalidOperation` for the running task, whose registers
    /// are the live ones, and with `Precondition` while another replay is
    /// outstanding. An extended frame is refused with `Precondition` when the
    /// live FPU bank was not captured, as restoring could not undo it. The
    /// frame is decoded before anything is written, so a failed read changes
    /// nothing.
    pub fn switch_to(
        &mut self,
        target: &mut dyn Target,
        map: &KernelMap,
        task: Task,
    ) -> RtosResult<SavedFrame> {
        let frame = {
            let tasks = TaskManager::new(&*target, map);
            if task.is_running(&tasks)? {
                return Err(RtosError::InvalidOperation);
            }
            if self.replayed.is_some() {
                return Err(RtosError::Precondition(
                    "a task frame is already loaded, restore the live context first",
                ));
            }
            SavedFrame::pop_from(&mut task.stack(&tasks)?)?
        };
        if frame.fp.is_some() && self.live.fp.is_none() {
            return Err(RtosError::Precondition(
                "task saved FPU registers but the live FPU bank was not captured",
            ));
        }

        self.replayed = Some(task.tcb());
        frame.apply(target)?;
        Ok(frame)
    }

    /// Writes the live registers back.
    pub fn restore(&mut self, target: &mut dyn Target) -> RtosResult<()> {
        debug!("restoring live context");
        self.live.restore(target)?;
        self.replayed = None;
        Ok(())
    }

    /// Makes `task` the one the debugger sees.
    ///
    /// The running task is shown by restoring the live context; any other
    /// task by replaying its frame, after restoring if a replay is
    /// outstanding. Returns the replayed frame, if any.
    pub fn select(
        &mut self,
        target: &mut dyn Target,
        map: &KernelMap,
        task: Task,
    ) -> RtosResult<Option<SavedFrame>> {
        let running = task.is_running(&TaskManager::new(&*target, map))?;
        if running || self.replayed.is_some() {
            self.restore(target)?;
        }
        if running {
            return Ok(None);
        }
        self.switch_to(target, map, task).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::MemoryTarget;
    use crate::task::TaskStatus;
    use crate::tests::fixture::{FakeKernel, Queue};
    use memory_addr::va;

    const BASIC: u32 = 0xFFFF_FFFD;
    const EXTENDED: u32 = 0xFFFF_FFED;

    /// Two tasks: `a` running, `b` ready with a frame built from `exc_return`.
    fn kernel_with(exc_return: u32) -> (FakeKernel, Task, Task) {
        let mut kernel = FakeKernel::new();
        let a = kernel.add_task(Queue::Ready(1), 1, "a", 1);
        let b = kernel.add_task_with_frame(Queue::Ready(1), 2, "b", 1, exc_return);
        kernel.set_current(a);
        (
            kernel,
            Task::new(a, TaskStatus::Ready),
            Task::new(b, TaskStatus::Ready),
        )
    }

    fn switcher(kernel: &FakeKernel) -> ContextSwitcher {
        ContextSwitcher::attach(&kernel.target, true).unwrap()
    }

    #[test]
    fn test_pop_basic_frame() {
        let mut target = MemoryTarget::new();
        target.write_words(0x2000_1000, &[4, 5, 6, 7, 8, 9, 10, 11, BASIC]);

        let mut stack = StackCursor::new(&target, va!(0x2000_1000));
        let frame = SavedFrame::pop_from(&mut stack).unwrap();
        assert_eq!(frame.preserved, [4, 5, 6, 7, 8, 9, 10, 11]);
        assert_eq!(frame.fp, None);
        assert_eq!(frame.words(), 9);
        assert_eq!(frame.psp, va!(0x2000_1000 + 9 * 4));
        assert_eq!(frame.resume_pc(), BASIC);
    }

    #[test]
    fn test_pop_extended_frame() {
        let mut target = MemoryTarget::new();
        target.write_words(0x2000_1000, &[0; 8]);
        target.write_u32(0x2000_1020, EXTENDED);
        let bank: Vec<u32> = (0..16).map(|i| 0x4100_0000 + i).collect();
        target.write_words(0x2000_1024, &bank);

        let mut stack = StackCursor::new(&target, va!(0x2000_1000));
        let frame = SavedFrame::pop_from(&mut stack).unwrap();
        assert_eq!(frame.fp.map(|b| b.to_vec()), Some(bank));
        assert_eq!(frame.words(), 25);
        assert_eq!(frame.psp, va!(0x2000_1000 + 25 * 4));
    }

    #[test]
    fn test_switch_basic_frame() {
        let (mut kernel, _, b) = kernel_with(BASIC);
        let top = kernel.stack_top(b.tcb());
        let saved = kernel.frame(b.tcb()).to_vec();
        let before = kernel.target.registers().clone();

        let mut switcher = switcher(&kernel);
        let frame = switcher.switch_to(&mut kernel.target, &kernel.map, b).unwrap();
        assert_eq!(frame.words(), 9);
        assert_eq!(switcher.replayed(), Some(b.tcb()));

        let regs = &kernel.target;
        for (i, reg) in Reg::PRESERVED.into_iter().enumerate() {
            assert_eq!(regs.register(reg), Some(saved[i]), "{reg}");
        }
        assert_eq!(regs.register(Reg::LR), Some(BASIC));
        assert_eq!(regs.register(Reg::PC), Some(BASIC));
        assert_eq!(regs.register(Reg::Psp), Some((top + 36) as u32));

        // Nothing else moves: no FP bank in a basic frame, and the
        // hardware-stacked and system registers are never written.
        let untouched = [Reg::R(0), Reg::R(1), Reg::R(2), Reg::R(3), Reg::R(12), Reg::SP]
            .into_iter()
            .chain([Reg::Xpsr, Reg::Msp, Reg::Fpscr])
            .chain(Reg::fp_callee_saved());
        for reg in untouched {
            assert_eq!(regs.register(reg), before.get(&reg).copied(), "{reg}");
        }
    }

    #[test]
    fn test_switch_extended_frame_loads_fp_bank() {
        let (mut kernel, _, b) = kernel_with(EXTENDED);
        let top = kernel.stack_top(b.tcb());
        let saved = kernel.frame(b.tcb()).to_vec();
        let fpscr = kernel.target.register(Reg::Fpscr);

        let mut switcher = switcher(&kernel);
        let frame = switcher.switch_to(&mut kernel.target, &kernel.map, b).unwrap();
        assert_eq!(frame.words(), 25);

        for (i, reg) in Reg::fp_callee_saved().enumerate() {
            assert_eq!(kernel.target.register(reg), Some(saved[9 + i]), "{reg}");
        }
        assert_eq!(kernel.target.register(Reg::PC), Some(EXTENDED));
        assert_eq!(kernel.target.register(Reg::Psp), Some((top + 100) as u32));
        assert_eq!(kernel.target.register(Reg::Fpscr), fpscr);
    }

    #[test]
    fn test_switch_to_running_task_is_rejected() {
        let (mut kernel, a, _) = kernel_with(BASIC);
        let before = kernel.target.registers().clone();

        let mut switcher = switcher(&kernel);
        let err = switcher.switch_to(&mut kernel.target, &kernel.map, a);
        assert!(matches!(err, Err(RtosError::InvalidOperation)));
        assert_eq!(kernel.target.registers(), &before);
        assert_eq!(switcher.replayed(), None);
    }

    #[test]
    fn test_second_replay_needs_restore() {
        let mut kernel = FakeKernel::new();
        let a = kernel.add_task(Queue::Ready(1), 1, "a", 1);
        let b = kernel.add_task(Queue::Ready(1), 2, "b", 1);
        let c = kernel.add_task(Queue::Delayed1, 3, "c", 1);
        kernel.set_current(a);
        let (b, c) = (Task::new(b, TaskStatus::Ready), Task::new(c, TaskStatus::Blocked));

        let mut switcher = switcher(&kernel);
        switcher.switch_to(&mut kernel.target, &kernel.map, b).unwrap();
        let after_b = kernel.target.registers().clone();

        let err = switcher.switch_to(&mut kernel.target, &kernel.map, c);
        assert!(matches!(err, Err(RtosError::Precondition(_))));
        assert_eq!(kernel.target.registers(), &after_b);

        switcher.restore(&mut kernel.target).unwrap();
        switcher.switch_to(&mut kernel.target, &kernel.map, c).unwrap();
        assert_eq!(switcher.replayed(), Some(c.tcb()));
    }

    #[test]
    fn test_switch_then_restore_is_exact() {
        for exc_return in [BASIC, EXTENDED] {
            let (mut kernel, _, b) = kernel_with(exc_return);
            let before = kernel.target.registers().clone();

            let mut switcher = switcher(&kernel);
            switcher.switch_to(&mut kernel.target, &kernel.map, b).unwrap();
            assert_ne!(kernel.target.registers(), &before);

            switcher.restore(&mut kernel.target).unwrap();
            assert_eq!(kernel.target.registers(), &before);
            assert_eq!(switcher.replayed(), None);
        }
    }

    #[test]
    fn test_extended_frame_without_fpu_snapshot_is_refused() {
        let (mut kernel, _, b) = kernel_with(EXTENDED);
        let before = kernel.target.registers().clone();

        let mut switcher = ContextSwitcher::attach(&kernel.target, false).unwrap();
        let err = switcher.switch_to(&mut kernel.target, &kernel.map, b);
        assert!(matches!(err, Err(RtosError::Precondition(_))));
        assert_eq!(kernel.target.registers(), &before);
        assert_eq!(switcher.replayed(), None);

        // Restoring after a refused switch leaves the bank as it was.
        switcher.restore(&mut kernel.target).unwrap();
        assert_eq!(kernel.target.registers(), &before);
    }

    #[test]
    fn test_basic_frame_without_fpu_snapshot_restores_exactly() {
        let (mut kernel, _, b) = kernel_with(BASIC);
        let before = kernel.target.registers().clone();

        let mut switcher = ContextSwitcher::attach(&kernel.target, false).unwrap();
        switcher.switch_to(&mut kernel.target, &kernel.map, b).unwrap();
        switcher.restore(&mut kernel.target).unwrap();
        assert_eq!(kernel.target.registers(), &before);
    }

    #[test]
    fn test_unreadable_frame_changes_nothing() {
        let (mut kernel, _, b) = kernel_with(BASIC);
        // Drop the saved lr word.
        let top = kernel.stack_top(b.tcb());
        kernel.target.unmap(top + 32, 4);
        let before = kernel.target.registers().clone();

        let mut switcher = switcher(&kernel);
        let err = switcher.switch_to(&mut kernel.target, &kernel.map, b);
        assert!(matches!(err, Err(RtosError::MemoryRead { addr }) if addr == top + 32));
        assert_eq!(kernel.target.registers(), &before);
        assert_eq!(switcher.replayed(), None);
    }

    #[test]
    fn test_failed_write_is_reported() {
        let (mut kernel, _, b) = kernel_with(BASIC);
        kernel.target.reject_writes(Reg::Psp);

        let mut switcher = switcher(&kernel);
        let err = switcher.switch_to(&mut kernel.target, &kernel.map, b);
        assert!(matches!(err, Err(RtosError::RegisterAccess { reg: Reg::Psp })));
        // Partially applied; a restore is still owed.
        assert_eq!(switcher.replayed(), Some(b.tcb()));
    }

    #[test]
    fn test_select_moves_between_tasks() {
        let mut kernel = FakeKernel::new();
        let a = kernel.add_task(Queue::Ready(1), 1, "a", 1);
        let b = kernel.add_task(Queue::Ready(1), 2, "b", 1);
        let c = kernel.add_task(Queue::Delayed2, 3, "c", 1);
        kernel.set_current(a);
        let b_frame = kernel.frame(b).to_vec();
        let c_frame = kernel.frame(c).to_vec();
        let before = kernel.target.registers().clone();
        let (a, b, c) = (
            Task::new(a, TaskStatus::Ready),
            Task::new(b, TaskStatus::Ready),
            Task::new(c, TaskStatus::Blocked),
        );

        let mut switcher = switcher(&kernel);
        let map = kernel.map.clone();

        assert!(switcher.select(&mut kernel.target, &map, b).unwrap().is_some());
        assert_eq!(kernel.target.register(Reg::R(4)), Some(b_frame[0]));

        assert!(switcher.select(&mut kernel.target, &map, c).unwrap().is_some());
        assert_eq!(kernel.target.register(Reg::R(4)), Some(c_frame[0]));
        assert_eq!(switcher.replayed(), Some(c.tcb()));

        // Selecting the running task brings back the live context.
        assert!(switcher.select(&mut kernel.target, &map, a).unwrap().is_none());
        assert_eq!(kernel.target.registers(), &before);
        assert_eq!(switcher.replayed(), None);
    }
}
