//! Debug session state shared by the commands.

use std::io::Write;

use crate::hal::Target;
use crate::task::{ContextSwitcher, KernelMap, SavedFrame, Task, TaskManager};
use crate::RtosResult;

/// An attached, halted target and everything the commands act on.
pub struct Session {
    target: Box<dyn Target>,
    map: KernelMap,
    switcher: ContextSwitcher,
    out: Box<dyn Write>,
    exit_requested: bool,
}

impl Session {
    /// Attaches to `target`, capturing its live registers.
    pub fn attach(
        target: Box<dyn Target>,
        map: KernelMap,
        fpu: bool,
        out: Box<dyn Write>,
    ) -> RtosResult<Self> {
        let switcher = ContextSwitcher::attach(target.as_ref(), fpu)?;
        Ok(Self {
            target,
            map,
            switcher,
            out,
            exit_requested: false,
        })
    }

    /// A fresh view of the scheduler.
    pub fn tasks(&self) -> TaskManager<'_> {
        TaskManager::new(self.target.as_ref(), &self.map)
    }

    /// Makes `task` the one the debugger sees.
    pub fn select(&mut self, task: Task) -> RtosResult<Option<SavedFrame>> {
        self.switcher.select(self.target.as_mut(), &self.map, task)
    }

    /// Returns to the live context.
    pub fn restore(&mut self) -> RtosResult<()> {
        self.switcher.restore(self.target.as_mut())
    }

    pub fn target(&self) -> &dyn Target {
        self.target.as_ref()
    }

    pub fn switcher(&self) -> &ContextSwitcher {
        &self.switcher
    }

    pub fn out(&mut self) -> &mut dyn Write {
        self.out.as_mut()
    }

    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    /// Ends the session, restoring the live context unless `keep` is set or
    /// no replay is outstanding.
    pub fn detach(mut self, keep: bool) -> RtosResult<Box<dyn Target>> {
        if let Some(tcb) = self.switcher.replayed() {
            if keep {
                warn!(
                    "leaving the frame of task {:#x} loaded",
                    tcb.as_usize()
                );
            } else {
                self.restore()?;
            }
        }
        self.out.flush()?;
        Ok(self.target)
    }
}
