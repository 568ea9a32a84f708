//! Task definition and related types.

use core::fmt;

use memory_addr::VirtAddr;

use super::manager::TaskManager;
use super::stack::StackCursor;
use crate::RtosResult;
use crate::hal::target::offset;

/// Task status as shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task is the scheduler's current task.
    Running,
    /// Task is in a ready list.
    Ready,
    /// Task is in a delayed list, waiting for a tick or an event.
    Blocked,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Running => "running",
            TaskStatus::Ready => "ready",
            TaskStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A task, identified by the address of its TCB.
///
/// Only the TCB address and the list the task was found in are held; every
/// field is read from the target on demand, so a `Task` never goes stale
/// with respect to the halted target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Task {
    tcb: VirtAddr,
    /// Status of the list the task was enumerated from.
    listed: TaskStatus,
}

impl Task {
    pub fn new(tcb: VirtAddr, listed: TaskStatus) -> Self {
        Self { tcb, listed }
    }

    /// Returns the TCB address.
    #[inline]
    pub fn tcb(&self) -> VirtAddr {
        self.tcb
    }

    /// Returns `uxTaskNumber`.
    pub fn number(&self, tasks: &TaskManager<'_>) -> RtosResult<u32> {
        let layout = tasks.layout();
        tasks
            .target()
            .read_u32(offset(self.tcb, layout.tcb_task_number))
    }

    /// Returns `uxPriority`.
    pub fn priority(&self, tasks: &TaskManager<'_>) -> RtosResult<u32> {
        let layout = tasks.layout();
        tasks.target().read_u32(offset(self.tcb, layout.tcb_priority))
    }

    /// Returns the task name, read up to the first NUL inside the name
    /// buffer.
    pub fn name(&self, tasks: &TaskManager<'_>) -> RtosResult<String> {
        let layout = tasks.layout();
        let mut buf = vec![0u8; layout.task_name_len];
        tasks
            .target()
            .read_memory(offset(self.tcb, layout.tcb_name), &mut buf)?;
        Ok(decode_name(&buf))
    }

    /// Checks the scheduler's current-task pointer. Not cached.
    pub fn is_running(&self, tasks: &TaskManager<'_>) -> RtosResult<bool> {
        Ok(tasks.current_tcb()? == self.tcb)
    }

    /// Returns `Running` for the current task, otherwise the status of the
    /// list the task was found in.
    pub fn status(&self, tasks: &TaskManager<'_>) -> RtosResult<TaskStatus> {
        if self.is_running(tasks)? {
            Ok(TaskStatus::Running)
        } else {
            Ok(self.listed)
        }
    }

    /// Returns a cursor over the task's saved context.
    pub fn stack<'a>(&self, tasks: &TaskManager<'a>) -> RtosResult<StackCursor<'a>> {
        let layout = tasks.layout();
        let top = tasks
            .target()
            .read_ptr(offset(self.tcb, layout.tcb_top_of_stack))?;
        Ok(StackCursor::new(tasks.target(), top))
    }

    /// Returns `"<number> (Thread <name>)"`.
    pub fn display_name(&self, tasks: &TaskManager<'_>) -> RtosResult<String> {
        Ok(format!(
            "{} (Thread <{}>)",
            self.number(tasks)?,
            self.name(tasks)?
        ))
    }
}

/// Decodes a fixed-size name buffer, one character per byte, stopping at
/// the first NUL or at the end of the buffer.
pub fn decode_name(buf: &[u8]) -> String {
    buf.iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect()
}
