//! Task manager implementation.
//!
//! Enumerates the scheduler's tasks from its global lists:
//! - the two delayed lists, whose members are blocked
//! - one ready list per priority, lowest priority first
//!
//! The running task stays in its ready list while it runs, so it is found
//! there like any other task.

use memory_addr::VirtAddr;

use super::list::RtosList;
use super::task::{Task, TaskStatus};
use crate::config::KernelLayout;
use crate::hal::Target;
use crate::hal::target::offset;
use crate::symbols::KernelSymbols;
use crate::{RtosError, RtosResult};

/// Where the scheduler keeps its state and how it is laid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelMap {
    pub layout: KernelLayout,
    pub symbols: KernelSymbols,
}

impl KernelMap {
    pub fn new(layout: KernelLayout, symbols: KernelSymbols) -> Self {
        Self { layout, symbols }
    }

    /// The lists to walk, in enumeration order, with the status of their
    /// members.
    fn lists(&self) -> impl Iterator<Item = (RtosList, TaskStatus)> + '_ {
        let delayed = self
            .symbols
            .delayed_lists
            .iter()
            .map(|&addr| (RtosList::at(addr), TaskStatus::Blocked));
        let ready = (0..self.layout.ready_lists).map(|priority| {
            let addr = offset(self.symbols.ready_lists, priority * self.layout.list_size);
            (RtosList::at(addr), TaskStatus::Ready)
        });
        delayed.chain(ready)
    }
}

/// Read-only view of the scheduler of a halted target.
pub struct TaskManager<'a> {
    target: &'a dyn Target,
    map: &'a KernelMap,
}

impl<'a> TaskManager<'a> {
    pub fn new(target: &'a dyn Target, map: &'a KernelMap) -> Self {
        Self { target, map }
    }

    pub fn target(&self) -> &'a dyn Target {
        self.target
    }

    pub fn layout(&self) -> &'a KernelLayout {
        &self.map.layout
    }

    /// Reads `pxCurrentTCB`.
    pub fn current_tcb(&self) -> RtosResult<VirtAddr> {
        self.target.read_ptr(self.map.symbols.current_tcb)
    }

    /// Returns the running task, or `None` before the scheduler has started.
    pub fn current_task(&self) -> RtosResult<Option<Task>> {
        let tcb = self.current_tcb()?;
        if tcb.as_usize() == 0 {
            return Ok(None);
        }
        Ok(Some(Task::new(tcb, TaskStatus::Running)))
    }

    /// Returns every task, in list order: delayed lists first, then the
    /// ready lists by ascending priority.
    pub fn tasks(&self) -> RtosResult<Vec<Task>> {
        let mut tasks = Vec::new();
        for (list, status) in self.map.lists() {
            for owner in list.iter(self.target, &self.map.layout)? {
                tasks.push(Task::new(owner?, status));
            }
        }
        debug!("{} tasks enumerated", tasks.len());
        Ok(tasks)
    }

    /// Returns every task ordered by task number.
    ///
    /// The sort is stable: tasks sharing a number keep their list order.
    pub fn sorted_tasks(&self) -> RtosResult<Vec<Task>> {
        let mut keyed = self
            .tasks()?
            .into_iter()
            .map(|task| -> RtosResult<_> { Ok((task.number(self)?, task)) })
            .collect::<RtosResult<Vec<_>>>()?;
        keyed.sort_by_key(|&(number, _)| number);
        Ok(keyed.into_iter().map(|(_, task)| task).collect())
    }

    /// Finds the task with task number `number`.
    pub fn find(&self, number: u32) -> RtosResult<Task> {
        for task in self.tasks()? {
            if task.number(self)? == number {
                return Ok(task);
            }
        }
        Err(RtosError::NotFound(number))
    }
}
