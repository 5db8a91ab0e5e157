//! Cancellable timed effects.
//!
//! Cooperative single-threaded model: the host loop feeds elapsed time
//! into [`Scheduler::tick`] and routes the due [`Deferred`] actions back
//! through the interpreter. Actions are data, not closures, so a scene
//! jump cancels every outstanding handle structurally instead of by
//! remembered cleanup.

use crate::runtime::patch::StatePatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

/// What a timer does when it fires.
#[derive(Debug, Clone, PartialEq)]
pub enum Deferred {
    /// Finish a blocking wait/transition: the loop may advance.
    Advance,
    /// Late patch from a decoupled (async) effect.
    Patch(StatePatch),
    /// Blocking effect that also mutates state at completion.
    PatchAndAdvance(StatePatch),
}

#[derive(Debug)]
struct Task {
    handle: Handle,
    remaining_ms: u64,
    action: Deferred,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    tasks: Vec<Task>,
    next_handle: u64,
}

impl Scheduler {
    pub fn schedule(&mut self, delay_ms: u64, action: Deferred) -> Handle {
        self.next_handle += 1;
        let handle = Handle(self.next_handle);
        self.tasks.push(Task {
            handle,
            remaining_ms: delay_ms,
            action,
        });
        handle
    }

    /// True if the handle was still pending.
    pub fn cancel(&mut self, handle: Handle) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.handle != handle);
        self.tasks.len() != before
    }

    /// Scene jump / session end: nothing scheduled before this point may
    /// fire afterwards.
    pub fn cancel_all(&mut self) {
        if !self.tasks.is_empty() {
            log::debug!("cancelling {} pending effect(s)", self.tasks.len());
            self.tasks.clear();
        }
    }

    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Advance time. Due actions come back in scheduling order.
    pub fn tick(&mut self, elapsed_ms: u64) -> Vec<Deferred> {
        let mut due = Vec::new();
        let mut remaining = Vec::with_capacity(self.tasks.len());
        for mut task in self.tasks.drain(..) {
            if task.remaining_ms <= elapsed_ms {
                due.push(task.action);
            } else {
                task.remaining_ms -= elapsed_ms;
                remaining.push(task);
            }
        }
        self.tasks = remaining;
        due
    }
}
