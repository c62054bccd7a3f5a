// Copyright 2026 stask contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! An ergonomic, opt-in builder layered over the bare [`crate::spawn`] free function (§10).

use std::any::type_name;
use std::future::Future;

use crate::join_handle::JoinHandle;

/// Configures and submits a named spawned task.
///
/// `spawn(future)` is the minimal entry point (§6's conceptual API table); `TaskBuilder` is the
/// fuller one, letting callers attach a name that shows up in this crate's `tracing` spans —
/// useful once more than a handful of tasks are in flight at once.
///
/// ```
/// use stask::{Scheduler, TaskBuilder};
///
/// let scheduler = Scheduler::new();
/// scheduler.block_on(|| async {
///     let handle = TaskBuilder::new().name("greeter").spawn(async { "hi" });
///     assert_eq!(handle.await, "hi");
/// });
/// ```
#[derive(Default)]
pub struct TaskBuilder {
    name: Option<&'static str>,
}

impl TaskBuilder {
    /// Creates a builder for an unnamed task.
    pub fn new() -> Self {
        Self { name: None }
    }

    /// Sets the name that will be attached to this task's `tracing` span.
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    /// Spawns `future` onto the currently running [`crate::Scheduler`].
    ///
    /// # Panics
    ///
    /// Panics if called outside of a [`crate::Scheduler::block_on`] call on this thread (the same
    /// precondition as the bare [`crate::spawn`] function).
    #[track_caller]
    pub fn spawn<F>(self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tracing::trace!(
            task.name = ?self.name,
            task.output = %type_name::<F::Output>(),
            "spawning named task"
        );
        crate::scheduler::current_or_panic().spawn_on(future, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Scheduler;

    #[test]
    fn named_spawn_runs_and_resolves() {
        let scheduler = Scheduler::new();
        let value = scheduler.block_on(|| async {
            let handle = TaskBuilder::new().name("adder").spawn(async { 1 + 1 });
            handle.await
        });
        assert_eq!(value, 2);
    }
}
