// Copyright 2026 stask contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The single-threaded cooperative scheduler (§4.4).

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::ptr;
use std::sync::Arc;
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

use crate::error::spawn_outside_scheduler;
use crate::id::Id;
use crate::join_handle::JoinHandle;
use crate::task::shared::{RawTask, Shared};

thread_local! {
    static CURRENT: Cell<*const Scheduler> = const { Cell::new(ptr::null()) };
}

/// An RAII guard that restores the previously bound scheduler (possibly none) on drop, including
/// during unwinding — this is how `CURRENT_SCHEDULER` is "unconditionally cleared on error exits"
/// (§9) without manual try/finally bookkeeping.
struct BindGuard {
    previous: *const Scheduler,
}

impl Drop for BindGuard {
    fn drop(&mut self) {
        CURRENT.with(|cell| cell.set(self.previous));
    }
}

/// A FIFO, single-threaded cooperative scheduler.
///
/// All frames associated with one `Scheduler` run on the thread that calls
/// [`block_on`][Scheduler::block_on]; there is no preemption and no work-stealing. Use
/// [`spawn`] from inside a running `block_on` to submit additional work; use
/// [`Scheduler::block_on`] to drive one designated computation (and, transitively, anything it
/// spawns) to completion.
pub struct Scheduler {
    ready: RefCell<VecDeque<Arc<dyn RawTask>>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Creates a new, empty scheduler with no bound relationship to the current thread yet.
    pub fn new() -> Self {
        Self {
            ready: RefCell::new(VecDeque::new()),
        }
    }

    fn bind(&self) -> BindGuard {
        let previous = CURRENT.with(|cell| cell.replace(self as *const Scheduler));
        BindGuard { previous }
    }

    pub(crate) fn schedule(&self, task: Arc<dyn RawTask>) {
        self.ready.borrow_mut().push_back(task);
    }

    pub(crate) fn spawn_on<F>(&self, future: F, name: Option<&'static str>) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let id = Id::next();
        tracing::trace_span!("spawn", task.tid = id.as_u64(), task.name = ?name).in_scope(|| {
            let shared = Shared::new(future, id, name);
            self.schedule(Arc::clone(&shared) as Arc<dyn RawTask>);
            JoinHandle::new(shared)
        })
    }

    /// Drives `factory()` to completion on the current thread, running any task spawned (directly
    /// or transitively) along the way.
    ///
    /// Binds the thread-local "current scheduler" for the call's duration (restored, even on
    /// panic, once this returns — see [`BindGuard`]), so that [`spawn`] can be called from within
    /// `factory`'s body or from any task it spawns.
    pub fn block_on<Fut>(&self, factory: impl FnOnce() -> Fut) -> Fut::Output
    where
        Fut: Future,
    {
        let _guard = self.bind();
        let mut root = std::pin::pin!(factory());

        // The root is re-polled unconditionally every outer iteration (step 1 below), so a waker
        // that does nothing is sufficient: forward progress does not depend on this waker ever
        // firing (§9, DESIGN.md Open Question 2).
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);

        let value = loop {
            // 1. Poll the root task.
            if let Poll::Ready(value) = root.as_mut().poll(&mut cx) {
                break value;
            }
            // 2. Pop at most one ready task per outer iteration and run it (§9: replaces the
            //    source's spinny fixed-count inner loop).
            let next = self.ready.borrow_mut().pop_front();
            if let Some(task) = next {
                task.run();
            }
        };

        // The root can resolve on its very first poll (an `async` body with no `.await` of its
        // own), before any task it just spawned has ever been popped. Drain whatever is left in
        // the queue — including anything a drained task's own wake re-enqueues — so every spawned
        // task still runs exactly once, regardless of whether its `JoinHandle` was awaited,
        // dropped, or moved (§8 property P2).
        while let Some(task) = self.ready.borrow_mut().pop_front() {
            task.run();
        }

        value
    }
}

/// Submits `future` onto the currently running [`Scheduler`], returning a [`JoinHandle`] that can
/// be awaited for its result.
///
/// # Panics
///
/// Panics if called outside of a [`Scheduler::block_on`] call on this thread.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    current_or_panic().spawn_on(future, None)
}

/// Returns a reference to the currently bound scheduler, panicking with a programmer-error
/// message if none is bound (i.e. called outside of [`Scheduler::block_on`]).
pub(crate) fn current_or_panic() -> &'static Scheduler {
    let scheduler = CURRENT.with(|cell| cell.get());
    if scheduler.is_null() {
        spawn_outside_scheduler();
    }
    // Safety: `scheduler` is only ever non-null for the dynamic extent of a `Scheduler::block_on`
    // call on this thread (set in `Scheduler::bind`, restored by `BindGuard::drop` before
    // `block_on` returns), and `block_on` holds `&self` alive for that whole extent. The
    // `'static` lifetime here is a convenience for callers that, like `spawn` and
    // `TaskBuilder::spawn`, only ever use the reference transiently within that same extent; it
    // must not be stored past the call that obtained it.
    unsafe { &*scheduler }
}

pub(crate) fn reschedule(task: Arc<dyn RawTask>) {
    let scheduler = CURRENT.with(|cell| cell.get());
    if scheduler.is_null() {
        // The scheduler that owned this task has already returned from `block_on`. This can only
        // happen if a task's `Waker` outlives the `block_on` call that spawned it, which this
        // crate's API gives no way to observe (there is no cross-`block_on` task handle) — so
        // there is nothing meaningful to reschedule onto. Dropping the wake is correct.
        return;
    }
    // Safety: see `spawn` above.
    unsafe { &*scheduler }.schedule(task);
}

/// A `Waker` that does nothing when woken. Used for the `block_on` root (see
/// [`Scheduler::block_on`]'s doc comment) and in isolated `Task<T>` tests.
pub(crate) fn noop_waker() -> Waker {
    fn no_op(_: *const ()) {}
    fn clone(_: *const ()) -> RawWaker {
        raw_waker()
    }
    fn raw_waker() -> RawWaker {
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
        RawWaker::new(ptr::null(), &VTABLE)
    }
    // Safety: the vtable's functions are all no-ops or return an identical no-op waker; none of
    // them dereference the data pointer, so a null pointer is sound here.
    unsafe { Waker::from_raw(raw_waker()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tracing_subscriber::util::SubscriberInitExt;

    fn test_subscriber() -> tracing::subscriber::DefaultGuard {
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter("trace")
            .set_default()
    }

    #[test]
    fn block_on_returns_factory_result() {
        let _trace = test_subscriber();
        let scheduler = Scheduler::new();
        let value = scheduler.block_on(|| async { 7 });
        assert_eq!(value, 7);
    }

    #[test]
    fn spawn_outside_block_on_panics() {
        let result = std::panic::catch_unwind(|| spawn(async { 1 }));
        assert!(result.is_err());
    }

    #[test]
    fn block_on_returns_one_live_counter_then_zero() {
        use crate::test_util::Counter;

        let baseline = Counter::alive();
        let scheduler = Scheduler::new();
        let counter = scheduler.block_on(|| async { Counter::new() });
        assert_eq!(Counter::alive(), baseline + 1);
        drop(counter);
        assert_eq!(Counter::alive(), baseline);
    }

    #[test]
    fn spawn_and_join_returns_100() {
        let scheduler = Scheduler::new();
        let value = scheduler.block_on(|| async {
            let handle = spawn(async { 100 });
            handle.await
        });
        assert_eq!(value, 100);
    }

    #[test]
    fn dropping_join_handle_still_runs_task_once() {
        let scheduler = Scheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        scheduler.block_on(|| async move {
            let handle = spawn(async move {
                count_clone.fetch_add(1, Ordering::SeqCst);
            });
            drop(handle);
            // A genuine suspension point, so the scheduler gets a turn to run the dropped-handle
            // task before the root resolves (rather than relying on the post-root drain below).
            spawn(async {}).await;
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn spawns_run_in_fifo_order() {
        let scheduler = Scheduler::new();
        let order = Arc::new(Mutex::new(String::new()));
        scheduler.block_on(|| {
            let order = Arc::clone(&order);
            async move {
                let a = {
                    let order = Arc::clone(&order);
                    spawn(async move { order.lock().unwrap().push('A') })
                };
                let b = {
                    let order = Arc::clone(&order);
                    spawn(async move { order.lock().unwrap().push('B') })
                };
                let c = {
                    let order = Arc::clone(&order);
                    spawn(async move { order.lock().unwrap().push('C') })
                };
                a.await;
                b.await;
                c.await;
            }
        });
        assert_eq!(&*order.lock().unwrap(), "ABC");
    }

    #[test]
    fn error_in_root_propagates_out_of_block_on() {
        let scheduler = Scheduler::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            scheduler.block_on(|| async {
                let handle = spawn(async { panic!("spawned task exploded") });
                handle.await
            })
        }));
        let err = result.expect_err("block_on should propagate the panic");
        let message = err
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| err.downcast_ref::<String>().map(String::as_str))
            .unwrap_or_default();
        assert_eq!(message, "spawned task exploded");
    }

    #[test]
    fn current_scheduler_is_nil_after_block_on_including_on_panic() {
        assert!(CURRENT.with(|cell| cell.get().is_null()));

        let scheduler = Scheduler::new();
        scheduler.block_on(|| async { 1 });
        assert!(CURRENT.with(|cell| cell.get().is_null()));

        let scheduler = Scheduler::new();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            scheduler.block_on(|| async { panic!("boom") })
        }));
        assert!(CURRENT.with(|cell| cell.get().is_null()));
    }

    #[test]
    fn nested_block_on_restores_outer_scheduler() {
        let outer = Scheduler::new();
        outer.block_on(|| async {
            let outer_ptr = CURRENT.with(|cell| cell.get());
            let inner = Scheduler::new();
            let value = inner.block_on(|| async { 5 });
            assert_eq!(value, 5);
            assert_eq!(CURRENT.with(|cell| cell.get()), outer_ptr);
        });
    }
}
