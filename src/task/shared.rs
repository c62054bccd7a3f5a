// Copyright 2026 stask contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The reference-counted control block backing a spawned task (§3's `SpawnPromise<T>`, §4.3).

use std::any::Any;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Wake, Waker};

use crate::id::Id;
use crate::task::state::{Lifecycle, State};

pub(crate) type PanicPayload = Box<dyn Any + Send + 'static>;

pub(crate) enum Slot<T> {
    Pending(Pin<Box<dyn Future<Output = T> + Send + 'static>>),
    Ready(Result<T, PanicPayload>),
    /// The result has already been handed to the one `JoinHandle` allowed to read it.
    Taken,
}

/// The type-erased, runnable half of the scheduler's ready-queue entries.
///
/// Every `Arc<Shared<T>>` clone the scheduler ever holds — either directly in its queue, or
/// transiently inside a `Waker` waiting to fire — is coerced to `Arc<dyn RawTask>` through this
/// trait so the queue can hold tasks of unrelated `T`.
pub(crate) trait RawTask: Send + Sync {
    fn run(self: Arc<Self>);
}

pub(crate) struct Shared<T> {
    id: Id,
    name: Option<&'static str>,
    state: State,
    slot: Mutex<Slot<T>>,
    waiter: Mutex<Option<Waker>>,
}

impl<T: Send + 'static> Shared<T> {
    pub(crate) fn new(
        future: impl Future<Output = T> + Send + 'static,
        id: Id,
        name: Option<&'static str>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            name,
            state: State::new(),
            slot: Mutex::new(Slot::Pending(Box::pin(future))),
            waiter: Mutex::new(None),
        })
    }

    pub(crate) fn id(&self) -> Id {
        self.id
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.state.snapshot() == Lifecycle::Finish
    }

    /// Takes the result out of the slot, if the task has finished. Panics if called a second time
    /// (`JoinHandle::poll` only ever calls this once it has observed `Finish`).
    pub(crate) fn take_result(&self) -> Result<T, PanicPayload> {
        let mut slot = self.slot.lock().unwrap();
        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Ready(result) => result,
            Slot::Pending(_) | Slot::Taken => {
                unreachable!("take_result called before the task finished, or called twice")
            }
        }
    }

    /// Registers `waker` to be woken when this task finishes, and transitions the state to
    /// `WaitingToResume`. Returns the state observed immediately beforehand; the caller
    /// (`JoinHandle::poll`) uses this to detect the (single-threaded-impossible, but checked)
    /// race against a finish that happened between its own ready-check and this call.
    pub(crate) fn register_waiter(&self, waker: &Waker) -> Lifecycle {
        *self.waiter.lock().unwrap() = Some(waker.clone());
        self.state.begin_wait()
    }

    fn complete(self: &Arc<Self>, result: Result<T, PanicPayload>) {
        *self.slot.lock().unwrap() = Slot::Ready(result);
        let prev = self.state.finish();
        tracing::trace!(task.tid = self.id().as_u64(), task.name = ?self.name, "task finished");
        if prev == Lifecycle::WaitingToResume {
            if let Some(waker) = self.waiter.lock().unwrap().take() {
                waker.wake();
            }
        }
    }
}

impl<T: Send + 'static> RawTask for Shared<T> {
    fn run(self: Arc<Self>) {
        // Idempotent: only the task's very first run performs INIT -> IN_PROGRESS. Re-polls driven
        // by a later wake-driven requeue find the state already IN_PROGRESS and this is a no-op,
        // matching §4.3.1's single INIT-triggered transition.
        self.state.start();

        let waker = Waker::from(Arc::clone(&self));
        let mut cx = Context::from_waker(&waker);

        let mut slot = self.slot.lock().unwrap();
        let fut = match &mut *slot {
            Slot::Pending(fut) => fut,
            // A spurious wake after the task already finished (e.g. the queue held a second,
            // stale entry) — nothing to do.
            Slot::Ready(_) | Slot::Taken => return,
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| fut.as_mut().poll(&mut cx)));
        match outcome {
            Ok(Poll::Pending) => {}
            Ok(Poll::Ready(value)) => {
                drop(slot);
                self.complete(Ok(value));
            }
            Err(payload) => {
                drop(slot);
                self.complete(Err(payload));
            }
        }
    }
}

impl<T: Send + 'static> Wake for Shared<T> {
    fn wake(self: Arc<Self>) {
        crate::scheduler::reschedule(self as Arc<dyn RawTask>);
    }

    fn wake_by_ref(self: &Arc<Self>) {
        crate::scheduler::reschedule(Arc::clone(self) as Arc<dyn RawTask>);
    }
}
