// Copyright 2026 stask contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The awaitable handle to a spawned task's result (§4.3.3).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::error::polled_after_ready;
use crate::id::Id;
use crate::task::shared::Shared;
use crate::task::state::Lifecycle;

/// A handle to a task submitted with [`crate::spawn`].
///
/// Awaiting a `JoinHandle<T>` resolves to the spawned task's result once it completes. A
/// `JoinHandle` need not be awaited: the task it names still runs to completion (exactly once,
/// §8 property P2) even if its `JoinHandle` is dropped first, in which case the result — or a
/// panic payload, if the task panicked — is silently discarded.
pub struct JoinHandle<T> {
    shared: Option<Arc<Shared<T>>>,
}

impl<T: Send + 'static> JoinHandle<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>) -> Self {
        Self {
            shared: Some(shared),
        }
    }

    /// The id this task was spawned with.
    pub fn id(&self) -> Id {
        self.shared
            .as_ref()
            .expect("JoinHandle::id called after completion")
            .id()
    }

    /// Returns `true` if the task has already run to completion.
    ///
    /// This never suspends and never consumes the handle; it is safe to call repeatedly.
    pub fn is_finished(&self) -> bool {
        self.shared.as_ref().is_some_and(|s| s.is_finished())
    }
}

impl<T: Send + 'static> Future for JoinHandle<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let shared = match self.shared.as_ref() {
            Some(shared) => shared,
            None => polled_after_ready("JoinHandle"),
        };

        if shared.is_finished() {
            let result = shared.take_result();
            self.shared = None;
            return Poll::Ready(resolve(result));
        }

        // Single-threaded, non-reentrant execution means the task cannot finish "between" the
        // check above and this registration — nothing else runs while this function's stack frame
        // is live. `begin_wait`'s return value is still checked, as a correctness net documenting
        // that invariant rather than as a race that can actually occur (§5).
        let prev = shared.register_waiter(cx.waker());
        debug_assert_ne!(
            prev,
            Lifecycle::Finish,
            "task finished between the ready-check and waiter registration; \
             impossible under single-threaded, non-reentrant execution"
        );

        Poll::Pending
    }
}

fn resolve<T>(result: Result<T, Box<dyn std::any::Any + Send>>) -> T {
    match result {
        Ok(value) => value,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}
