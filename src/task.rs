// Copyright 2026 stask contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

pub mod builder;
pub(crate) mod shared;
pub(crate) mod state;

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::error::polled_after_ready;

/// A lazy, single-consumer computation.
///
/// A `Task<T>` does not run until it is first polled (i.e. first `.await`ed). Constructing one —
/// by calling any function that returns `Task<T>` — only allocates the frame; the future inside
/// does not start executing until the `Task` itself is awaited.
///
/// `Task<T>` is move-only and owns its frame outright: dropping a `Task<T>` that was never awaited
/// simply drops the unstarted future, running none of its body (§8 scenario S1). A `Task<T>` that
/// panics while being polled propagates that panic out through the `.await` point that drove it,
/// exactly once.
pub struct Task<T> {
    inner: Option<Pin<Box<dyn Future<Output = T> + 'static>>>,
}

// The only field is a `Box`, which is `Unpin` regardless of what it points to: moving a `Task<T>`
// only moves the pointer, never the heap data the boxed future's own internal self-references (if
// any) point into.
impl<T> Unpin for Task<T> {}

impl<T> Task<T> {
    /// Wraps a future as a lazy `Task<T>`.
    ///
    /// This is the constructor a function returning `Task<T>` is expected to call with its body:
    ///
    /// ```
    /// use stask::Task;
    ///
    /// fn answer() -> Task<i32> {
    ///     Task::new(async { 42 })
    /// }
    /// ```
    pub fn new(future: impl Future<Output = T> + 'static) -> Self {
        Self {
            inner: Some(Box::pin(future)),
        }
    }
}

impl<T> Future for Task<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let fut = match self.inner.as_mut() {
            Some(fut) => fut,
            None => polled_after_ready("Task"),
        };

        // Emulates the "unhandled-error hook" of §4.2: a panic inside the body is captured here,
        // at the point the frame would otherwise complete, and resumed below so it propagates out
        // through this same `.await` point, matching "rethrown at the consumer boundary".
        match catch_unwind(AssertUnwindSafe(|| fut.as_mut().poll(cx))) {
            Ok(Poll::Pending) => Poll::Pending,
            Ok(Poll::Ready(value)) => {
                self.inner = None;
                Poll::Ready(value)
            }
            Err(payload) => {
                self.inner = None;
                std::panic::resume_unwind(payload)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::Counter;

    #[test]
    fn construction_does_not_run_the_body() {
        let pre_existing = Counter::alive();
        let c = Counter::new();
        assert_eq!(Counter::alive(), pre_existing + 1);

        fn f(c: Counter) -> Task<Counter> {
            Task::new(async move { c })
        }

        let task = f(c);
        // Moving `c` into the async block does not run it; the counter is still alive, still
        // owned by the unstarted future inside `task`.
        assert_eq!(Counter::alive(), pre_existing + 1);
        drop(task);
        assert_eq!(Counter::alive(), pre_existing);
    }

    #[test]
    #[should_panic(expected = "Task polled again after it already resolved")]
    fn polling_after_ready_panics() {
        let mut task = Task::new(async { 1 });
        let waker = crate::scheduler::noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert_eq!(Pin::new(&mut task).poll(&mut cx), Poll::Ready(1));
        let _ = Pin::new(&mut task).poll(&mut cx);
    }

    #[test]
    #[should_panic(expected = "boom")]
    fn panic_in_body_propagates_through_await() {
        let mut task: Task<()> = Task::new(async { panic!("boom") });
        let waker = crate::scheduler::noop_waker();
        let mut cx = Context::from_waker(&waker);
        let _ = Pin::new(&mut task).poll(&mut cx);
    }
}
