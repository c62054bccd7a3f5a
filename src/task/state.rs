// Copyright 2026 stask contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The four-state lifecycle of a spawned task's shared control block (§4.3.1).
//!
//! Transliterated from the original C++ `SpawnTaskPromiseState`'s `State` enum. The refcount half
//! of that source type has no counterpart here: `Arc`'s own strong count plays that role (see
//! `DESIGN.md`, Open Question 3).

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u8)]
pub(crate) enum Lifecycle {
    /// Spawned, not yet polled for the first time.
    Init = 0,
    /// Polled at least once; not finished; no one is currently awaiting its `JoinHandle`.
    InProgress = 1,
    /// Polled at least once; not finished; a `JoinHandle` has registered a waker and is awaiting.
    WaitingToResume = 2,
    /// The body has completed (with a value or a panic payload); the result slot is populated.
    Finish = 3,
}

fn from_u8(raw: u8) -> Lifecycle {
    match raw {
        0 => Lifecycle::Init,
        1 => Lifecycle::InProgress,
        2 => Lifecycle::WaitingToResume,
        3 => Lifecycle::Finish,
        _ => unreachable!("invalid task lifecycle state {raw}"),
    }
}

static_assertions::const_assert_eq!(
    std::mem::size_of::<AtomicU8>(),
    std::mem::size_of::<u8>()
);

pub(crate) struct State(AtomicU8);

impl State {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(Lifecycle::Init as u8))
    }

    pub(crate) fn snapshot(&self) -> Lifecycle {
        from_u8(self.0.load(Ordering::Acquire))
    }

    /// INIT -> IN_PROGRESS. Idempotent: only the very first call (the task's first poll) performs
    /// the transition; later calls (re-polls after a wake-driven requeue) are no-ops, since the
    /// compare-exchange only ever matches from `Init`.
    pub(crate) fn start(&self) {
        let _ = self.0.compare_exchange(
            Lifecycle::Init as u8,
            Lifecycle::InProgress as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Called when a `JoinHandle` begins awaiting an unfinished task. Returns the state observed
    /// immediately before this call, so the caller can tell whether the task had already finished
    /// in the meantime.
    pub(crate) fn begin_wait(&self) -> Lifecycle {
        from_u8(self.0.swap(Lifecycle::WaitingToResume as u8, Ordering::AcqRel))
    }

    /// Called once, when the task's future resolves (value or panic). Returns the state observed
    /// immediately before the transition, which the caller uses to decide whether a registered
    /// waiter must be woken (§4.3.2's final-suspend decision table).
    pub(crate) fn finish(&self) -> Lifecycle {
        from_u8(self.0.swap(Lifecycle::Finish as u8, Ordering::AcqRel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_init() {
        assert_eq!(State::new().snapshot(), Lifecycle::Init);
    }

    #[test]
    fn start_transitions_once() {
        let state = State::new();
        state.start();
        assert_eq!(state.snapshot(), Lifecycle::InProgress);
        // A second call observes InProgress already, and does nothing further.
        state.start();
        assert_eq!(state.snapshot(), Lifecycle::InProgress);
    }

    #[test]
    fn begin_wait_then_finish_observes_waiting_to_resume() {
        let state = State::new();
        state.start();
        let prev = state.begin_wait();
        assert_eq!(prev, Lifecycle::InProgress);
        assert_eq!(state.snapshot(), Lifecycle::WaitingToResume);

        let prev = state.finish();
        assert_eq!(prev, Lifecycle::WaitingToResume);
        assert_eq!(state.snapshot(), Lifecycle::Finish);
    }

    #[test]
    fn finish_without_waiter_observes_in_progress() {
        let state = State::new();
        state.start();
        let prev = state.finish();
        assert_eq!(prev, Lifecycle::InProgress);
        assert_eq!(state.snapshot(), Lifecycle::Finish);
    }

    #[test]
    fn begin_wait_after_finish_observes_finish() {
        let state = State::new();
        state.start();
        state.finish();
        let prev = state.begin_wait();
        assert_eq!(prev, Lifecycle::Finish);
    }
}
