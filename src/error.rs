// Copyright 2026 stask contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Programmer-error reporting.
//!
//! Every failure mode this crate's core can hit is either a captured-and-rethrown panic (a user
//! computation error, see [`crate::task`]) or a precondition violation that indicates a bug in the
//! caller rather than a recoverable condition. The latter are reported as plain panics with a fixed
//! message, centralized here so the wording stays consistent across call sites — the same shape the
//! standard library uses for e.g. `Option::unwrap`.

/// A [`crate::spawn`] was called with no [`crate::Scheduler::block_on`] active on this thread.
#[track_caller]
pub(crate) fn spawn_outside_scheduler() -> ! {
    panic!("stask::spawn called outside of a running Scheduler::block_on")
}

/// A `Task<T>` or `JoinHandle<T>` was polled again after it had already resolved.
#[track_caller]
pub(crate) fn polled_after_ready(kind: &str) -> ! {
    panic!("{kind} polled again after it already resolved")
}
