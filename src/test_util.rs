// Copyright 2026 stask contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Test-only helper for asserting frame lifecycle invariants (§8.1).

use std::sync::atomic::{AtomicUsize, Ordering};

static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);
static DROPPED: AtomicUsize = AtomicUsize::new(0);

/// A value that tracks how many live instances of itself currently exist.
///
/// Every construction (`new` or `clone`) increments a global counter; every drop decrements it.
/// [`Counter::alive`] is the running difference, used by scenario tests (S1, S2) to assert that a
/// lazily-constructed `Task<T>` frame is never run (no extra construction) and is destroyed
/// cleanly exactly once (alive count returns to its starting value).
pub(crate) struct Counter;

impl Counter {
    pub(crate) fn new() -> Self {
        CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
        Self
    }

    /// The number of `Counter`s currently alive (constructed minus dropped, across the whole
    /// process — tests read a baseline before constructing their own counters and compare
    /// deltas, since other tests may run concurrently).
    pub(crate) fn alive() -> usize {
        CONSTRUCTED.load(Ordering::SeqCst) - DROPPED.load(Ordering::SeqCst)
    }
}

impl Clone for Counter {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl Drop for Counter {
    fn drop(&mut self) {
        DROPPED.fetch_add(1, Ordering::SeqCst);
    }
}
