// MIT License
//
// Copyright (c) 2020 Gregory Meyer
//
// Permission is hereby granted, free of charge, to any person
// obtaining a copy of this software and associated documentation files
// (the "Software"), to deal in the Software without restriction,
// including without limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of the Software,
// and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS
// BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN
// ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use std::{
    mem::ManuallyDrop,
    ops::{Deref, DerefMut},
};

use crate::oplog::{Event, LockCounters, LockKind, OperationLog};

use super::chain::Chain;

/// A bucket lock guard that reports its own acquisition and release.
///
/// Creating one counts an acquisition and logs it; dropping one unlocks the
/// bucket first and only then counts and logs the release. Because release
/// happens in `Drop`, it runs on every exit path, early returns and unwinding
/// included.
pub(crate) struct Instrumented<'a, G: Deref<Target = Chain>> {
    guard: ManuallyDrop<G>,
    kind: LockKind,
    counters: &'a LockCounters,
    log: &'a OperationLog,
}

impl<'a, G: Deref<Target = Chain>> Instrumented<'a, G> {
    /// Wraps a freshly acquired `guard`.
    pub(crate) fn new(
        guard: G,
        kind: LockKind,
        counters: &'a LockCounters,
        log: &'a OperationLog,
    ) -> Self {
        counters.acquired();
        log.record(Event::LockAcquired(kind));

        Self {
            guard: ManuallyDrop::new(guard),
            kind,
            counters,
            log,
        }
    }

    pub(crate) fn log(&self) -> &'a OperationLog {
        self.log
    }
}

impl<G: Deref<Target = Chain>> Deref for Instrumented<'_, G> {
    type Target = Chain;

    fn deref(&self) -> &Chain {
        &self.guard
    }
}

impl<G: DerefMut<Target = Chain>> DerefMut for Instrumented<'_, G> {
    fn deref_mut(&mut self) -> &mut Chain {
        &mut self.guard
    }
}

impl<G: Deref<Target = Chain>> Drop for Instrumented<'_, G> {
    fn drop(&mut self) {
        // SAFETY: `guard` is dropped exactly once, here, and never touched again.
        unsafe { ManuallyDrop::drop(&mut self.guard) };

        self.counters.released();
        self.log.record(Event::LockReleased(self.kind));
    }
}
