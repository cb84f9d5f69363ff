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

use std::cell::Cell;

use crate::{
    error::{Error, Result},
    hash,
    key::Key,
};

thread_local! {
    static FAIL_NEXT_ALLOCATION: Cell<bool> = Cell::new(false);
}

/// Makes the next entry allocation on the calling thread fail.
pub(crate) fn fail_next_allocation() {
    FAIL_NEXT_ALLOCATION.with(|fail| fail.set(true));
}

pub(crate) fn maybe_fail_allocation(len: usize) -> Result<()> {
    if FAIL_NEXT_ALLOCATION.with(|fail| fail.replace(false)) {
        Err(Error::AllocationFailure { len })
    } else {
        Ok(())
    }
}

/// Returns `count` distinct keys that all route to bucket `index` of a table
/// with `bucket_count` buckets.
pub(crate) fn colliding_keys(count: usize, bucket_count: usize, index: usize) -> Vec<Key> {
    (0u64..)
        .map(|i| format!("key{}", i))
        .filter(|name| hash::one_at_a_time(name.as_bytes()) as usize % bucket_count == index)
        .take(count)
        .map(|name| Key::new(name).unwrap())
        .collect()
}
