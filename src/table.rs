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

//! A concurrent hash table with separate chaining and one reader-writer lock
//! per bucket.

mod chain;
mod guard;


pub use chain::Entry;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{
    error::{Error, Result},
    key::Key,
    oplog::{Event, LockCounters, LockKind, LockStats, OperationLog},
    report::Snapshot,
};

use chain::Chain;
use guard::Instrumented;

#[derive(Debug, Default)]
struct Bucket {
    chain: RwLock<Chain>,
}

/// A fixed-size concurrent hash table mapping string keys to `u32` values.
///
/// Keys are routed to `hash % bucket_count`, where `hash` is the key's
/// [one-at-a-time] hash and `bucket_count` is fixed at construction. Each
/// bucket holds a chain of entries guarded by its own reader-writer lock:
/// [`search`] takes it shared, [`insert`] and [`delete`] take it exclusive.
/// No operation ever holds more than one bucket lock, so operations on
/// different buckets never wait for each other and cannot deadlock.
///
/// Every acquisition and release is counted and written to the table's
/// [`OperationLog`].
///
/// When an insert and a delete of the same key race, the final state is
/// whichever of them took the bucket lock last. Which one that is depends on
/// the scheduler.
///
/// [one-at-a-time]: ../hash/fn.one_at_a_time.html
/// [`search`]: #method.search
/// [`insert`]: #method.insert
/// [`delete`]: #method.delete
/// [`OperationLog`]: ../oplog/struct.OperationLog.html
#[derive(Debug)]
pub struct Table {
    buckets: Box<[Bucket]>,
    counters: LockCounters,
    log: OperationLog,
}

impl Table {
    /// Creates an empty `Table` with `bucket_count` buckets that discards its
    /// operation log.
    ///
    /// Fails with [`Error::NoBuckets`] if `bucket_count == 0`.
    pub fn new(bucket_count: usize) -> Result<Self> {
        Self::with_log(bucket_count, OperationLog::discard())
    }

    /// Creates an empty `Table` with `bucket_count` buckets that records its
    /// lock activity and operations to `log`.
    ///
    /// Fails with [`Error::NoBuckets`] if `bucket_count == 0`.
    pub fn with_log(bucket_count: usize, log: OperationLog) -> Result<Self> {
        if bucket_count == 0 {
            return Err(Error::NoBuckets);
        }

        let buckets = (0..bucket_count)
            .map(|_| Bucket::default())
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            buckets,
            counters: LockCounters::new(),
            log,
        })
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the bucket index `key` is routed to.
    pub fn bucket_index(&self, key: &Key) -> usize {
        key.hash() as usize % self.buckets.len()
    }

    pub fn log(&self) -> &OperationLog {
        &self.log
    }

    /// Reads the lock acquisition and release counters.
    pub fn lock_stats(&self) -> LockStats {
        self.counters.stats()
    }

    /// Associates `value` with `key`, returning the value it replaced.
    ///
    /// If `key` is already present its value is overwritten in place and no
    /// new entry is created. Otherwise a new entry is linked in at the head of
    /// the bucket's chain.
    ///
    /// If the new entry cannot be allocated, returns
    /// [`Error::AllocationFailure`] and leaves the table unchanged. The insert
    /// is then not recorded in the log. The bucket lock is released in either
    /// case.
    pub fn insert(&self, key: &Key, value: u32) -> Result<Option<u32>> {
        let mut chain = self.write(key);

        let previous = match chain.find_mut(key) {
            Some(entry) => Some(entry.replace_value(value)),
            None => {
                chain.push_front(Entry::try_new(key, value)?);

                None
            }
        };

        chain.log().record(Event::Insert {
            hash: key.hash(),
            key: key.as_str(),
            value,
        });

        Ok(previous)
    }

    /// Removes `key` from the table, returning its entry if it was present.
    ///
    /// Deleting an absent key is not an error and changes nothing.
    pub fn delete(&self, key: &Key) -> Option<Entry> {
        let mut chain = self.write(key);

        chain.log().record(Event::Delete {
            hash: key.hash(),
            key: key.as_str(),
        });

        chain.remove(key)
    }

    /// Returns the value associated with `key`, if any.
    ///
    /// Searches of the same bucket run concurrently with each other.
    pub fn search(&self, key: &Key) -> Option<u32> {
        let chain = self.read(key);

        chain.log().record(Event::Search {
            hash: key.hash(),
            key: key.as_str(),
        });

        chain.find(key).map(Entry::value)
    }

    /// Returns the number of entries in the table.
    ///
    /// Buckets are visited one at a time, so concurrent modification makes
    /// the result approximate.
    pub fn len(&self) -> usize {
        self.buckets
            .iter()
            .map(|bucket| bucket.chain.read().len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the length of the chain in bucket `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.bucket_count()`.
    pub fn bucket_len(&self, index: usize) -> usize {
        self.buckets[index].chain.read().len()
    }

    /// Collects every entry, sorted by hash, together with the lock counters.
    ///
    /// Intended for use once all operations have completed. The counters are
    /// read first; the traversal itself takes each bucket's shared lock in
    /// turn but is neither counted nor logged. Entries with equal hashes keep
    /// the order in which the traversal met them.
    pub fn snapshot(&self) -> Snapshot {
        let stats = self.counters.stats();

        let mut entries: Vec<Entry> = self
            .buckets
            .iter()
            .flat_map(|bucket| bucket.chain.read().iter().cloned().collect::<Vec<_>>())
            .collect();

        entries.sort_by_key(Entry::hash);

        Snapshot::new(entries, stats)
    }

    fn read(&self, key: &Key) -> Instrumented<'_, RwLockReadGuard<'_, Chain>> {
        let guard = self.bucket(key).chain.read();

        Instrumented::new(guard, LockKind::Read, &self.counters, &self.log)
    }

    fn write(&self, key: &Key) -> Instrumented<'_, RwLockWriteGuard<'_, Chain>> {
        let guard = self.bucket(key).chain.write();

        Instrumented::new(guard, LockKind::Write, &self.counters, &self.log)
    }

    fn bucket(&self, key: &Key) -> &Bucket {
        &self.buckets[self.bucket_index(key)]
    }
}
