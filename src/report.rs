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

use std::fmt;

use crate::{oplog::LockStats, table::Entry};

/// Every live entry of a table, sorted by hash, plus its lock counters.
///
/// Produced by [`Table::snapshot`]. Displays as the two counter lines
/// followed by one `hash,key,value` line per entry.
///
/// [`Table::snapshot`]: ../table/struct.Table.html#method.snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub entries: Vec<Entry>,
    pub acquisitions: u64,
    pub releases: u64,
}

impl Snapshot {
    pub(crate) fn new(entries: Vec<Entry>, stats: LockStats) -> Self {
        Self {
            entries,
            acquisitions: stats.acquisitions,
            releases: stats.releases,
        }
    }

    /// Looks up `key` by linear scan.
    pub fn get(&self, key: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|entry| entry.key() == key)
            .map(Entry::value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of lock acquisitions: {}", self.acquisitions)?;
        writeln!(f, "Number of lock releases: {}", self.releases)?;

        for entry in &self.entries {
            writeln!(f, "{},{},{}", entry.hash(), entry.key(), entry.value())?;
        }

        Ok(())
    }
}
