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

use std::{iter, mem};

use crate::{
    error::{Error, Result},
    key::Key,
};

/// A key-value pair stored in the table, along with the key's hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    hash: u32,
    key: String,
    value: u32,
}

impl Entry {
    /// Copies `key` into freshly reserved storage.
    ///
    /// The reservation is fallible, so running out of memory surfaces as
    /// [`Error::AllocationFailure`] instead of aborting the process.
    pub(crate) fn try_new(key: &Key, value: u32) -> Result<Self> {
        let mut owned = String::new();

        #[cfg(test)]
        super::tests::util::maybe_fail_allocation(key.len())?;

        owned
            .try_reserve_exact(key.len())
            .map_err(|_| Error::AllocationFailure { len: key.len() })?;
        owned.push_str(key);

        Ok(Self {
            hash: key.hash(),
            key: owned,
            value,
        })
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub(crate) fn replace_value(&mut self, value: u32) -> u32 {
        mem::replace(&mut self.value, value)
    }

    pub fn into_parts(self) -> (u32, String, u32) {
        (self.hash, self.key, self.value)
    }

    fn matches(&self, key: &Key) -> bool {
        self.hash == key.hash() && self.key == key.as_str()
    }
}

#[derive(Debug)]
struct Node {
    entry: Entry,
    next: Option<Box<Node>>,
}

/// A singly linked list of entries, newest first.
///
/// Each node owns its successor. No two nodes share a `(hash, key)` pair.
#[derive(Debug, Default)]
pub(crate) struct Chain {
    head: Option<Box<Node>>,
}

impl Chain {
    pub(crate) fn find(&self, key: &Key) -> Option<&Entry> {
        self.iter().find(|entry| entry.matches(key))
    }

    pub(crate) fn find_mut(&mut self, key: &Key) -> Option<&mut Entry> {
        let mut cursor = self.head.as_deref_mut();

        while let Some(node) = cursor {
            if node.entry.matches(key) {
                return Some(&mut node.entry);
            }

            cursor = node.next.as_deref_mut();
        }

        None
    }

    /// Links `entry` in as the new head.
    ///
    /// The caller must have checked that no entry with the same key exists.
    pub(crate) fn push_front(&mut self, entry: Entry) {
        let next = self.head.take();

        self.head = Some(Box::new(Node { entry, next }));
    }

    /// Unlinks the entry for `key` and hands it back.
    pub(crate) fn remove(&mut self, key: &Key) -> Option<Entry> {
        let mut link = &mut self.head;

        while link
            .as_ref()
            .map_or(false, |node| !node.entry.matches(key))
        {
            link = &mut link.as_mut()?.next;
        }

        let mut removed = link.take()?;
        *link = removed.next.take();

        Some(removed.entry)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Entry> {
        iter::successors(self.head.as_deref(), |node| node.next.as_deref()).map(|node| &node.entry)
    }

    pub(crate) fn len(&self) -> usize {
        self.iter().count()
    }
}

impl Drop for Chain {
    fn drop(&mut self) {
        let mut cursor = self.head.take();

        while let Some(mut node) = cursor {
            cursor = node.next.take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::table::tests::util;

    fn key(name: &str) -> Key {
        Key::new(name).unwrap()
    }

    fn chain_of(names: &[&str]) -> Chain {
        let mut chain = Chain::default();

        for (i, name) in names.iter().enumerate() {
            chain.push_front(Entry::try_new(&key(name), i as u32).unwrap());
        }

        chain
    }

    fn keys(chain: &Chain) -> Vec<&str> {
        chain.iter().map(Entry::key).collect()
    }

    #[test]
    fn push_front_prepends() {
        let chain = chain_of(&["a", "b", "c"]);

        assert_eq!(keys(&chain), vec!["c", "b", "a"]);
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn find_compares_key_not_just_hash() {
        let chain = chain_of(&["a"]);
        let impostor = Key::with_hash("b", key("a").hash());

        assert!(chain.find(&key("a")).is_some());
        assert!(chain.find(&impostor).is_none());
    }

    #[test]
    fn find_mut_updates_in_place() {
        let mut chain = chain_of(&["a", "b"]);

        chain.find_mut(&key("a")).unwrap().value = 42;

        assert_eq!(chain.find(&key("a")).map(Entry::value), Some(42));
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn remove_head_middle_tail() {
        let mut chain = chain_of(&["a", "b", "c", "d"]);

        assert_eq!(chain.remove(&key("d")).map(|e| e.value()), Some(3));
        assert_eq!(keys(&chain), vec!["c", "b", "a"]);

        assert_eq!(chain.remove(&key("b")).map(|e| e.value()), Some(1));
        assert_eq!(keys(&chain), vec!["c", "a"]);

        assert_eq!(chain.remove(&key("a")).map(|e| e.value()), Some(0));
        assert_eq!(keys(&chain), vec!["c"]);

        assert_eq!(chain.remove(&key("c")).map(|e| e.value()), Some(2));
        assert!(keys(&chain).is_empty());
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut chain = chain_of(&["a", "b"]);

        assert!(chain.remove(&key("z")).is_none());
        assert_eq!(keys(&chain), vec!["b", "a"]);

        let mut empty = Chain::default();
        assert!(empty.remove(&key("z")).is_none());
    }

    #[test]
    fn long_chain_drops_without_overflow() {
        let mut chain = Chain::default();
        let k = key("k");

        for i in 0..200_000 {
            chain.push_front(Entry {
                hash: k.hash(),
                key: String::new(),
                value: i,
            });
        }

        drop(chain);
    }

    #[test]
    fn injected_allocation_failure() {
        util::fail_next_allocation();

        assert!(matches!(
            Entry::try_new(&key("abc"), 1),
            Err(Error::AllocationFailure { len: 3 })
        ));
        assert!(Entry::try_new(&key("abc"), 1).is_ok());
    }
}
