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

use std::{fmt, ops::Deref};

use crate::{
    error::{Error, Result},
    hash,
};

/// A validated table key.
///
/// Keys are between 1 and [`MAX_LEN`] bytes of UTF-8. The key's hash is
/// computed once, when the key is created.
///
/// [`MAX_LEN`]: #associatedconstant.MAX_LEN
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Key {
    name: String,
    hash: u32,
}

impl Key {
    /// The longest key, in bytes, that the table will store.
    pub const MAX_LEN: usize = 49;

    /// Validates `name` and computes its hash.
    ///
    /// Fails with [`Error::EmptyKey`] or [`Error::KeyTooLong`] rather than
    /// truncating.
    pub fn new<S: Into<String>>(name: S) -> Result<Self> {
        let name = name.into();

        if name.is_empty() {
            return Err(Error::EmptyKey);
        }

        if name.len() > Self::MAX_LEN {
            return Err(Error::KeyTooLong {
                len: name.len(),
                max: Self::MAX_LEN,
            });
        }

        let hash = hash::one_at_a_time(name.as_bytes());

        Ok(Self { name, hash })
    }

    /// Builds a key with a forced hash, for exercising collisions.
    #[cfg(test)]
    pub(crate) fn with_hash(name: &str, hash: u32) -> Self {
        Self {
            name: name.to_string(),
            hash,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }
}

impl Deref for Key {
    type Target = str;

    fn deref(&self) -> &str {
        &self.name
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl TryFrom<&str> for Key {
    type Error = Error;

    fn try_from(name: &str) -> Result<Self> {
        Self::new(name)
    }
}

impl TryFrom<String> for Key {
    type Error = Error;

    fn try_from(name: String) -> Result<Self> {
        Self::new(name)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
