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

use std::io;

use thiserror::Error;

/// Errors produced by the table, the dispatcher and the command-log reader.
///
/// Everything except [`NoBuckets`] and [`Io`] is local to a single operation:
/// the dispatcher records it against the failing command and carries on.
///
/// [`NoBuckets`]: #variant.NoBuckets
/// [`Io`]: #variant.Io
#[derive(Debug, Error)]
pub enum Error {
    #[error("key is empty")]
    EmptyKey,

    #[error("key is {len} bytes long, the maximum is {max}")]
    KeyTooLong { len: usize, max: usize },

    #[error("could not allocate an entry for a {len} byte key")]
    AllocationFailure { len: usize },

    #[error("unknown operation `{0}`")]
    UnknownOperation(String),

    #[error("insert of `{0}` has no value")]
    MissingValue(String),

    #[error("a table needs at least one bucket")]
    NoBuckets,

    #[error("command log does not start with a `threads` directive")]
    MissingDirective,

    #[error("invalid directive `{0}`")]
    InvalidDirective(String),

    #[error("worker thread panicked before completing its command")]
    WorkerPanicked,

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
