// MIT License
//
// Copyright (c) 2019 Gregory Meyer
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

//! A concurrent key-value table with per-bucket reader-writer locks, driven
//! by a command log.
//!
//! The core is [`Table`]: a fixed number of buckets, each a chain of entries
//! behind its own [`parking_lot::RwLock`]. Keys are hashed with Jenkins'
//! one-at-a-time hash and routed to `hash % bucket_count`. Every bucket lock
//! acquisition and release is counted and recorded to an [`OperationLog`].
//!
//! [`Dispatcher`] runs a batch of [`Command`]s against a table, one task per
//! command on a pool of worker threads, and reports the final contents once
//! every task has finished.
//!
//! ```
//! use chash::{Command, Config, Dispatcher};
//!
//! let dispatcher = Dispatcher::new(Config::new().with_workers(1)).unwrap();
//! let report = dispatcher.run_all(&[
//!     Command::insert("Alice", 50000),
//!     Command::insert("Bob", 60000),
//!     Command::delete("Bob"),
//! ]);
//!
//! assert_eq!(report.snapshot.len(), 1);
//! assert_eq!(report.snapshot.get("Alice"), Some(50000));
//! assert_eq!(report.snapshot.acquisitions, report.snapshot.releases);
//! ```
//!
//! [`Table`]: table/struct.Table.html
//! [`parking_lot::RwLock`]: https://docs.rs/parking_lot/0.12/parking_lot/type.RwLock.html
//! [`OperationLog`]: oplog/struct.OperationLog.html
//! [`Dispatcher`]: dispatch/struct.Dispatcher.html
//! [`Command`]: command/struct.Command.html

pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod hash;
pub mod key;
pub mod oplog;
pub mod report;
pub mod table;

pub use command::{Command, Operation, Script};
pub use config::Config;
pub use dispatch::{run_all, Dispatcher, Outcome, Report};
pub use error::{Error, Result};
pub use key::Key;
pub use oplog::{LockStats, OperationLog};
pub use report::Snapshot;
pub use table::{Entry, Table};
