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

//! Fork-join execution of a command log against a [`Table`].
//!
//! A run goes through four phases. The table is built when the
//! [`Dispatcher`] is created. [`run_all`] then hands every command to a pool
//! of scoped worker threads, joins them all, and finally takes a
//! [`Snapshot`] of the table.
//!
//! Each command is executed as its own task: it is validated, performs one
//! table operation, and produces one [`Outcome`]. A command that fails
//! validation or allocation fails alone; the rest of the run is unaffected.
//!
//! [`Table`]: ../table/struct.Table.html
//! [`Dispatcher`]: struct.Dispatcher.html
//! [`run_all`]: struct.Dispatcher.html#method.run_all
//! [`Snapshot`]: ../report/struct.Snapshot.html
//! [`Outcome`]: enum.Outcome.html

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};

use parking_lot::Mutex;

use crate::{
    command::{Command, Operation},
    config::Config,
    error::{Error, Result},
    oplog::{Event, OperationLog},
    report::Snapshot,
    table::Table,
};

/// The result of executing a single command.
#[derive(Debug)]
pub enum Outcome {
    Inserted,
    Updated { previous: u32 },
    Deleted { value: u32 },
    Absent,
    Found(u32),
    NotFound,
    Failed(Error),
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

/// Everything a run produces: the final table contents and lock counters,
/// and one outcome per command in command order.
#[derive(Debug)]
pub struct Report {
    pub snapshot: Snapshot,
    pub outcomes: Vec<Outcome>,
}

/// Owns the table for a run and executes commands against it.
#[derive(Debug)]
pub struct Dispatcher {
    table: Table,
    config: Config,
}

impl Dispatcher {
    /// Builds the table described by `config`, discarding the operation log.
    ///
    /// This is the only fallible step of a run: if the table cannot be built,
    /// no command is executed.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_log(config, OperationLog::discard())
    }

    /// Builds the table described by `config`, recording to `log`.
    pub fn with_log(config: Config, log: OperationLog) -> Result<Self> {
        let table = Table::with_log(config.buckets(), log)?;

        log::debug!(
            "initialized table with {} buckets, up to {} workers",
            config.buckets(),
            config.workers()
        );

        Ok(Self { table, config })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn log(&self) -> &OperationLog {
        self.table.log()
    }

    /// Executes every command concurrently, waits for all of them, and
    /// reports the result.
    ///
    /// Commands are handed out in order to at most `config.workers()` threads,
    /// each of which runs one command at a time. Commands that touch the same
    /// key may therefore execute in any order relative to each other unless
    /// there is a single worker.
    ///
    /// Always returns a report. Each outcome is stored as soon as its command
    /// finishes. If a worker thread panics, the command it was running and
    /// any command no worker got to are reported as [`Error::WorkerPanicked`].
    ///
    /// Running again on the same dispatcher continues from the current table
    /// contents and counters.
    pub fn run_all(&self, commands: &[Command]) -> Report {
        let log = self.log();
        let workers = self.config.workers().min(commands.len()).max(1);

        log.note(format_args!("Running {} threads", commands.len()));
        log::debug!(
            "dispatching {} commands to {} workers",
            commands.len(),
            workers
        );

        let cursor = AtomicUsize::new(0);
        let slots: Vec<Mutex<Option<Outcome>>> =
            commands.iter().map(|_| Mutex::new(None)).collect();

        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| scope.spawn(|| self.work(commands, &cursor, &slots)))
                .collect();

            log::debug!("joining {} workers", handles.len());

            for handle in handles {
                if handle.join().is_err() {
                    log::error!("a worker panicked; its unfinished command is reported as failed");
                }
            }
        });

        log.note("Finished all threads.");

        let outcomes = slots
            .into_iter()
            .map(|slot| {
                slot.into_inner()
                    .unwrap_or_else(|| Outcome::Failed(Error::WorkerPanicked))
            })
            .collect();

        log::debug!("all workers joined, taking snapshot");

        let snapshot = self.table.snapshot();

        for line in snapshot.to_string().lines() {
            log.note(line);
        }

        Report { snapshot, outcomes }
    }

    fn work(
        &self,
        commands: &[Command],
        cursor: &AtomicUsize,
        slots: &[Mutex<Option<Outcome>>],
    ) {
        loop {
            let index = cursor.fetch_add(1, Ordering::Relaxed);

            match commands.get(index) {
                Some(command) => {
                    let outcome = self.execute(command);
                    *slots[index].lock() = Some(outcome);
                }
                None => return,
            }
        }
    }

    /// Validates and executes a single command.
    pub fn execute(&self, command: &Command) -> Outcome {
        #[cfg(test)]
        tests::maybe_panic(command);

        let operation = match Operation::try_from(command) {
            Ok(operation) => operation,
            Err(e) => return self.skip(command, e),
        };

        match operation {
            Operation::Insert(key, value) => match self.table.insert(&key, value) {
                Ok(None) => Outcome::Inserted,
                Ok(Some(previous)) => Outcome::Updated { previous },
                Err(e) => self.skip(command, e),
            },
            Operation::Delete(key) => match self.table.delete(&key) {
                Some(entry) => Outcome::Deleted {
                    value: entry.value(),
                },
                None => Outcome::Absent,
            },
            Operation::Search(key) => match self.table.search(&key) {
                Some(value) => {
                    self.log()
                        .note(format_args!("SEARCH: {} FOUND with salary {}", key, value));

                    Outcome::Found(value)
                }
                None => {
                    self.log().note(format_args!("SEARCH: {} NOT FOUND", key));

                    Outcome::NotFound
                }
            },
        }
    }

    fn skip(&self, command: &Command, error: Error) -> Outcome {
        log::warn!("skipping `{}`: {}", command, error);

        self.log().record(Event::Skipped {
            opcode: &command.opcode,
            key: &command.key,
            reason: &error,
        });

        Outcome::Failed(error)
    }
}

/// Runs `commands` on a fresh table with the default [`Config`].
///
/// [`Config`]: ../config/struct.Config.html
pub fn run_all(commands: &[Command]) -> Result<Report> {
    Ok(Dispatcher::new(Config::default())?.run_all(commands))
}
