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

//! The operation log and lock counters.
//!
//! Every bucket lock acquisition and release, every table operation and every
//! skipped command is recorded as one line in an [`OperationLog`]. Lines from
//! different threads may appear in any order, but a line is always written in
//! one piece. Recording only formats the line and queues it; writing happens
//! elsewhere, so a slow writer never holds up a thread that owns a bucket lock.
//!
//! [`LockCounters`] tally acquisitions and releases across the whole table.
//! They are plain atomics and never take a lock, so counting a bucket's lock
//! activity cannot serialize it against any other bucket.
//!
//! [`OperationLog`]: struct.OperationLog.html
//! [`LockCounters`]: struct.LockCounters.html

use std::{
    fmt,
    io::{self, Write},
    mem,
    sync::atomic::{AtomicU64, Ordering},
    thread::{self, JoinHandle},
    time::{SystemTime, UNIX_EPOCH},
};

use crossbeam_channel::{Receiver, Sender};
use crossbeam_utils::CachePadded;
use parking_lot::Mutex;

/// Whether a bucket lock was taken shared or exclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LockKind {
    Read,
    Write,
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKind::Read => f.write_str("READ"),
            LockKind::Write => f.write_str("WRITE"),
        }
    }
}

/// A timestamped entry in the operation log.
pub enum Event<'a> {
    LockAcquired(LockKind),
    LockReleased(LockKind),
    Insert {
        hash: u32,
        key: &'a str,
        value: u32,
    },
    Delete {
        hash: u32,
        key: &'a str,
    },
    Search {
        hash: u32,
        key: &'a str,
    },
    Skipped {
        opcode: &'a str,
        key: &'a str,
        reason: &'a dyn fmt::Display,
    },
}

impl fmt::Display for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::LockAcquired(kind) => write!(f, "{} LOCK ACQUIRED", kind),
            Event::LockReleased(kind) => write!(f, "{} LOCK RELEASED", kind),
            Event::Insert { hash, key, value } => write!(f, "INSERT,{},{},{}", hash, key, value),
            Event::Delete { hash, key } => write!(f, "DELETE,{},{}", hash, key),
            Event::Search { hash, key } => write!(f, "SEARCH,{},{}", hash, key),
            Event::Skipped {
                opcode,
                key,
                reason,
            } => write!(f, "SKIPPED {},{}: {}", opcode, key, reason),
        }
    }
}

enum Sink {
    Discard,
    Memory {
        sender: Sender<String>,
        receiver: Receiver<String>,
        lines: Mutex<Vec<String>>,
    },
    Writer {
        sender: Sender<Message>,
        worker: Option<JoinHandle<()>>,
    },
}

enum Message {
    Line(String),
    Flush(Sender<io::Result<()>>),
    Close,
}

/// Append-only, line-atomic sink for operation events.
///
/// Each line is formatted in full by the recording thread and handed over as
/// a single message on an unbounded channel, so recording never waits for
/// I/O or for another recorder. A log built with [`to_writer`] owns a
/// dedicated thread that performs every write; the thread is joined when the
/// log is dropped.
///
/// [`to_writer`]: #method.to_writer
pub struct OperationLog {
    sink: Sink,
}

impl OperationLog {
    /// Creates a log that drops every line.
    pub fn discard() -> Self {
        Self { sink: Sink::Discard }
    }

    /// Creates a log that keeps every line in memory.
    ///
    /// The lines can be retrieved with [`lines`](#method.lines).
    pub fn in_memory() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();

        Self {
            sink: Sink::Memory {
                sender,
                receiver,
                lines: Mutex::new(Vec::new()),
            },
        }
    }

    /// Creates a log that writes each line to `writer` from a background
    /// thread.
    ///
    /// Fails only if the thread cannot be spawned. I/O errors on individual
    /// lines are reported through the `log` facade and otherwise ignored;
    /// they never fail a table operation.
    pub fn to_writer<W: Write + Send + 'static>(writer: W) -> io::Result<Self> {
        let (sender, receiver) = crossbeam_channel::unbounded();

        let worker = thread::Builder::new()
            .name("oplog-writer".to_string())
            .spawn(move || drain(writer, receiver))?;

        Ok(Self {
            sink: Sink::Writer {
                sender,
                worker: Some(worker),
            },
        })
    }

    /// Records `event` prefixed with the current Unix time in seconds.
    pub fn record(&self, event: Event<'_>) {
        log::trace!("{}", event);

        self.write_line(format!("{}: {}", timestamp(), event));
    }

    /// Records a line with no timestamp.
    pub fn note<D: fmt::Display>(&self, line: D) {
        self.write_line(line.to_string());
    }

    /// Returns a copy of every line recorded so far by an in-memory log.
    ///
    /// Other sinks do not retain lines and return an empty vector.
    pub fn lines(&self) -> Vec<String> {
        match &self.sink {
            Sink::Memory {
                receiver, lines, ..
            } => {
                let mut lines = lines.lock();
                lines.extend(receiver.try_iter());

                lines.clone()
            }
            _ => Vec::new(),
        }
    }

    /// Takes every line recorded so far by an in-memory log, leaving it empty.
    pub fn take_lines(&self) -> Vec<String> {
        match &self.sink {
            Sink::Memory {
                receiver, lines, ..
            } => {
                let mut lines = lines.lock();
                lines.extend(receiver.try_iter());

                mem::take(&mut *lines)
            }
            _ => Vec::new(),
        }
    }

    /// Waits until every line recorded so far has been handed to the
    /// underlying writer, then flushes it.
    pub fn flush(&self) -> io::Result<()> {
        let sender = match &self.sink {
            Sink::Writer { sender, .. } => sender,
            _ => return Ok(()),
        };

        let (reply, done) = crossbeam_channel::bounded(1);

        if sender.send(Message::Flush(reply)).is_err() {
            return Err(writer_stopped());
        }

        done.recv().unwrap_or_else(|_| Err(writer_stopped()))
    }

    fn write_line(&self, mut line: String) {
        match &self.sink {
            Sink::Discard => (),
            Sink::Memory { sender, .. } => {
                // The receiver lives as long as the sender, so this cannot fail.
                let _ = sender.send(line);
            }
            Sink::Writer { sender, .. } => {
                line.push('\n');

                if sender.send(Message::Line(line)).is_err() {
                    log::warn!("operation log writer has stopped; dropping line");
                }
            }
        }
    }
}

fn drain<W: Write>(mut writer: W, receiver: Receiver<Message>) {
    for message in receiver {
        match message {
            Message::Line(line) => {
                if let Err(e) = writer.write_all(line.as_bytes()) {
                    log::warn!("failed to write operation log line: {}", e);
                }
            }
            Message::Flush(reply) => {
                let _ = reply.send(writer.flush());
            }
            Message::Close => break,
        }
    }

    if let Err(e) = writer.flush() {
        log::warn!("failed to flush operation log: {}", e);
    }
}

fn writer_stopped() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "operation log writer has stopped")
}

impl Drop for OperationLog {
    fn drop(&mut self) {
        if let Sink::Writer { sender, worker } = &mut self.sink {
            let _ = sender.send(Message::Close);

            if let Some(worker) = worker.take() {
                if worker.join().is_err() {
                    log::error!("operation log writer panicked");
                }
            }
        }
    }
}

impl Default for OperationLog {
    fn default() -> Self {
        Self::discard()
    }
}

impl fmt::Debug for OperationLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.sink {
            Sink::Discard => "Discard",
            Sink::Memory { .. } => "Memory",
            Sink::Writer { .. } => "Writer",
        };

        f.debug_struct("OperationLog").field("sink", &kind).finish()
    }
}

fn timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// Table-wide tally of bucket lock acquisitions and releases.
#[derive(Debug, Default)]
pub struct LockCounters {
    acquisitions: CachePadded<AtomicU64>,
    releases: CachePadded<AtomicU64>,
}

/// A point-in-time reading of [`LockCounters`].
///
/// [`LockCounters`]: struct.LockCounters.html
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LockStats {
    pub acquisitions: u64,
    pub releases: u64,
}

impl LockCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn acquired(&self) {
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn released(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads both counters.
    ///
    /// While operations are in flight the two values may be read at slightly
    /// different moments; once every worker has been joined they are exact.
    pub fn stats(&self) -> LockStats {
        LockStats {
            acquisitions: self.acquisitions.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{
        sync::{Arc, Barrier},
        thread::{self, JoinHandle},
    };

    #[test]
    fn event_lines() {
        let log = OperationLog::in_memory();

        log.record(Event::LockAcquired(LockKind::Write));
        log.record(Event::Insert {
            hash: 210_078_619,
            key: "Alice",
            value: 50000,
        });
        log.record(Event::LockReleased(LockKind::Write));
        log.note("Finished all threads.");

        let lines = log.lines();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with(": WRITE LOCK ACQUIRED"));
        assert!(lines[1].ends_with(": INSERT,210078619,Alice,50000"));
        assert!(lines[2].ends_with(": WRITE LOCK RELEASED"));
        assert_eq!(lines[3], "Finished all threads.");

        let (stamp, _) = lines[0].split_once(": ").unwrap();
        assert!(stamp.parse::<u64>().is_ok());
    }

    #[test]
    fn skipped_line_carries_reason() {
        let log = OperationLog::in_memory();

        log.record(Event::Skipped {
            opcode: "update",
            key: "Alice",
            reason: &"unknown operation `update`",
        });

        assert!(log.lines()[0].ends_with(": SKIPPED update,Alice: unknown operation `update`"));
    }

    #[test]
    fn take_lines_drains() {
        let log = OperationLog::in_memory();
        log.note("a");

        assert_eq!(log.take_lines(), vec!["a".to_string()]);
        assert!(log.lines().is_empty());
    }

    #[test]
    fn discard_keeps_nothing() {
        let log = OperationLog::discard();
        log.note("a");

        assert!(log.lines().is_empty());
        assert!(log.flush().is_ok());
    }

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);

            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    struct GatedWriter {
        gate: Receiver<()>,
        opened: bool,
        buffer: SharedBuffer,
    }

    impl Write for GatedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if !self.opened {
                let _ = self.gate.recv();
                self.opened = true;
            }

            self.buffer.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn recording_does_not_wait_for_the_writer() {
        let (open, gate) = crossbeam_channel::bounded(0);
        let buffer = SharedBuffer::default();
        let log = OperationLog::to_writer(GatedWriter {
            gate,
            opened: false,
            buffer: buffer.clone(),
        })
        .unwrap();

        for i in 0..100 {
            log.note(i);
        }

        assert!(buffer.text().is_empty());

        open.send(()).unwrap();
        assert!(log.flush().is_ok());

        let text = buffer.text();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 100);
        assert_eq!(lines[0], "0");
        assert_eq!(lines[99], "99");
    }

    #[test]
    fn drop_writes_pending_lines() {
        let buffer = SharedBuffer::default();
        let log = OperationLog::to_writer(buffer.clone()).unwrap();

        log.note("first");
        log.record(Event::LockAcquired(LockKind::Read));
        drop(log);

        let text = buffer.text();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "first");
        assert!(lines[1].ends_with(": READ LOCK ACQUIRED"));
    }

    #[test]
    fn concurrent_lines_are_not_torn() {
        const NUM_THREADS: usize = 64;
        const LINES_PER_THREAD: usize = 128;

        let buffer = SharedBuffer::default();
        let log = Arc::new(OperationLog::to_writer(buffer.clone()).unwrap());
        let barrier = Arc::new(Barrier::new(NUM_THREADS));

        let threads: Vec<_> = (0..NUM_THREADS)
            .map(|i| {
                let log = log.clone();
                let barrier = barrier.clone();

                thread::spawn(move || {
                    barrier.wait();

                    for j in 0..LINES_PER_THREAD {
                        log.note(format_args!("thread {} line {} {}", i, j, "x".repeat(i)));
                    }
                })
            })
            .collect();

        for result in threads.into_iter().map(JoinHandle::join) {
            assert!(result.is_ok());
        }

        assert!(log.flush().is_ok());

        let text = buffer.text();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), NUM_THREADS * LINES_PER_THREAD);

        for line in lines {
            let mut parts = line.split(' ');
            assert_eq!(parts.next(), Some("thread"));
            let i: usize = parts.next().unwrap().parse().unwrap();
            assert_eq!(parts.next(), Some("line"));
            assert!(parts.next().unwrap().parse::<usize>().is_ok());
            assert_eq!(parts.next(), Some("x".repeat(i).as_str()));
            assert_eq!(parts.next(), None);
        }
    }

    #[test]
    fn counters_under_contention() {
        const NUM_THREADS: usize = 64;
        const PER_THREAD: u64 = 1024;

        let counters = Arc::new(LockCounters::new());
        let barrier = Arc::new(Barrier::new(NUM_THREADS));

        let threads: Vec<_> = (0..NUM_THREADS)
            .map(|_| {
                let counters = counters.clone();
                let barrier = barrier.clone();

                thread::spawn(move || {
                    barrier.wait();

                    for _ in 0..PER_THREAD {
                        counters.acquired();
                        counters.released();
                    }
                })
            })
            .collect();

        for result in threads.into_iter().map(JoinHandle::join) {
            assert!(result.is_ok());
        }

        let expected = NUM_THREADS as u64 * PER_THREAD;

        assert_eq!(
            counters.stats(),
            LockStats {
                acquisitions: expected,
                releases: expected,
            }
        );
    }
}
