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

//! Commands and the command-log text format.
//!
//! A command log starts with a directive giving the number of commands to run,
//! followed by one command per line:
//!
//! ```text
//! threads,3,0
//! insert,Alice,50000
//! delete,Bob,0
//! search,Alice,0
//! ```
//!
//! Reading a line never fails. Opcodes and values are only checked when a
//! command is turned into an [`Operation`], so that one bad line fails one
//! command rather than the whole log.
//!
//! [`Operation`]: enum.Operation.html

use std::{fmt, str::FromStr};

use crate::{
    error::{Error, Result},
    key::Key,
};

/// A command as read from the log, before validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    pub opcode: String,
    pub key: String,
    pub value: Option<u32>,
}

impl Command {
    pub fn insert<S: Into<String>>(key: S, value: u32) -> Self {
        Self::new("insert", key, Some(value))
    }

    pub fn delete<S: Into<String>>(key: S) -> Self {
        Self::new("delete", key, None)
    }

    pub fn search<S: Into<String>>(key: S) -> Self {
        Self::new("search", key, None)
    }

    pub fn new<O: Into<String>, S: Into<String>>(opcode: O, key: S, value: Option<u32>) -> Self {
        Self {
            opcode: opcode.into(),
            key: key.into(),
            value,
        }
    }

    /// Reads one `opcode,key,value` line.
    ///
    /// Missing fields become empty, and a value that is not a `u32` becomes
    /// `None`.
    pub fn parse_line(line: &str) -> Self {
        let mut fields = line.splitn(3, ',').map(str::trim);

        let opcode = fields.next().unwrap_or_default();
        let key = fields.next().unwrap_or_default();
        let value = fields.next().and_then(|value| value.parse().ok());

        Self::new(opcode, key, value)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.opcode, self.key)?;

        match self.value {
            Some(value) => write!(f, ",{}", value),
            None => Ok(()),
        }
    }
}

/// A validated table operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    Insert(Key, u32),
    Delete(Key),
    Search(Key),
}

impl Operation {
    pub fn key(&self) -> &Key {
        match self {
            Operation::Insert(key, _) | Operation::Delete(key) | Operation::Search(key) => key,
        }
    }
}

impl TryFrom<&Command> for Operation {
    type Error = Error;

    /// Checks the opcode, the key and, for inserts, the value.
    ///
    /// Opcodes are matched case-insensitively. The opcode is checked before
    /// the key, so an unknown opcode is reported as such even if the key is
    /// also bad.
    fn try_from(command: &Command) -> Result<Self> {
        let opcode = command.opcode.to_ascii_lowercase();

        match opcode.as_str() {
            "insert" => {
                let key = Key::new(command.key.as_str())?;
                let value = command
                    .value
                    .ok_or_else(|| Error::MissingValue(command.key.clone()))?;

                Ok(Operation::Insert(key, value))
            }
            "delete" => Ok(Operation::Delete(Key::new(command.key.as_str())?)),
            "search" => Ok(Operation::Search(Key::new(command.key.as_str())?)),
            _ => Err(Error::UnknownOperation(command.opcode.clone())),
        }
    }
}

/// A parsed command log.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Script {
    pub commands: Vec<Command>,
}

impl Script {
    /// Parses a command log.
    ///
    /// The first non-blank line must be a `threads,<count>,...` directive.
    /// Only the first `count` commands after it are kept; a log with fewer
    /// commands than announced keeps all of them. Both mismatches are
    /// reported through `log::warn!`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());

        let directive = lines.next().ok_or(Error::MissingDirective)?;
        let count = parse_directive(directive)?;

        let mut commands: Vec<_> = lines.map(Command::parse_line).collect();

        if commands.len() > count {
            log::warn!(
                "command log announces {} commands but holds {}, ignoring the rest",
                count,
                commands.len()
            );

            commands.truncate(count);
        } else if commands.len() < count {
            log::warn!(
                "command log announces {} commands but holds only {}",
                count,
                commands.len()
            );
        }

        Ok(Self { commands })
    }
}

impl FromStr for Script {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        Self::parse(text)
    }
}

fn parse_directive(line: &str) -> Result<usize> {
    let mut fields = line.split(',').map(str::trim);

    match fields.next() {
        Some(name) if name.eq_ignore_ascii_case("threads") => (),
        _ => return Err(Error::MissingDirective),
    }

    fields
        .next()
        .and_then(|count| count.parse().ok())
        .ok_or_else(|| Error::InvalidDirective(line.to_string()))
}
