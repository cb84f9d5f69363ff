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

/// Settings for a [`Dispatcher`] run.
///
/// The bucket count is a capacity choice made up front; it does not depend on
/// how many commands are run.
///
/// [`Dispatcher`]: ../dispatch/struct.Dispatcher.html
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    buckets: usize,
    workers: usize,
}

impl Config {
    /// Number of buckets used when none is given.
    pub const DEFAULT_BUCKETS: usize = 64;

    /// Creates a `Config` with [`DEFAULT_BUCKETS`] buckets and one worker per
    /// logical CPU.
    ///
    /// [`DEFAULT_BUCKETS`]: #associatedconstant.DEFAULT_BUCKETS
    pub fn new() -> Self {
        Self {
            buckets: Self::DEFAULT_BUCKETS,
            workers: Self::default_num_workers(),
        }
    }

    /// Sets the number of table buckets.
    ///
    /// Zero is accepted here but rejected when the table is built.
    pub fn with_buckets(self, buckets: usize) -> Self {
        Self { buckets, ..self }
    }

    /// Sets the maximum number of worker threads. Zero is treated as one.
    pub fn with_workers(self, workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            ..self
        }
    }

    pub fn buckets(&self) -> usize {
        self.buckets
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    #[cfg(feature = "num-cpus")]
    fn default_num_workers() -> usize {
        num_cpus::get().max(1)
    }

    #[cfg(not(feature = "num-cpus"))]
    fn default_num_workers() -> usize {
        std::thread::available_parallelism()
            .map(usize::from)
            .unwrap_or(1)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();

        assert_eq!(config.buckets(), Config::DEFAULT_BUCKETS);
        assert!(config.workers() >= 1);
    }

    #[test]
    fn builders() {
        let config = Config::new().with_buckets(7).with_workers(3);

        assert_eq!(config.buckets(), 7);
        assert_eq!(config.workers(), 3);
        assert_eq!(Config::new().with_workers(0).workers(), 1);
    }
}
