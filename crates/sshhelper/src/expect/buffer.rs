//! Bounded buffer for pty output awaiting a match.

use std::collections::VecDeque;
use std::fmt;

/// Default buffer capacity (1 MB).
pub const DEFAULT_CAPACITY: usize = 1024 * 1024;

/// A ring buffer for accumulating terminal output.
///
/// Once the maximum size is reached the oldest bytes are discarded, so a
/// chatty remote cannot grow memory without bound while we wait for a prompt.
#[derive(Clone)]
pub struct RingBuffer {
    data: VecDeque<u8>,
    max_size: usize,
}

impl RingBuffer {
    /// Create a new ring buffer with the specified maximum size.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            data: VecDeque::with_capacity(max_size.min(DEFAULT_CAPACITY)),
            max_size,
        }
    }

    /// Append data to the buffer.
    ///
    /// If the buffer would exceed its maximum size, oldest data is discarded.
    pub fn append(&mut self, data: &[u8]) {
        // New data alone fills the buffer: keep only its tail
        if data.len() >= self.max_size {
            self.data.clear();
            self.data.extend(&data[data.len() - self.max_size..]);
            return;
        }

        let overflow = (self.data.len() + data.len()).saturating_sub(self.max_size);
        if overflow > 0 {
            self.data.drain(..overflow);
        }

        self.data.extend(data);
    }

    /// Get the current buffer contents as a contiguous slice.
    #[must_use]
    pub fn as_slice(&mut self) -> &[u8] {
        self.data.make_contiguous()
    }

    /// Get the current buffer contents as a string (lossy UTF-8 conversion).
    #[must_use]
    pub fn as_str_lossy(&mut self) -> String {
        String::from_utf8_lossy(self.as_slice()).into_owned()
    }

    /// Get the current length of the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drop the first `n` bytes.
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.data.len());
        self.data.drain(..n);
    }

    /// Remove and return everything in the buffer.
    pub fn take(&mut self) -> Vec<u8> {
        self.data.drain(..).collect()
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("len", &self.len())
            .field("max_size", &self.max_size)
            .finish()
    }
}
