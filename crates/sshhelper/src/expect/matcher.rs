//! Matching engine: a buffer of unmatched output plus pattern resolution.

use super::buffer::RingBuffer;
use super::pattern::PatternSet;

/// Result of a successful expect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Index of the pattern that matched.
    pub index: usize,
    /// Output that preceded the match.
    pub before: String,
    /// The matched text itself.
    pub matched: String,
}

impl Match {
    /// Create a new match result.
    #[must_use]
    pub fn new(index: usize, before: impl Into<String>, matched: impl Into<String>) -> Self {
        Self {
            index,
            before: before.into(),
            matched: matched.into(),
        }
    }

    /// Everything this match consumed from the buffer.
    #[must_use]
    pub fn consumed(&self) -> String {
        format!("{}{}", self.before, self.matched)
    }
}

/// The pattern matching engine.
#[derive(Debug, Default)]
pub struct Matcher {
    buffer: RingBuffer,
}

impl Matcher {
    /// Create a new matcher with the specified buffer size.
    #[must_use]
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer: RingBuffer::new(buffer_size),
        }
    }

    /// Append data to the buffer.
    pub fn append(&mut self, data: &[u8]) {
        self.buffer.append(data);
    }

    /// Get the current buffer contents as a string.
    #[must_use]
    pub fn buffer_str(&mut self) -> String {
        self.buffer.as_str_lossy()
    }

    /// Remove and return all unmatched output, as raw bytes.
    pub fn take_pending(&mut self) -> Vec<u8> {
        self.buffer.take()
    }

    /// Resolve `patterns` against the buffer, consuming through the match.
    ///
    /// Only the bytes up to the end of the match are dropped. Anything after
    /// it stays raw, so a multibyte character cut by a read boundary is
    /// completed by the next read.
    ///
    /// Returns `None` and leaves the buffer untouched if nothing matches.
    pub fn try_consume(&mut self, patterns: &PatternSet) -> Option<Match> {
        let raw = self.buffer.as_slice();
        let text = String::from_utf8_lossy(raw);
        let (index, pm) = patterns.find_match(&text)?;

        let consumed = raw_offset(raw, pm.end);
        let result = Match::new(index, &text[..pm.start], &text[pm.start..pm.end]);
        self.buffer.consume(consumed);
        Some(result)
    }
}

/// Map an offset in the lossy decoding of `raw` back to a byte offset in `raw`.
///
/// Each invalid sequence decodes to one U+FFFD; an offset falling on one
/// maps to the end of the sequence it replaced.
fn raw_offset(raw: &[u8], text_offset: usize) -> usize {
    const REPLACEMENT_LEN: usize = char::REPLACEMENT_CHARACTER.len_utf8();

    let mut text_pos = 0;
    let mut raw_pos = 0;
    for chunk in raw.utf8_chunks() {
        let valid = chunk.valid().len();
        if text_offset <= text_pos + valid {
            return raw_pos + (text_offset - text_pos);
        }
        text_pos += valid;
        raw_pos += valid;

        let invalid = chunk.invalid().len();
        if invalid > 0 {
            text_pos += REPLACEMENT_LEN;
            raw_pos += invalid;
            if text_offset <= text_pos {
                return raw_pos;
            }
        }
    }
    raw_pos
}
