//! Expect pattern matching.
//!
//! Patterns, the output buffer and the matcher that resolves one against
//! the other.

mod buffer;
mod matcher;
mod pattern;

pub use buffer::{DEFAULT_CAPACITY, RingBuffer};
pub use matcher::{Match, Matcher};
pub use pattern::{CompiledRegex, NamedPattern, Pattern, PatternMatch, PatternSet};
