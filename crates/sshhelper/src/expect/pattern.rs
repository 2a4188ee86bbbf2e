//! Pattern types for expect operations.
//!
//! A [`Pattern`] is one candidate in an expect call; a [`PatternSet`] is the
//! ordered list of candidates. Resolution is by list order: the first
//! pattern in the set that matches anywhere in the buffer wins, even when a
//! later pattern would match earlier in the text.

use std::fmt;

use regex::Regex;

/// A pattern that can be matched against terminal output.
#[derive(Clone)]
pub enum Pattern {
    /// Match an exact string.
    Literal(String),

    /// Match a regular expression.
    Regex(CompiledRegex),

    /// Match unconditionally, consuming nothing.
    Any,

    /// Selected when the expect deadline passes without another match.
    Timeout,
}

impl Pattern {
    /// Create a literal pattern.
    #[must_use]
    pub fn literal(s: impl Into<String>) -> Self {
        Self::Literal(s.into())
    }

    /// Create a regex pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the regex pattern is invalid.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(pattern)?;
        Ok(Self::Regex(CompiledRegex::new(pattern.to_string(), regex)))
    }

    /// Create a pattern from a user-supplied expect string.
    ///
    /// The string is a regular expression; an empty string matches
    /// unconditionally.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid regex.
    pub fn from_user(pattern: &str) -> Result<Self, regex::Error> {
        if pattern.is_empty() {
            Ok(Self::Any)
        } else {
            Self::regex(pattern)
        }
    }

    /// Get the pattern as a string for display purposes.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(s) => s,
            Self::Regex(r) => r.pattern(),
            Self::Any => "<ANY>",
            Self::Timeout => "<TIMEOUT>",
        }
    }

    /// Check if this pattern matches the given text.
    #[must_use]
    pub fn matches(&self, text: &str) -> Option<PatternMatch> {
        match self {
            Self::Literal(s) => text.find(s.as_str()).map(|pos| PatternMatch {
                start: pos,
                end: pos + s.len(),
            }),
            Self::Regex(r) => r.find(text).map(|m| PatternMatch {
                start: m.start(),
                end: m.end(),
            }),
            Self::Any => Some(PatternMatch { start: 0, end: 0 }),
            Self::Timeout => None,
        }
    }

    /// Check if this is the timeout pattern.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "Literal({s:?})"),
            Self::Regex(r) => write!(f, "Regex({:?})", r.pattern()),
            Self::Any => write!(f, "Any"),
            Self::Timeout => write!(f, "Timeout"),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Pattern {
    fn from(s: &str) -> Self {
        Self::Literal(s.to_string())
    }
}

impl From<String> for Pattern {
    fn from(s: String) -> Self {
        Self::Literal(s)
    }
}

/// A compiled regular expression with its source pattern.
#[derive(Clone)]
pub struct CompiledRegex {
    pattern: String,
    regex: Regex,
}

impl CompiledRegex {
    /// Create a new compiled regex.
    #[must_use]
    pub const fn new(pattern: String, regex: Regex) -> Self {
        Self { pattern, regex }
    }

    /// Get the source pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Find the first match in the text.
    #[must_use]
    pub fn find<'a>(&self, text: &'a str) -> Option<regex::Match<'a>> {
        self.regex.find(text)
    }
}

impl PartialEq for CompiledRegex {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

/// Byte range of a successful pattern match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternMatch {
    /// Start position of the match in the text.
    pub start: usize,
    /// End position of the match in the text.
    pub end: usize,
}

impl PatternMatch {
    /// Get the matched text from the original input.
    #[must_use]
    pub fn as_str<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

/// A pattern with a short name used in log output.
#[derive(Debug, Clone)]
pub struct NamedPattern {
    /// The pattern.
    pub pattern: Pattern,
    /// Optional name for the pattern.
    pub name: Option<String>,
}

impl NamedPattern {
    /// The name if set, else the pattern text.
    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.pattern.as_str())
    }
}

/// An ordered list of candidate patterns.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<NamedPattern>,
}

impl PatternSet {
    /// Create a new empty pattern set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pattern set from a vector of patterns.
    #[must_use]
    pub fn from_patterns(patterns: Vec<Pattern>) -> Self {
        let patterns = patterns
            .into_iter()
            .map(|pattern| NamedPattern {
                pattern,
                name: None,
            })
            .collect();
        Self { patterns }
    }

    /// Add a pattern to the set.
    pub fn add(&mut self, pattern: Pattern) -> &mut Self {
        self.patterns.push(NamedPattern {
            pattern,
            name: None,
        });
        self
    }

    /// Add a named pattern to the set.
    pub fn add_named(&mut self, name: impl Into<String>, pattern: Pattern) -> &mut Self {
        self.patterns.push(NamedPattern {
            pattern,
            name: Some(name.into()),
        });
        self
    }

    /// Get the number of patterns in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Check if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Resolve the set against `text`.
    ///
    /// Patterns are probed in list order and the first one that matches
    /// wins. Position in the text does not matter.
    #[must_use]
    pub fn find_match(&self, text: &str) -> Option<(usize, PatternMatch)> {
        self.patterns
            .iter()
            .enumerate()
            .find_map(|(idx, named)| named.pattern.matches(text).map(|m| (idx, m)))
    }

    /// Index of the timeout pattern, if the set contains one.
    #[must_use]
    pub fn timeout_index(&self) -> Option<usize> {
        self.patterns.iter().position(|p| p.pattern.is_timeout())
    }

    /// Get a pattern by index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&NamedPattern> {
        self.patterns.get(index)
    }

    /// Human-readable list of the candidates, for logs and errors.
    #[must_use]
    pub fn describe(&self) -> String {
        self.patterns
            .iter()
            .filter(|p| !p.pattern.is_timeout())
            .map(|p| format!("'{}'", p.label()))
            .collect::<Vec<_>>()
            .join(" or ")
    }

    /// Get iterator over patterns.
    pub fn iter(&self) -> impl Iterator<Item = &NamedPattern> {
        self.patterns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_pattern_matches() {
        let pattern = Pattern::literal("hello");
        let m = pattern.matches("say hello world").unwrap();
        assert_eq!(m.start, 4);
        assert_eq!(m.end, 9);
    }

    #[test]
    fn regex_pattern_matches() {
        let pattern = Pattern::regex(r"(?i)password: ").unwrap();
        let text = "root@10.0.0.5's Password: ";
        let m = pattern.matches(text).unwrap();
        assert_eq!(m.as_str(text), "Password: ");
    }

    #[test]
    fn any_matches_empty_text() {
        let m = Pattern::Any.matches("").unwrap();
        assert_eq!((m.start, m.end), (0, 0));
    }

    #[test]
    fn timeout_never_matches_text() {
        assert!(Pattern::Timeout.matches("anything").is_none());
    }

    #[test]
    fn user_patterns() {
        assert!(matches!(Pattern::from_user("").unwrap(), Pattern::Any));
        assert!(matches!(
            Pattern::from_user("Password: ").unwrap(),
            Pattern::Regex(_)
        ));
        assert!(Pattern::from_user("(unclosed").is_err());
    }

    #[test]
    fn pattern_set_prefers_list_order_over_text_position() {
        let mut set = PatternSet::new();
        set.add(Pattern::literal("world"))
            .add(Pattern::literal("hello"));

        let (idx, m) = set.find_match("hello world").unwrap();
        // "hello" comes first in the text, but "world" comes first in the list
        assert_eq!(idx, 0);
        assert_eq!(m.start, 6);
    }

    #[test]
    fn pattern_set_timeout_index_and_describe() {
        let mut set = PatternSet::new();
        set.add(Pattern::Timeout)
            .add_named("password", Pattern::regex("(?i)password: ").unwrap())
            .add(Pattern::literal("$ "));

        assert_eq!(set.timeout_index(), Some(0));
        assert_eq!(set.describe(), "'password' or '$ '");
        assert_eq!(set.len(), 3);
    }
}
