//! The prompts ssh shows during login, and how output is classified.

use std::sync::LazyLock;

use regex::Regex;

use crate::expect::{CompiledRegex, Match, Pattern, PatternSet};

/// Text ssh prints when it sees an unknown host key.
pub const HOST_KEY_PROMPT: &str = "Are you sure you want to continue connecting";

/// Password prompt, any capitalisation.
pub const PASSWORD_PROMPT: &str = "(?i)password: ";

/// A shell prompt: `#` or `$` followed by a space.
pub const SHELL_PROMPT: &str = "[#$] ";

/// Refusal reported by the ssh client.
pub const CONNECTION_REFUSED: &str = "(?i)Connection refused";

static PASSWORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PASSWORD_PROMPT).expect("password prompt is a valid regex"));

static SHELL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SHELL_PROMPT).expect("shell prompt is a valid regex"));

static REFUSED_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(CONNECTION_REFUSED).expect("connection refused pattern is a valid regex")
});

/// What the remote side showed us during login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPrompt {
    /// Nothing recognisable before the deadline.
    Timeout,
    /// Unknown host key confirmation.
    HostKey,
    /// Password prompt.
    Password,
    /// Already at a shell.
    Shell,
    /// The connection was refused.
    Refused,
}

/// Classifies login output against a fixed, ordered list of prompts.
///
/// The order of each table is its priority: when the buffered output could
/// satisfy several prompts, the earliest entry in the table wins.
#[derive(Debug, Clone)]
pub struct PromptMatcher {
    first: PatternSet,
    password: PatternSet,
    shell: PatternSet,
}

impl PromptMatcher {
    /// Order of [`Self::first_prompt`].
    pub const FIRST_PROMPT_ORDER: [LoginPrompt; 5] = [
        LoginPrompt::Timeout,
        LoginPrompt::HostKey,
        LoginPrompt::Password,
        LoginPrompt::Shell,
        LoginPrompt::Refused,
    ];

    /// Order of [`Self::password_prompt`].
    pub const PASSWORD_PROMPT_ORDER: [LoginPrompt; 2] =
        [LoginPrompt::Timeout, LoginPrompt::Password];

    /// Build the prompt tables.
    #[must_use]
    pub fn new() -> Self {
        let mut first = PatternSet::new();
        first
            .add_named("timeout", Pattern::Timeout)
            .add_named("host key", Pattern::literal(HOST_KEY_PROMPT))
            .add_named("password", compiled(PASSWORD_PROMPT, &PASSWORD_REGEX))
            .add_named("shell prompt", shell_prompt())
            .add_named(
                "connection refused",
                compiled(CONNECTION_REFUSED, &REFUSED_REGEX),
            );

        let mut password = PatternSet::new();
        password
            .add_named("timeout", Pattern::Timeout)
            .add_named("password", compiled(PASSWORD_PROMPT, &PASSWORD_REGEX));

        let mut shell = PatternSet::new();
        shell.add_named("shell prompt", shell_prompt());

        Self {
            first,
            password,
            shell,
        }
    }

    /// Candidates for the first expect after ssh starts.
    #[must_use]
    pub const fn first_prompt(&self) -> &PatternSet {
        &self.first
    }

    /// Candidates after answering the host key question.
    #[must_use]
    pub const fn password_prompt(&self) -> &PatternSet {
        &self.password
    }

    /// Just the shell prompt.
    #[must_use]
    pub const fn shell_prompt(&self) -> &PatternSet {
        &self.shell
    }

    /// Map a match on [`Self::first_prompt`] to its prompt.
    #[must_use]
    pub fn classify_first(m: &Match) -> LoginPrompt {
        Self::FIRST_PROMPT_ORDER
            .get(m.index)
            .copied()
            .unwrap_or(LoginPrompt::Timeout)
    }

    /// Map a match on [`Self::password_prompt`] to its prompt.
    #[must_use]
    pub fn classify_password(m: &Match) -> LoginPrompt {
        Self::PASSWORD_PROMPT_ORDER
            .get(m.index)
            .copied()
            .unwrap_or(LoginPrompt::Timeout)
    }
}

impl Default for PromptMatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn compiled(pattern: &str, regex: &Regex) -> Pattern {
    Pattern::Regex(CompiledRegex::new(pattern.to_string(), regex.clone()))
}

/// The shell prompt as a pattern.
#[must_use]
pub fn shell_prompt() -> Pattern {
    compiled(SHELL_PROMPT, &SHELL_REGEX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Option<LoginPrompt> {
        let matcher = PromptMatcher::new();
        matcher
            .first_prompt()
            .find_match(text)
            .map(|(index, _)| PromptMatcher::FIRST_PROMPT_ORDER[index])
    }

    #[test]
    fn tables_line_up_with_orders() {
        let matcher = PromptMatcher::new();
        assert_eq!(matcher.first_prompt().len(), 5);
        assert_eq!(matcher.first_prompt().timeout_index(), Some(0));
        assert_eq!(matcher.password_prompt().len(), 2);
        assert_eq!(matcher.password_prompt().timeout_index(), Some(0));
    }

    #[test]
    fn prompt_constants_compile_as_regexes() {
        let matcher = PromptMatcher::new();
        let regexes: Vec<&str> = matcher
            .first_prompt()
            .iter()
            .chain(matcher.password_prompt().iter())
            .chain(matcher.shell_prompt().iter())
            .filter_map(|named| match &named.pattern {
                Pattern::Regex(r) => Some(r.pattern()),
                _ => None,
            })
            .collect();

        assert_eq!(
            regexes,
            [
                PASSWORD_PROMPT,
                SHELL_PROMPT,
                CONNECTION_REFUSED,
                PASSWORD_PROMPT,
                SHELL_PROMPT
            ]
        );
        assert!(matches!(shell_prompt(), Pattern::Regex(_)));
    }

    #[test]
    fn each_prompt_alone() {
        assert_eq!(
            classify("The authenticity of host 'x' can't be established.\r\nAre you sure you want to continue connecting (yes/no)? "),
            Some(LoginPrompt::HostKey)
        );
        assert_eq!(classify("jim@10.0.0.5's password: "), Some(LoginPrompt::Password));
        assert_eq!(classify("PASSWORD: "), Some(LoginPrompt::Password));
        assert_eq!(classify("[jim@box ~]$ "), Some(LoginPrompt::Shell));
        assert_eq!(classify("root@box:~# "), Some(LoginPrompt::Shell));
        assert_eq!(
            classify("ssh: connect to host 10.0.0.5 port 22: Connection refused\r\n"),
            Some(LoginPrompt::Refused)
        );
        assert_eq!(classify("Welcome"), None);
    }

    #[test]
    fn host_key_outranks_later_shell_marker() {
        assert_eq!(
            classify("$ Are you sure you want to continue connecting"),
            Some(LoginPrompt::HostKey)
        );
    }

    #[test]
    fn password_outranks_refusal_and_shell() {
        assert_eq!(
            classify("Connection refused\r\n$ password: "),
            Some(LoginPrompt::Password)
        );
    }

    #[test]
    fn shell_outranks_refusal() {
        assert_eq!(
            classify("connection refused by peer # "),
            Some(LoginPrompt::Shell)
        );
    }

    #[test]
    fn classify_maps_indices() {
        let m = Match::new(3, "", "$ ");
        assert_eq!(PromptMatcher::classify_first(&m), LoginPrompt::Shell);
        let m = Match::new(1, "", "password: ");
        assert_eq!(PromptMatcher::classify_password(&m), LoginPrompt::Password);
    }
}
