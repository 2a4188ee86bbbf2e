//! Error types for sshhelper.
//!
//! Every error is terminal for the run: the binary reports it and exits with
//! the code returned by [`Error::exit_code`]. Errors raised while talking to
//! the remote side carry a [`Transcript`] of the pty output so the user can
//! see what the remote actually printed.

use std::fmt;
use std::time::Duration;

use sshhelper_pty::PtyError;
use thiserror::Error;

/// Maximum length of transcript content to display in error messages.
const MAX_BUFFER_DISPLAY: usize = 500;

/// Lines kept from the tail of an oversized transcript.
const TAIL_LINES: usize = 6;

/// Process exit codes, a stable contract for scripts wrapping the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ExitCode {
    /// Session finished normally.
    Success = 0,
    /// Login timed out, the user interrupted, or the session broke down.
    Timeout = 1,
    /// Target unreachable and no jump host available.
    CannotConnect = 2,
    /// The remote refused the connection.
    Refused = 3,
    /// Bad arguments, bad configuration, or an ambiguous host selector.
    ArgsError = 99,
    /// The requested host is not configured.
    NotExist = 100,
}

impl ExitCode {
    /// The numeric process exit code.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Pty output captured at the moment an expectation failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    /// Text consumed by the most recent successful match.
    pub consumed: String,
    /// Text received since then that no pattern matched.
    pub pending: String,
}

impl Transcript {
    /// Create a transcript from consumed and pending text.
    pub fn new(consumed: impl Into<String>, pending: impl Into<String>) -> Self {
        Self {
            consumed: consumed.into(),
            pending: pending.into(),
        }
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", format_buffer_snippet("consumed", &self.consumed))?;
        write!(f, "{}", format_buffer_snippet("pending", &self.pending))
    }
}

fn format_buffer_snippet(label: &str, buffer: &str) -> String {
    if buffer.is_empty() {
        return format!("┌─ {label} (empty)\n└────────────────────────────────────────");
    }

    let lines: Vec<&str> = buffer.lines().collect();
    if buffer.len() <= MAX_BUFFER_DISPLAY || lines.len() <= TAIL_LINES {
        return format!(
            "┌─ {label} ({} bytes) ──────────────────────\n│ {}\n└────────────────────────────────────────",
            buffer.len(),
            lines.join("\n│ ")
        );
    }

    let tail = &lines[lines.len() - TAIL_LINES..];
    format!(
        "┌─ {label} ({} bytes, {} lines) ─────────────\n│ ... ({} lines hidden)\n│ {}\n└────────────────────────────────────────",
        buffer.len(),
        lines.len(),
        lines.len() - tail.len(),
        tail.join("\n│ ")
    )
}

/// The error type for sshhelper.
#[derive(Debug, Error)]
pub enum Error {
    /// No expected prompt appeared before the deadline.
    #[error("timed out after {duration:?} {context}\n{transcript}")]
    Timeout {
        /// What we were waiting for.
        context: String,
        /// The deadline that elapsed.
        duration: Duration,
        /// Pty output at the time of the timeout.
        transcript: Transcript,
    },

    /// The host failed the reachability probe and no jump path exists.
    #[error("{host} is not available and no jump host can be used")]
    Unreachable {
        /// The unreachable host.
        host: String,
    },

    /// The remote actively refused the connection.
    #[error("could not ssh into {host}: connection refused\n{transcript}")]
    Refused {
        /// The refusing host.
        host: String,
        /// Pty output around the refusal.
        transcript: Transcript,
    },

    /// The local pty or ssh process could not be created.
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        /// The command line we tried to start.
        command: String,
        /// The underlying pty error.
        #[source]
        source: PtyError,
    },

    /// The pty closed or failed while we were reading from it.
    #[error("connection lost: {reason}\n{transcript}")]
    ConnectionLost {
        /// Why the connection is considered lost.
        reason: String,
        /// Pty output received before the loss.
        transcript: Transcript,
    },

    /// The pty could not be written to.
    #[error("failed to write to the session: {0}")]
    Write(#[source] std::io::Error),

    /// The requested host is not in the configuration.
    #[error("{selector} is not a configured host")]
    ConfigMissing {
        /// The selector given on the command line.
        selector: String,
    },

    /// The selector matches several configured hosts.
    #[error("can't ssh because {selector} matches multiple hosts:\n    {}", .candidates.join("\n    "))]
    AmbiguousSelector {
        /// The selector given on the command line.
        selector: String,
        /// Every host key containing the selector, sorted.
        candidates: Vec<String>,
    },

    /// The configuration is missing, unreadable, or malformed.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// The user interrupted the run.
    #[error("interrupted")]
    Interrupted,
}

impl Error {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// The process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Timeout { .. }
            | Self::Spawn { .. }
            | Self::ConnectionLost { .. }
            | Self::Write(_)
            | Self::Interrupted => ExitCode::Timeout,
            Self::Unreachable { .. } => ExitCode::CannotConnect,
            Self::Refused { .. } => ExitCode::Refused,
            Self::AmbiguousSelector { .. } | Self::Config { .. } => ExitCode::ArgsError,
            Self::ConfigMissing { .. } => ExitCode::NotExist,
        }
    }

    /// The pty transcript attached to this error, if any.
    #[must_use]
    pub const fn transcript(&self) -> Option<&Transcript> {
        match self {
            Self::Timeout { transcript, .. }
            | Self::Refused { transcript, .. }
            | Self::ConnectionLost { transcript, .. } => Some(transcript),
            _ => None,
        }
    }

    /// Check if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type alias for sshhelper operations.
pub type Result<T> = std::result::Result<T, Error>;
