//! Core traits for PTY abstraction.
//!
//! - [`PtyMaster`]: the master side of a PTY (read/write, resize handles).
//! - [`PtyChild`]: handle for the spawned child process.
//! - [`PtySystem`]: factory for creating PTY sessions.
//! - [`WindowResizer`]: a detached handle that only updates the window size.

use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::{PtyConfig, WindowSize};
use crate::error::Result;

/// The master side of a pseudo-terminal.
pub trait PtyMaster: AsyncRead + AsyncWrite + Send + Sync + Unpin {
    /// The detached resize handle type.
    type Resizer: WindowResizer + 'static;

    /// Create a resize handle that stays usable while the master is busy
    /// in a read. The kernel delivers SIGWINCH to the child's foreground
    /// process group on every resize.
    fn resizer(&self) -> Result<Self::Resizer>;
}

/// Handle for a child process spawned in a PTY.
pub trait PtyChild: Send + Sync {
    /// Get the process ID of the child.
    fn pid(&self) -> u32;

    /// Wait for the child process to exit.
    fn wait(&mut self) -> Pin<Box<dyn Future<Output = Result<ExitStatus>> + Send + '_>>;
}

/// Something that can apply a new window size to a pseudo-terminal.
///
/// Implementations must not block: they are invoked from signal handler
/// threads while the main task may be in the middle of a read.
pub trait WindowResizer: Send + Sync {
    /// Apply the window size.
    fn set_window_size(&self, size: WindowSize) -> Result<()>;
}

/// Exit status of a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The process exited normally with the given exit code.
    Exited(i32),

    /// The process was terminated by a signal.
    Signaled(i32),
}

impl std::fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with code {code}"),
            Self::Signaled(sig) => write!(f, "terminated by signal {sig}"),
        }
    }
}

/// Factory trait for creating PTY sessions.
pub trait PtySystem: Send + Sync {
    /// The master PTY type for this platform.
    type Master: PtyMaster;
    /// The child process type for this platform.
    type Child: PtyChild;

    /// Spawn `program` with `args` in a freshly allocated PTY.
    fn spawn<S, I>(
        program: S,
        args: I,
        config: &PtyConfig,
    ) -> impl Future<Output = Result<(Self::Master, Self::Child)>> + Send
    where
        S: AsRef<std::ffi::OsStr> + Send,
        I: IntoIterator + Send,
        I::Item: AsRef<std::ffi::OsStr>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_status_display() {
        assert_eq!(ExitStatus::Exited(255).to_string(), "exited with code 255");
        assert_eq!(ExitStatus::Signaled(9).to_string(), "terminated by signal 9");
    }
}
