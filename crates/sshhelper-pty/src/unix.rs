//! Unix platform implementation for PTY operations.
//!
//! - PTY master/slave allocation via openpt/grantpt/unlockpt
//! - Async I/O through tokio's `AsyncFd`
//! - Child process spawn with a new session and the slave as controlling terminal
//! - SIGWINCH subscription for terminal resize forwarding

mod child;
mod pty;
mod signals;

use std::ffi::OsStr;

pub use child::{UnixPtyChild, spawn_child};
pub use pty::{UnixPtyMaster, UnixPtyResizer, open_slave};
pub use signals::{SignalHandle, on_window_change};

use crate::config::PtyConfig;
use crate::error::Result;
use crate::traits::PtySystem;

/// Unix PTY system implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixPtySystem;

impl PtySystem for UnixPtySystem {
    type Master = UnixPtyMaster;
    type Child = UnixPtyChild;

    async fn spawn<S, I>(
        program: S,
        args: I,
        config: &PtyConfig,
    ) -> Result<(Self::Master, Self::Child)>
    where
        S: AsRef<OsStr> + Send,
        I: IntoIterator + Send,
        I::Item: AsRef<OsStr>,
    {
        let (master, slave_path) = UnixPtyMaster::open()?;
        master.set_window_size(config.window_size)?;

        let slave_fd = open_slave(&slave_path)?;
        let child = spawn_child(slave_fd, program, args, config)?;

        tracing::debug!(pid = child.pid(), slave = %slave_path, "spawned child on pty");
        Ok((master, child))
    }
}

/// Convenience type alias for the default PTY system on Unix.
pub type NativePtySystem = UnixPtySystem;
