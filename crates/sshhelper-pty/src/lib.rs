//! sshhelper-pty: async pseudo-terminal layer for sshhelper.
//!
//! This crate allocates a Unix pseudo-terminal, spawns a child process with
//! the slave side as its controlling terminal, and exposes the master side
//! as a Tokio `AsyncRead + AsyncWrite` stream.
//!
//! # Quick Start
//!
//! ```ignore
//! use sshhelper_pty::{NativePtySystem, PtyConfig, PtySystem};
//! use tokio::io::{AsyncReadExt, AsyncWriteExt};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PtyConfig::default();
//!     let (mut master, mut child) =
//!         NativePtySystem::spawn("/usr/bin/ssh", ["-l", "jim", "10.0.0.5"], &config).await?;
//!
//!     let mut buf = [0u8; 1024];
//!     let n = master.read(&mut buf).await?;
//!     println!("{}", String::from_utf8_lossy(&buf[..n]));
//!
//!     master.write_all(b"exit\n").await?;
//!     println!("{}", child.wait().await?);
//!     Ok(())
//! }
//! ```
//!
//! Window size changes are pushed through a [`WindowResizer`], which can be
//! shared with a signal handler thread independently of the master stream.

pub mod config;
pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod unix;

pub use config::{PtyConfig, WindowSize};
pub use error::{PtyError, Result};
pub use traits::{ExitStatus, PtyChild, PtyMaster, PtySystem, WindowResizer};

#[cfg(unix)]
pub use unix::{NativePtySystem, UnixPtyChild, UnixPtyMaster, UnixPtyResizer, UnixPtySystem};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PtyConfig::default();
        assert_eq!(config.window_size, WindowSize::new(80, 24));
        assert!(config.controlling_terminal);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn spawn_echo() {
        let config = PtyConfig::default();
        let result = UnixPtySystem::spawn("echo", ["test"], &config).await;

        // May fail in environments without /dev/ptmx
        if let Ok((_master, mut child)) = result {
            assert_eq!(child.wait().await.unwrap(), ExitStatus::Exited(0));
        }
    }
}
