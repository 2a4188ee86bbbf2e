//! Handing the session over to the user.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result, Transcript};
use crate::resize::ResizeForwarder;
use crate::session::PtyProcess;

/// How long to wait for ssh to exit once its pty has closed.
const REAP_TIMEOUT: Duration = Duration::from_secs(1);

const BUF_SIZE: usize = 4096;

/// Puts the controlling terminal in raw mode until dropped.
#[derive(Debug)]
pub struct RawModeGuard {
    enabled: bool,
}

impl RawModeGuard {
    /// Enable raw mode. Without a terminal this is a no-op.
    #[must_use]
    pub fn enable() -> Self {
        match crossterm::terminal::enable_raw_mode() {
            Ok(()) => Self { enabled: true },
            Err(e) => {
                tracing::debug!(error = %e, "raw mode unavailable");
                Self { enabled: false }
            }
        }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.enabled {
            let _ = crossterm::terminal::disable_raw_mode();
        }
    }
}

/// Copy bytes between our terminal and the pty until either side closes.
///
/// Output buffered but not consumed by the login is written out first, and
/// the pty gets the current terminal size once before the copy starts.
pub async fn interact<T>(process: PtyProcess<T>, forwarder: &ResizeForwarder) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    let _raw = RawModeGuard::enable();
    forwarder.forward_now();

    let (pty, pending, child) = process.into_interactive();
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(&pending)
        .await
        .map_err(Error::Write)?;
    stdout.flush().await.map_err(Error::Write)?;

    copy_bidirectional(pty, tokio::io::stdin(), stdout).await?;

    if let Some(mut child) = child {
        match tokio::time::timeout(REAP_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) => tracing::debug!(%status, "ssh exited"),
            Ok(Err(e)) => tracing::debug!(error = %e, "could not reap ssh"),
            Err(_) => tracing::debug!("ssh still running after its pty closed"),
        }
    }
    Ok(())
}

/// Forward `input` to `pty` and `pty` to `output` until one side ends.
pub async fn copy_bidirectional<T, I, O>(mut pty: T, mut input: I, mut output: O) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let mut from_pty = [0u8; BUF_SIZE];
    let mut from_input = [0u8; BUF_SIZE];

    loop {
        tokio::select! {
            read = pty.read(&mut from_pty) => match read {
                Ok(0) => return Ok(()),
                Ok(n) => {
                    output.write_all(&from_pty[..n]).await.map_err(Error::Write)?;
                    output.flush().await.map_err(Error::Write)?;
                }
                Err(e) if e.raw_os_error() == Some(libc::EIO) => return Ok(()),
                Err(e) => {
                    return Err(Error::ConnectionLost {
                        reason: format!("read failed: {e}"),
                        transcript: Transcript::default(),
                    });
                }
            },
            read = input.read(&mut from_input) => match read {
                Ok(0) => return Ok(()),
                Ok(n) => pty.write_all(&from_input[..n]).await.map_err(Error::Write)?,
                Err(e) => {
                    tracing::debug!(error = %e, "terminal input closed");
                    return Ok(());
                }
            },
        }
    }
}
