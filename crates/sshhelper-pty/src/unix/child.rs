//! Unix child process management for PTY.
//!
//! Spawns the child with the slave side of the PTY as its standard streams
//! and controlling terminal, and tracks its lifecycle.

use std::ffi::OsStr;
use std::future::Future;
use std::io;
use std::os::unix::io::{AsRawFd, OwnedFd};
use std::pin::Pin;
use std::process::{ExitStatus as StdExitStatus, Stdio};

use tokio::process::{Child as TokioChild, Command};
use tokio::sync::Mutex;

use crate::config::PtyConfig;
use crate::error::{PtyError, Result, errno_to_io};
use crate::traits::{ExitStatus, PtyChild};

/// Unix child process handle.
pub struct UnixPtyChild {
    child: Mutex<TokioChild>,
    pid: u32,
}

impl std::fmt::Debug for UnixPtyChild {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnixPtyChild").field("pid", &self.pid).finish()
    }
}

impl UnixPtyChild {
    fn new(child: TokioChild) -> Result<Self> {
        let pid = child.id().ok_or_else(|| {
            PtyError::Spawn(io::Error::other("child exited before its pid was read"))
        })?;
        Ok(Self {
            child: Mutex::new(child),
            pid,
        })
    }

    /// Get the process ID.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Wait for the child process to exit.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        let status = self.child.get_mut().wait().await.map_err(PtyError::Wait)?;
        Ok(convert_exit_status(status))
    }
}

impl PtyChild for UnixPtyChild {
    fn pid(&self) -> u32 {
        Self::pid(self)
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = Result<ExitStatus>> + Send + '_>> {
        Box::pin(Self::wait(self))
    }
}

fn convert_exit_status(status: StdExitStatus) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    if let Some(code) = status.code() {
        ExitStatus::Exited(code)
    } else if let Some(signal) = status.signal() {
        ExitStatus::Signaled(signal)
    } else {
        ExitStatus::Exited(-1)
    }
}

/// Spawn a child process in a PTY.
///
/// The slave descriptor becomes the child's stdin, stdout and stderr. With
/// `config.controlling_terminal` set, the child starts a new session and
/// acquires the slave as its controlling terminal, which is what lets ssh
/// prompt for passwords on it.
#[allow(unsafe_code)]
pub fn spawn_child<S, I>(
    slave_fd: OwnedFd,
    program: S,
    args: I,
    config: &PtyConfig,
) -> Result<UnixPtyChild>
where
    S: AsRef<OsStr>,
    I: IntoIterator,
    I::Item: AsRef<OsStr>,
{
    let dup = |fd: &OwnedFd| -> Result<Stdio> {
        rustix::io::fcntl_dupfd_cloexec(fd, 0)
            .map(Stdio::from)
            .map_err(|e| PtyError::Spawn(errno_to_io(e)))
    };

    let mut cmd = Command::new(program.as_ref());
    cmd.args(args);
    cmd.stdin(dup(&slave_fd)?);
    cmd.stdout(dup(&slave_fd)?);
    cmd.stderr(dup(&slave_fd)?);

    if config.controlling_terminal {
        let slave_raw = slave_fd.as_raw_fd();
        // SAFETY: setsid and ioctl are async-signal-safe and touch no
        // memory shared with the parent.
        unsafe {
            cmd.pre_exec(move || {
                if libc::setsid() == -1 {
                    return Err(io::Error::last_os_error());
                }
                if libc::ioctl(slave_raw, libc::TIOCSCTTY as _, 0) == -1 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }

    let child = cmd.spawn().map_err(PtyError::Spawn)?;
    drop(slave_fd);

    UnixPtyChild::new(child)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unix::UnixPtyMaster;
    use crate::unix::open_slave;

    #[tokio::test]
    async fn spawn_and_wait_true() {
        let Ok((_master, slave_path)) = UnixPtyMaster::open() else {
            return;
        };
        let slave = open_slave(&slave_path).unwrap();
        let mut child = spawn_child(slave, "true", std::iter::empty::<&str>(), &PtyConfig::default())
            .unwrap();

        assert!(child.pid() > 0);
        assert_eq!(child.wait().await.unwrap(), ExitStatus::Exited(0));
    }

    #[tokio::test]
    async fn exit_code_is_reported() {
        let Ok((_master, slave_path)) = UnixPtyMaster::open() else {
            return;
        };
        let slave = open_slave(&slave_path).unwrap();
        let mut child = spawn_child(slave, "sh", ["-c", "exit 3"], &PtyConfig::default()).unwrap();

        assert_eq!(child.wait().await.unwrap(), ExitStatus::Exited(3));
    }
}
