//! Starting ssh on a fresh pseudo-terminal.

use std::future::Future;
use std::sync::Arc;

use sshhelper_pty::{NativePtySystem, PtyConfig, PtyMaster, PtySystem, UnixPtyMaster};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::Endpoint;
use crate::error::{Error, Result};
use crate::resize::terminal_size;
use crate::session::PtyProcess;

/// The ssh invocation for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshCommand {
    program: String,
    args: Vec<String>,
    line: String,
}

impl SshCommand {
    /// `<ssh_binary> <ssh_args...> -l <user> -p <port> <address>`.
    ///
    /// Extra arguments are split with shell quoting rules, so
    /// `-o "ProxyCommand=ssh -W %h:%p bastion"` is one option value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the extra arguments have unbalanced
    /// quotes or the command cannot be quoted for a shell.
    pub fn new(ssh_binary: &str, endpoint: &Endpoint) -> Result<Self> {
        let mut args = split_ssh_args(&endpoint.ssh_args)?;
        args.extend([
            "-l".to_string(),
            endpoint.username.clone(),
            "-p".to_string(),
            endpoint.port.to_string(),
            endpoint.address.clone(),
        ]);

        let line = shlex::try_join(
            std::iter::once(ssh_binary).chain(args.iter().map(String::as_str)),
        )
        .map_err(|e| Error::config(format!("cannot quote ssh command for {}: {e}", endpoint.address)))?;

        Ok(Self {
            program: ssh_binary.to_string(),
            args,
            line,
        })
    }

    /// The executable.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments after the executable.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The invocation as one shell-quoted line, for typing into a remote shell.
    #[must_use]
    pub fn command_line(&self) -> &str {
        &self.line
    }
}

/// Split extra ssh arguments the way a POSIX shell would.
///
/// # Errors
///
/// Returns [`Error::Config`] for unbalanced quotes or a trailing escape.
pub fn split_ssh_args(ssh_args: &str) -> Result<Vec<String>> {
    shlex::split(ssh_args)
        .ok_or_else(|| Error::config(format!("cannot parse ssh_args `{ssh_args}`")))
}

impl std::fmt::Display for SshCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.command_line())
    }
}

/// Produces a [`PtyProcess`] running an ssh command.
pub trait Spawner: Send + Sync {
    /// The pty master type handed to the process.
    type Transport: AsyncRead + AsyncWrite + Unpin + Send;

    /// Start `command` on a new pty.
    fn spawn(
        &self,
        command: &SshCommand,
    ) -> impl Future<Output = Result<PtyProcess<Self::Transport>>> + Send;
}

/// Spawns ssh on a real Unix pty.
///
/// The child gets a new session with the pty slave as its controlling
/// terminal, sized like our own terminal (80x24 when we have none).
#[derive(Debug, Clone, Copy, Default)]
pub struct PtySpawner;

impl Spawner for PtySpawner {
    type Transport = UnixPtyMaster;

    async fn spawn(&self, command: &SshCommand) -> Result<PtyProcess<UnixPtyMaster>> {
        let spawn_error = |source| Error::Spawn {
            command: command.command_line().to_string(),
            source,
        };

        let config = PtyConfig::new().with_window_size(terminal_size().unwrap_or_default());
        let (master, child) = NativePtySystem::spawn(command.program(), command.args(), &config)
            .await
            .map_err(spawn_error)?;
        let resizer = master.resizer().map_err(spawn_error)?;

        tracing::debug!(pid = child.pid(), command = %command, "spawned ssh");
        Ok(PtyProcess::new(master)
            .with_child(Box::new(child))
            .with_resizer(Arc::new(resizer)))
    }
}
