//! The login state machine and jump-host chaining.

use super::process::PtyProcess;
use super::prompt::{LoginPrompt, PromptMatcher};
use crate::backend::{SshCommand, Spawner};
use crate::config::{Config, Endpoint};
use crate::error::{Error, Result};
use crate::probe::Prober;
use crate::resize::ResizeForwarder;

/// Everything a login needs besides the endpoint.
pub struct LoginContext<'a, S, P> {
    /// Loaded configuration (settings and jump host).
    pub config: &'a Config,
    /// Starts ssh on a new pty.
    pub spawner: &'a S,
    /// Checks reachability before connecting.
    pub prober: &'a P,
    /// Receives each session's pty for resize forwarding.
    pub forwarder: &'a ResizeForwarder,
}

impl<S, P> Clone for LoginContext<'_, S, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, P> Copy for LoginContext<'_, S, P> {}

/// One ssh login.
///
/// A session that cannot reach its host directly logs into the configured
/// jump host first (as a nested session) and then runs ssh from the jump
/// host's shell, on the same pty.
pub struct LoginSession<'a, S, P> {
    endpoint: &'a Endpoint,
    is_jump_hop: bool,
    ctx: LoginContext<'a, S, P>,
    prompts: PromptMatcher,
}

impl<'a, S, P> LoginSession<'a, S, P>
where
    S: Spawner,
    P: Prober,
{
    /// A top-level session for `endpoint`.
    pub fn new(endpoint: &'a Endpoint, ctx: LoginContext<'a, S, P>) -> Self {
        Self {
            endpoint,
            is_jump_hop: false,
            ctx,
            prompts: PromptMatcher::new(),
        }
    }

    fn jump_hop(endpoint: &'a Endpoint, ctx: LoginContext<'a, S, P>) -> Self {
        Self {
            is_jump_hop: true,
            ..Self::new(endpoint, ctx)
        }
    }

    /// Log in and return the pty, past the password prompt.
    ///
    /// The returned process has had its password sent (if one was asked
    /// for); it is not known yet whether the password was accepted.
    pub async fn login(&self) -> Result<PtyProcess<S::Transport>> {
        tracing::info!("Start login into {}, please wait...", self.endpoint.address);
        let adopted = self.route().await?;
        self.connect(adopted).await
    }

    /// Decide how to reach the host: directly, or through the jump host.
    ///
    /// Returns the jump host's pty when one was needed.
    async fn route(&self) -> Result<Option<PtyProcess<S::Transport>>> {
        if self.ctx.prober.is_reachable(&self.endpoint.address).await {
            return Ok(None);
        }
        tracing::info!("{} is not available directly.", self.endpoint.address);

        let jump = match &self.ctx.config.jump_host {
            Some(jump) if !self.is_jump_hop => jump,
            _ => {
                return Err(Error::Unreachable {
                    host: self.endpoint.address.clone(),
                });
            }
        };
        tracing::info!("Using the jump server {}.", jump.address);

        let hop = Self::jump_hop(jump, self.ctx);
        let process = Box::pin(hop.login()).await?;
        Ok(Some(process))
    }

    /// Start ssh (or type it into an adopted jump-host shell) and log in.
    pub async fn connect(
        &self,
        adopted: Option<PtyProcess<S::Transport>>,
    ) -> Result<PtyProcess<S::Transport>> {
        let settings = &self.ctx.config.settings;
        let command = SshCommand::new(&settings.ssh_binary, self.endpoint)?;

        let mut process = match adopted {
            Some(mut process) => {
                process
                    .expect(self.prompts.shell_prompt(), settings.login_timeout)
                    .await?;
                process.send(command.command_line()).await?;
                process
            }
            None => self.ctx.spawner.spawn(&command).await?,
        };

        if let Some(resizer) = process.resizer() {
            self.ctx.forwarder.arm(resizer);
        }

        self.authenticate(&mut process).await?;
        Ok(process)
    }

    async fn authenticate(&self, process: &mut PtyProcess<S::Transport>) -> Result<()> {
        let timeout = self.ctx.config.settings.login_timeout;
        let host = &self.endpoint.address;

        let first = process.expect(self.prompts.first_prompt(), timeout).await?;
        match PromptMatcher::classify_first(&first) {
            LoginPrompt::Timeout => {
                Err(process.timeout_error(format!("waiting for a login prompt from {host}"), timeout))
            }
            LoginPrompt::Shell => {
                tracing::debug!(host = %host, "already at a shell, no password needed");
                Ok(())
            }
            LoginPrompt::Refused => Err(Error::Refused {
                host: host.clone(),
                transcript: process.transcript(),
            }),
            LoginPrompt::HostKey => {
                tracing::debug!(host = %host, "accepting host key");
                process.send("yes").await?;

                let next = process.expect(self.prompts.password_prompt(), timeout).await?;
                if PromptMatcher::classify_password(&next) == LoginPrompt::Timeout {
                    return Err(process.timeout_error(
                        format!("waiting for the password prompt from {host}"),
                        timeout,
                    ));
                }
                self.send_password(process).await
            }
            LoginPrompt::Password => self.send_password(process).await,
        }
    }

    async fn send_password(&self, process: &mut PtyProcess<S::Transport>) -> Result<()> {
        tracing::debug!(host = %self.endpoint.address, "sending password");
        process.send(&self.endpoint.password).await
    }
}
