//! sshhelper: automated ssh logins over a pseudo-terminal.
//!
//! The crate drives the system `ssh` client the way a person would: it
//! starts ssh on a pty, watches the output for the host key question, the
//! password prompt, a shell prompt or a refusal, and answers accordingly.
//! Hosts that do not answer a ping are reached through a configured jump
//! host, on the same pty. After login a list of configured commands runs,
//! and then the session is handed to the user.
//!
//! # Features
//!
//! - **Ordered prompt matching**: the first pattern in a list wins, not the
//!   first one in the text
//! - **Jump-host chaining** with adoption of the jump host's pty
//! - **Scripted commands**, plain or expect-then-send
//! - **Resize forwarding** from SIGWINCH to the active pty
//! - **Mock backend** for driving the state machine in tests
//!
//! # Example
//!
//! ```ignore
//! use sshhelper::{CommandRunner, Config, LoginContext, LoginSession, PingProbe, PtySpawner,
//!     ResizeForwarder};
//!
//! #[tokio::main]
//! async fn main() -> sshhelper::Result<()> {
//!     let config = Config::load("hosts.toml".as_ref())?;
//!     let profile = config.hosts.resolve("11.3")?;
//!     let forwarder = ResizeForwarder::new();
//!     let prober = PingProbe::from_settings(&config.settings);
//!     let ctx = LoginContext {
//!         config: &config,
//!         spawner: &PtySpawner,
//!         prober: &prober,
//!         forwarder: &forwarder,
//!     };
//!
//!     let mut process = LoginSession::new(&profile.endpoint, ctx).login().await?;
//!     CommandRunner::new(config.settings.command_timeout)
//!         .run_all(&mut process, &profile.commands)
//!         .await?;
//!     sshhelper::interact::interact(process, &forwarder).await
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod expect;
pub mod interact;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod probe;
pub mod resize;
pub mod runner;
pub mod session;

pub use backend::{PtySpawner, SshCommand, Spawner};
pub use config::{Command, Config, EnvConfig, Endpoint, HostProfile, HostTable, JumpHostConfig, Settings};
pub use error::{Error, ExitCode, Result, Transcript};
pub use expect::{Match, Pattern, PatternSet};
pub use probe::{PingProbe, Prober};
pub use resize::ResizeForwarder;
pub use runner::CommandRunner;
pub use session::{LoginContext, LoginPrompt, LoginSession, PromptMatcher, PtyProcess};
