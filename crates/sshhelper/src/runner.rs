//! Post-login commands.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::Command;
use crate::error::Result;
use crate::expect::PatternSet;
use crate::session::{PtyProcess, shell_prompt};

/// Runs configured commands one after another on a logged-in pty.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
    shell: PatternSet,
}

impl CommandRunner {
    /// A runner whose expectations give up after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            shell: PatternSet::from_patterns(vec![shell_prompt()]),
        }
    }

    /// Run one command.
    ///
    /// A plain command waits for the shell prompt before it is sent. An
    /// expect-then-send command waits for its pattern or, failing that,
    /// the shell prompt, and sends its text after either.
    pub async fn execute<T>(&self, process: &mut PtyProcess<T>, command: &Command) -> Result<()>
    where
        T: AsyncRead + AsyncWrite + Unpin + Send,
    {
        match command {
            Command::Plain(text) => {
                process.expect(&self.shell, self.timeout).await?;
                tracing::info!("executing {text}");
            }
            Command::ExpectThenSend(pattern, _) => {
                tracing::info!("expecting {pattern}");
                let mut candidates = PatternSet::new();
                candidates
                    .add(pattern.clone())
                    .add_named("shell prompt", shell_prompt());

                let m = process.expect(&candidates, self.timeout).await?;
                tracing::debug!(fallback = m.index == 1, "sending response");
            }
        }
        process.send(command.text()).await
    }

    /// Run every command in order, stopping at the first failure.
    pub async fn run_all<T>(&self, process: &mut PtyProcess<T>, commands: &[Command]) -> Result<()>
    where
        T: AsyncRead + AsyncWrite + Unpin + Send,
    {
        for command in commands {
            self.execute(process, command).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expect::Pattern;
    use crate::mock::MockTransport;

    fn runner() -> CommandRunner {
        CommandRunner::new(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn plain_waits_for_prompt() {
        let transport = MockTransport::new();
        let mut process = PtyProcess::new(transport.clone());

        // No prompt yet: nothing may be sent
        let err = runner()
            .execute(&mut process, &Command::Plain("ls".into()))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(transport.sent().is_empty());

        transport.queue_output_str("$ ");
        runner()
            .execute(&mut process, &Command::Plain("ls".into()))
            .await
            .unwrap();
        assert_eq!(transport.sent(), vec!["ls\n"]);
    }

    #[tokio::test]
    async fn expect_then_send_on_pattern() {
        let transport = MockTransport::new();
        transport.queue_output_str("Password: ");
        let mut process = PtyProcess::new(transport.clone());

        let command =
            Command::ExpectThenSend(Pattern::from_user("Password: ").unwrap(), "secret".into());
        runner().execute(&mut process, &command).await.unwrap();
        assert_eq!(transport.sent(), vec!["secret\n"]);
    }

    #[tokio::test]
    async fn expect_then_send_falls_back_to_shell_prompt() {
        let transport = MockTransport::new();
        transport.queue_output_str("[root@box ~]# ");
        let mut process = PtyProcess::new(transport.clone());

        let command =
            Command::ExpectThenSend(Pattern::from_user("Password: ").unwrap(), "secret".into());
        runner().execute(&mut process, &command).await.unwrap();
        assert_eq!(transport.sent(), vec!["secret\n"]);
    }

    #[tokio::test]
    async fn expect_then_send_ignores_unrelated_output() {
        let transport = MockTransport::new();
        transport.queue_output_str("Login incorrect\r\nlogin: ");
        let mut process = PtyProcess::new(transport.clone());

        let command =
            Command::ExpectThenSend(Pattern::from_user("Password: ").unwrap(), "secret".into());
        let err = runner().execute(&mut process, &command).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn run_all_stops_at_first_failure() {
        let transport = MockTransport::new().on_input("cd /srv\n", "no prompt here");
        transport.queue_output_str("$ ");
        let mut process = PtyProcess::new(transport.clone());

        let commands = vec![
            Command::Plain("cd /srv".into()),
            Command::Plain("ls".into()),
            Command::Plain("pwd".into()),
        ];
        assert!(runner().run_all(&mut process, &commands).await.is_err());
        assert_eq!(transport.sent(), vec!["cd /srv\n"]);
    }
}
