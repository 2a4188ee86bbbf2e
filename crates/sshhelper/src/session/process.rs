//! A child process driven through its pseudo-terminal.

use std::sync::Arc;
use std::time::Duration;

use sshhelper_pty::{PtyChild, WindowResizer, WindowSize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use crate::error::{Error, Result, Transcript};
use crate::expect::{DEFAULT_CAPACITY, Match, Matcher, PatternSet};

/// Line terminator appended by [`PtyProcess::send`].
pub const LINE_ENDING: &str = "\n";

const READ_CHUNK: usize = 4096;

/// A process on a pty, with an expect/send interface.
///
/// `T` is the master side of the pty. The real binary uses
/// [`UnixPtyMaster`](sshhelper_pty::UnixPtyMaster); tests use
/// `MockTransport` from the `mock` feature.
pub struct PtyProcess<T> {
    transport: T,
    matcher: Matcher,
    /// Text consumed by the last successful match.
    last_consumed: String,
    child: Option<Box<dyn PtyChild>>,
    resizer: Option<Arc<dyn WindowResizer>>,
    eof: bool,
}

impl<T> std::fmt::Debug for PtyProcess<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyProcess")
            .field("pid", &self.child.as_ref().map(|c| c.pid()))
            .field("eof", &self.eof)
            .finish()
    }
}

impl<T> PtyProcess<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap a transport with no child handle and no resize target.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            matcher: Matcher::new(DEFAULT_CAPACITY),
            last_consumed: String::new(),
            child: None,
            resizer: None,
            eof: false,
        }
    }

    /// Attach the child process handle.
    #[must_use]
    pub fn with_child(mut self, child: Box<dyn PtyChild>) -> Self {
        self.child = Some(child);
        self
    }

    /// Attach the handle used to resize the pty.
    #[must_use]
    pub fn with_resizer(mut self, resizer: Arc<dyn WindowResizer>) -> Self {
        self.resizer = Some(resizer);
        self
    }

    /// The resize handle for this pty, if any.
    #[must_use]
    pub fn resizer(&self) -> Option<Arc<dyn WindowResizer>> {
        self.resizer.clone()
    }

    /// Wait until one of `patterns` matches the output.
    ///
    /// Patterns are tried in list order after every read and the first one
    /// that matches wins. When the deadline passes, the index of the
    /// [`Pattern::Timeout`](crate::expect::Pattern::Timeout) entry is
    /// returned if the set has one; otherwise the call fails with
    /// [`Error::Timeout`].
    ///
    /// End of file or a read error fails with [`Error::ConnectionLost`].
    pub async fn expect(&mut self, patterns: &PatternSet, timeout: Duration) -> Result<Match> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(m) = self.matcher.try_consume(patterns) {
                tracing::debug!(
                    index = m.index,
                    pattern = patterns.get(m.index).map_or("", |p| p.label()),
                    "pattern matched"
                );
                self.last_consumed = m.consumed();
                return Ok(m);
            }

            if self.eof {
                return Err(self.connection_lost("end of file on the pty"));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return match patterns.timeout_index() {
                    Some(index) => {
                        tracing::debug!(index, "expect deadline passed");
                        Ok(Match::new(index, "", ""))
                    }
                    None => Err(self.timeout_error(
                        format!("waiting for {}", patterns.describe()),
                        timeout,
                    )),
                };
            }

            self.read_with_timeout(remaining).await?;
        }
    }

    /// Write `text` followed by the line terminator.
    pub async fn send(&mut self, text: &str) -> Result<()> {
        let data = format!("{text}{LINE_ENDING}");
        self.send_raw(data.as_bytes()).await
    }

    /// Write bytes as they are.
    pub async fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        self.transport.write_all(data).await.map_err(Error::Write)?;
        self.transport.flush().await.map_err(Error::Write)
    }

    /// Set the pty window size.
    ///
    /// A process without a resize handle ignores the call.
    pub fn set_window_size(&self, rows: u16, cols: u16) -> sshhelper_pty::Result<()> {
        match &self.resizer {
            Some(resizer) => resizer.set_window_size(WindowSize::from_rows_cols(rows, cols)),
            None => Ok(()),
        }
    }

    /// Output captured so far: the last match and what is still pending.
    #[must_use]
    pub fn transcript(&mut self) -> Transcript {
        Transcript::new(self.last_consumed.clone(), self.matcher.buffer_str())
    }

    /// Build a timeout error carrying the current transcript.
    #[must_use]
    pub fn timeout_error(&mut self, context: impl Into<String>, duration: Duration) -> Error {
        Error::Timeout {
            context: context.into(),
            duration,
            transcript: self.transcript(),
        }
    }

    fn connection_lost(&mut self, reason: impl Into<String>) -> Error {
        Error::ConnectionLost {
            reason: reason.into(),
            transcript: self.transcript(),
        }
    }

    /// Give up the expect layer for raw byte forwarding.
    ///
    /// Returns the transport, the raw output not yet consumed by a match,
    /// and the child handle.
    pub fn into_interactive(mut self) -> (T, Vec<u8>, Option<Box<dyn PtyChild>>) {
        let pending = self.matcher.take_pending();
        (self.transport, pending, self.child)
    }

    async fn read_with_timeout(&mut self, timeout: Duration) -> Result<()> {
        let mut buf = [0u8; READ_CHUNK];

        match tokio::time::timeout(timeout, self.transport.read(&mut buf)).await {
            Ok(Ok(0)) => {
                self.eof = true;
                Ok(())
            }
            Ok(Ok(n)) => {
                self.matcher.append(&buf[..n]);
                Ok(())
            }
            // Linux reports EIO on the master once the slave side is gone
            Ok(Err(e)) if e.raw_os_error() == Some(libc::EIO) => {
                self.eof = true;
                Ok(())
            }
            Ok(Err(e)) => Err(self.connection_lost(format!("read failed: {e}"))),
            // Deadline reached; the caller decides what that means
            Err(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expect::Pattern;
    use crate::mock::{MockTransport, RecordingResizer};

    fn prompt_set() -> PatternSet {
        PatternSet::from_patterns(vec![
            Pattern::Timeout,
            Pattern::regex("(?i)password: ").unwrap(),
            Pattern::regex("[#$] ").unwrap(),
        ])
    }

    #[tokio::test]
    async fn expect_returns_first_pattern_in_list_order() {
        let transport = MockTransport::new();
        transport.queue_output_str("user@box:~$ Password: ");
        let mut process = PtyProcess::new(transport);

        let m = process
            .expect(&prompt_set(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(m.index, 1);
    }

    #[tokio::test]
    async fn expect_reports_timeout_index() {
        let transport = MockTransport::new();
        transport.queue_output_str("nothing interesting");
        let mut process = PtyProcess::new(transport);

        let m = process
            .expect(&prompt_set(), Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(m.index, 0);
        assert_eq!(process.transcript().pending, "nothing interesting");
    }

    #[tokio::test]
    async fn expect_without_timeout_pattern_fails() {
        let mut process = PtyProcess::new(MockTransport::new());
        let set = PatternSet::from_patterns(vec![Pattern::literal("never")]);

        let err = process
            .expect(&set, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("'never'"));
    }

    #[tokio::test]
    async fn eof_is_connection_lost() {
        let transport = MockTransport::new();
        transport.queue_output_str("ssh: connect to host 10.0.0.5 port 22: No route to host\r\n");
        transport.signal_eof();
        let mut process = PtyProcess::new(transport);

        let err = process
            .expect(&prompt_set(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConnectionLost { .. }));
        assert!(err.transcript().unwrap().pending.contains("No route to host"));
    }

    #[tokio::test]
    async fn send_appends_line_ending() {
        let transport = MockTransport::new();
        let mut process = PtyProcess::new(transport.clone());

        process.send("yes").await.unwrap();
        assert_eq!(transport.take_input_str(), "yes\n");
    }

    #[tokio::test]
    async fn transcript_tracks_last_match() {
        let transport = MockTransport::new();
        transport.queue_output_str("Last login: Mon\r\n$ ");
        let mut process = PtyProcess::new(transport.clone());

        process
            .expect(&prompt_set(), Duration::from_secs(1))
            .await
            .unwrap();
        transport.queue_output_str("partial");
        let _ = process
            .expect(
                &PatternSet::from_patterns(vec![Pattern::Timeout, Pattern::literal("zzz")]),
                Duration::from_millis(20),
            )
            .await
            .unwrap();

        let transcript = process.transcript();
        assert_eq!(transcript.consumed, "Last login: Mon\r\n$ ");
        assert_eq!(transcript.pending, "partial");
    }

    #[tokio::test]
    async fn window_size_goes_to_resizer() {
        let resizer = Arc::new(RecordingResizer::new());
        let process = PtyProcess::new(MockTransport::new()).with_resizer(resizer.clone());

        process.set_window_size(40, 120).unwrap();
        assert_eq!(resizer.last(), Some(WindowSize::from_rows_cols(40, 120)));
    }

    #[tokio::test]
    async fn into_interactive_hands_over_pending_output() {
        let transport = MockTransport::new();
        transport.queue_output_str("$ motd");
        let mut process = PtyProcess::new(transport);
        let set = PatternSet::from_patterns(vec![Pattern::regex("[#$] ").unwrap()]);
        process.expect(&set, Duration::from_secs(1)).await.unwrap();

        let (_transport, pending, child) = process.into_interactive();
        assert_eq!(pending, b"motd");
        assert!(child.is_none());
    }

    #[tokio::test]
    async fn prompt_split_across_reads_still_matches() {
        let transport = MockTransport::new().with_read_chunk(4);
        transport.queue_output_str("jim@10.0.0.5's password: ");
        let mut process = PtyProcess::new(transport);

        let m = process
            .expect(&prompt_set(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(m.index, 1);
        assert_eq!(m.matched, "password: ");
    }

    #[tokio::test]
    async fn multibyte_prompt_split_across_reads_matches() {
        let transport = MockTransport::new().with_read_chunk(3);
        transport.queue_output_str("$ 密码：");
        let mut process = PtyProcess::new(transport);

        let shell = PatternSet::from_patterns(vec![Pattern::regex("[#$] ").unwrap()]);
        process.expect(&shell, Duration::from_secs(1)).await.unwrap();

        let localized =
            PatternSet::from_patterns(vec![Pattern::Timeout, Pattern::regex("密码").unwrap()]);
        let m = process
            .expect(&localized, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(m.index, 1);
        assert_eq!(m.matched, "密码");
        assert!(m.before.is_empty());
    }

    #[tokio::test]
    async fn into_interactive_keeps_partial_character() {
        let transport = MockTransport::new().with_read_chunk(3);
        transport.queue_output_str("$ 密");
        let mut process = PtyProcess::new(transport);
        let shell = PatternSet::from_patterns(vec![Pattern::regex("[#$] ").unwrap()]);
        process.expect(&shell, Duration::from_secs(1)).await.unwrap();

        let (_transport, pending, _child) = process.into_interactive();
        assert_eq!(pending, &"密".as_bytes()[..1]);
    }
}
