//! A scripted in-memory pty.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, Waker};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Something the remote side does once it has seen a trigger.
#[derive(Debug, Clone)]
enum Reaction {
    Output(String),
    Eof,
}

#[derive(Debug, Default)]
struct MockState {
    /// Data waiting to be read by the client.
    output: VecDeque<u8>,
    /// Every write, in order.
    sent: Vec<String>,
    /// Written text not yet consumed by a trigger.
    unmatched: String,
    /// Pending (trigger, reaction) steps, in order.
    script: VecDeque<(String, Reaction)>,
    /// Upper bound on bytes returned by one read.
    read_chunk: Option<usize>,
    eof: bool,
    waker: Option<Waker>,
}

impl MockState {
    fn wake(&mut self) {
        if let Some(waker) = self.waker.take() {
            waker.wake();
        }
    }

    fn run_script(&mut self) {
        while let Some((trigger, _)) = self.script.front() {
            let Some(pos) = self.unmatched.find(trigger.as_str()) else {
                break;
            };
            let end = pos + trigger.len();
            self.unmatched.drain(..end);

            if let Some((_, reaction)) = self.script.pop_front() {
                match reaction {
                    Reaction::Output(text) => self.output.extend(text.as_bytes()),
                    Reaction::Eof => self.eof = true,
                }
            }
        }
    }
}

/// An in-memory pty master.
///
/// Output queued with [`queue_output_str`](Self::queue_output_str) is read
/// by the client. Each [`on_input`](Self::on_input) step waits for its
/// trigger to appear in what the client wrote, then queues its response;
/// steps fire strictly in the order they were added. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a new mock transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand out at most `bytes` per read, so prompts and multibyte
    /// characters arrive split across reads.
    #[must_use]
    pub fn with_read_chunk(self, bytes: usize) -> Self {
        self.lock().read_chunk = Some(bytes.max(1));
        self
    }

    /// Respond with `response` once `trigger` has been written.
    #[must_use]
    pub fn on_input(self, trigger: impl Into<String>, response: impl Into<String>) -> Self {
        self.lock()
            .script
            .push_back((trigger.into(), Reaction::Output(response.into())));
        self
    }

    /// Close the stream once `trigger` has been written.
    #[must_use]
    pub fn eof_on_input(self, trigger: impl Into<String>) -> Self {
        self.lock().script.push_back((trigger.into(), Reaction::Eof));
        self
    }

    /// Queue output to be read.
    pub fn queue_output(&self, data: &[u8]) {
        let mut state = self.lock();
        state.output.extend(data);
        state.wake();
    }

    /// Queue a string to be read.
    pub fn queue_output_str(&self, s: &str) {
        self.queue_output(s.as_bytes());
    }

    /// Signal EOF once queued output has been read.
    pub fn signal_eof(&self) {
        let mut state = self.lock();
        state.eof = true;
        state.wake();
    }

    /// Every write so far, one entry per write call.
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    /// Everything written so far, concatenated.
    #[must_use]
    pub fn take_input_str(&self) -> String {
        std::mem::take(&mut self.lock().sent).concat()
    }

    /// Script steps whose trigger has not been written yet.
    #[must_use]
    pub fn pending_steps(&self) -> usize {
        self.lock().script.len()
    }
}

impl AsyncRead for MockTransport {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let mut state = self.lock();

        if !state.output.is_empty() {
            let limit = state.read_chunk.unwrap_or(usize::MAX);
            let n = buf.remaining().min(state.output.len()).min(limit);
            let chunk: Vec<u8> = state.output.drain(..n).collect();
            buf.put_slice(&chunk);
            return Poll::Ready(Ok(()));
        }

        if state.eof {
            return Poll::Ready(Ok(()));
        }

        state.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl AsyncWrite for MockTransport {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut state = self.lock();
        let text = String::from_utf8_lossy(buf).into_owned();
        state.unmatched.push_str(&text);
        state.sent.push(text);
        state.run_script();
        state.wake();
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
