//! Forwarding terminal resizes to the active pty.
//!
//! One pty at a time receives our terminal's size. A session arms the
//! forwarder with its pty when it obtains one, so the last armed wins. The
//! SIGWINCH callback only reads the terminal size and applies it.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use sshhelper_pty::unix::{SignalHandle, on_window_change};
use sshhelper_pty::{WindowResizer, WindowSize};

type SizeSource = Arc<dyn Fn() -> Option<WindowSize> + Send + Sync>;

/// The size of our controlling terminal, if we have one.
#[must_use]
pub fn terminal_size() -> Option<WindowSize> {
    crossterm::terminal::size()
        .ok()
        .filter(|&(cols, rows)| cols > 0 && rows > 0)
        .map(WindowSize::from)
}

/// Process-wide "active pty" slot plus the resize handler that reads it.
#[derive(Clone)]
pub struct ResizeForwarder {
    active: Arc<Mutex<Option<Arc<dyn WindowResizer>>>>,
    size_source: SizeSource,
}

impl std::fmt::Debug for ResizeForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResizeForwarder")
            .field("armed", &self.is_armed())
            .finish()
    }
}

impl ResizeForwarder {
    /// A forwarder that reads the controlling terminal's size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_size_source(terminal_size)
    }

    /// A forwarder with a custom size source.
    pub fn with_size_source<F>(source: F) -> Self
    where
        F: Fn() -> Option<WindowSize> + Send + Sync + 'static,
    {
        Self {
            active: Arc::new(Mutex::new(None)),
            size_source: Arc::new(source),
        }
    }

    /// Make `target` the pty that receives resizes.
    pub fn arm(&self, target: Arc<dyn WindowResizer>) {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(target);
        tracing::debug!("resize forwarding armed");
    }

    /// Whether a pty is armed.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Apply `size` to the armed pty. Returns whether a pty was resized.
    pub fn forward_size(&self, size: WindowSize) -> bool {
        let target = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(target) = target else {
            return false;
        };

        match target.set_window_size(size) {
            Ok(()) => {
                tracing::debug!(rows = size.rows, cols = size.cols, "resized pty");
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "pty resize failed");
                false
            }
        }
    }

    /// Read the current terminal size and apply it.
    pub fn forward_now(&self) -> bool {
        (self.size_source)().is_some_and(|size| self.forward_size(size))
    }

    /// Start forwarding on every SIGWINCH until the handle is dropped.
    pub fn install(&self) -> io::Result<SignalHandle> {
        let forwarder = self.clone();
        on_window_change(move || {
            forwarder.forward_now();
        })
    }
}

impl Default for ResizeForwarder {
    fn default() -> Self {
        Self::new()
    }
}
