//! SIGWINCH subscription.
//!
//! The callback runs on a dedicated thread, outside of the async read loop,
//! so it can fire while the main task is blocked waiting for PTY output.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::signal::SIGWINCH;
use signal_hook::iterator::{Handle, Signals};

/// A handle to a running signal handler thread.
///
/// Dropping the handle stops the thread.
#[derive(Debug)]
pub struct SignalHandle {
    shutdown: Arc<AtomicBool>,
    signals: Handle,
}

impl SignalHandle {
    /// Stop the handler thread.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.signals.close();
    }
}

impl Drop for SignalHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Register a callback for SIGWINCH (window resize) signals.
///
/// The callback is invoked on a background thread each time the controlling
/// terminal is resized. Keep the returned handle alive for as long as the
/// callback should stay registered.
///
/// # Errors
///
/// Returns an error if signal registration or thread creation fails.
pub fn on_window_change<F>(callback: F) -> io::Result<SignalHandle>
where
    F: Fn() + Send + 'static,
{
    let mut signals = Signals::new([SIGWINCH])?;
    let handle = signals.handle();
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = Arc::clone(&shutdown);

    std::thread::Builder::new()
        .name("pty-sigwinch-handler".into())
        .spawn(move || {
            for _ in signals.forever() {
                if shutdown_clone.load(Ordering::SeqCst) {
                    break;
                }
                callback();
            }
        })?;

    Ok(SignalHandle {
        shutdown,
        signals: handle,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn callback_runs_on_sigwinch() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let handle = on_window_change(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        signal_hook::low_level::raise(SIGWINCH).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while hits.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(hits.load(Ordering::SeqCst) >= 1);

        handle.shutdown();
        assert!(handle.shutdown.load(Ordering::SeqCst));
    }
}
