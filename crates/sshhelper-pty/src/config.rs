//! Configuration types for PTY creation.
//!
//! [`PtyConfig`] controls how the child is spawned and [`WindowSize`]
//! carries terminal dimensions.

/// Configuration for creating a new PTY session.
///
/// # Example
///
/// ```
/// use sshhelper_pty::{PtyConfig, WindowSize};
///
/// let config = PtyConfig::new().with_window_size(WindowSize::new(120, 40));
/// assert_eq!(config.window_size.cols, 120);
/// ```
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Initial window size.
    pub window_size: WindowSize,

    /// Start the child in a new session with the slave as its controlling terminal.
    pub controlling_terminal: bool,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            window_size: WindowSize::default(),
            controlling_terminal: true,
        }
    }
}

impl PtyConfig {
    /// Create a new `PtyConfig` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial window size.
    #[must_use]
    pub const fn with_window_size(mut self, size: WindowSize) -> Self {
        self.window_size = size;
        self
    }
}

/// Window size for the PTY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    /// Number of columns (characters per line).
    pub cols: u16,
    /// Number of rows (lines).
    pub rows: u16,
}

impl WindowSize {
    /// Create a new window size with the given dimensions.
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    /// Create a window size from a rows-first pair, the order terminals report in.
    #[must_use]
    pub const fn from_rows_cols(rows: u16, cols: u16) -> Self {
        Self { cols, rows }
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

impl From<(u16, u16)> for WindowSize {
    fn from((cols, rows): (u16, u16)) -> Self {
        Self::new(cols, rows)
    }
}
