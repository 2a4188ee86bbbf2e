//! Mock spawner, prober and resizer.

use std::collections::{HashSet, VecDeque};
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use sshhelper_pty::{PtyError, WindowResizer, WindowSize};

use super::MockTransport;
use crate::backend::{SshCommand, Spawner};
use crate::error::{Error, Result};
use crate::probe::Prober;
use crate::session::PtyProcess;

/// Hands out prepared transports, one per spawn, and records each command.
///
/// Every spawned process gets its own [`RecordingResizer`].
#[derive(Debug, Default)]
pub struct MockSpawner {
    transports: Mutex<VecDeque<MockTransport>>,
    spawned: Mutex<Vec<SshCommand>>,
    resizers: Mutex<Vec<Arc<RecordingResizer>>>,
}

impl MockSpawner {
    /// A spawner that returns `transports` in order.
    pub fn new(transports: impl IntoIterator<Item = MockTransport>) -> Self {
        Self {
            transports: Mutex::new(transports.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Commands spawned so far.
    #[must_use]
    pub fn spawned(&self) -> Vec<SshCommand> {
        self.spawned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Resizers given to spawned processes, in spawn order.
    #[must_use]
    pub fn resizers(&self) -> Vec<Arc<RecordingResizer>> {
        self.resizers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Spawner for MockSpawner {
    type Transport = MockTransport;

    async fn spawn(&self, command: &SshCommand) -> Result<PtyProcess<MockTransport>> {
        self.spawned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command.clone());

        let transport = self
            .transports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| Error::Spawn {
                command: command.command_line().to_string(),
                source: PtyError::Spawn(io::Error::new(
                    io::ErrorKind::NotFound,
                    "no scripted transport left",
                )),
            })?;

        let resizer = Arc::new(RecordingResizer::new());
        self.resizers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&resizer));

        Ok(PtyProcess::new(transport).with_resizer(resizer))
    }
}

/// Reachability from a fixed list of unreachable hosts.
#[derive(Debug, Default)]
pub struct MockProber {
    unreachable: HashSet<String>,
    probed: Mutex<Vec<String>>,
}

impl MockProber {
    /// Every host is reachable.
    #[must_use]
    pub fn all_reachable() -> Self {
        Self::default()
    }

    /// Mark `address` as unreachable.
    #[must_use]
    pub fn with_unreachable(mut self, address: impl Into<String>) -> Self {
        self.unreachable.insert(address.into());
        self
    }

    /// Addresses probed so far, in order.
    #[must_use]
    pub fn probed(&self) -> Vec<String> {
        self.probed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Prober for MockProber {
    async fn is_reachable(&self, address: &str) -> bool {
        self.probed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(address.to_string());
        !self.unreachable.contains(address)
    }
}

/// A resize target that remembers every size applied to it.
#[derive(Debug, Default)]
pub struct RecordingResizer {
    sizes: Mutex<Vec<WindowSize>>,
}

impl RecordingResizer {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All sizes applied, in order.
    #[must_use]
    pub fn sizes(&self) -> Vec<WindowSize> {
        self.sizes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recent size.
    #[must_use]
    pub fn last(&self) -> Option<WindowSize> {
        self.sizes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .copied()
    }
}

impl WindowResizer for RecordingResizer {
    fn set_window_size(&self, size: WindowSize) -> sshhelper_pty::Result<()> {
        self.sizes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(size);
        Ok(())
    }
}
