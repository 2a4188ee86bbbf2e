//! Reachability probe run before connecting.

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use crate::config::{DEFAULT_PROBE_TIMEOUT, Settings};

/// Decides whether a host can be reached directly.
pub trait Prober: Send + Sync {
    /// Whether `address` answers.
    fn is_reachable(&self, address: &str) -> impl Future<Output = bool> + Send;
}

/// Sends one ICMP echo with the system `ping`.
#[derive(Debug, Clone, Copy)]
pub struct PingProbe {
    timeout: Duration,
    enabled: bool,
}

impl PingProbe {
    /// Probe with the given reply deadline.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            enabled: true,
        }
    }

    /// A probe that reports every host as reachable.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            timeout: DEFAULT_PROBE_TIMEOUT,
            enabled: false,
        }
    }

    /// Build from the `probe` and `probe_timeout` settings.
    #[must_use]
    pub const fn from_settings(settings: &Settings) -> Self {
        if settings.probe {
            Self::new(settings.probe_timeout)
        } else {
            Self::disabled()
        }
    }

    /// `ping` takes whole seconds; round up and never pass zero.
    fn wait_secs(&self) -> u64 {
        let secs = self.timeout.as_secs() + u64::from(self.timeout.subsec_nanos() > 0);
        secs.max(1)
    }
}

impl Default for PingProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

impl Prober for PingProbe {
    async fn is_reachable(&self, address: &str) -> bool {
        if !self.enabled {
            return true;
        }

        let status = tokio::process::Command::new("ping")
            .args(["-c", "1", "-W", &self.wait_secs().to_string(), address])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) => {
                tracing::debug!(address, %status, "ping finished");
                status.success()
            }
            Err(e) => {
                tracing::warn!(address, error = %e, "could not run ping");
                false
            }
        }
    }
}
