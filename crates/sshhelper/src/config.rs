//! Configuration: settings, the jump host, and the table of known hosts.
//!
//! The configuration is loaded once at startup from a TOML file (see
//! [`Config::load`]) and passed by reference to every component that needs
//! it.
//!
//! ```toml
//! [settings]
//! login_timeout = 30
//!
//! [jump_host]
//! address = "10.0.0.1"
//! username = "jim"
//! password = "pw"
//!
//! [hosts."192.168.1.1"]
//! username = "jim"
//! password = "pw123"
//! summary = "db box"
//! commands = ["su", ["Password: ", "test123"]]
//! ```

mod env;
mod file;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use env::{DEFAULT_PREFIX, EnvConfig};

use crate::error::{Error, Result};
use crate::expect::Pattern;

/// Default ssh client binary.
pub const DEFAULT_SSH_BINARY: &str = "/usr/bin/ssh";

/// Default timeout for every expect call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default `ping -W` deadline.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// File name looked up in the platform config directory.
const CONFIG_FILE: &str = "hosts.toml";

/// Where and how to reach one ssh server.
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Host name or IP address passed to ssh.
    pub address: String,
    /// Login name (`ssh -l`).
    pub username: String,
    /// Password typed at the password prompt.
    pub password: String,
    /// TCP port (`ssh -p`).
    pub port: u16,
    /// Extra arguments placed before `-l`.
    pub ssh_args: String,
}

impl Endpoint {
    /// Create an endpoint on port 22 with no password or extra arguments.
    pub fn new(address: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            username: username.into(),
            password: String::new(),
            port: 22,
            ssh_args: String::new(),
        }
    }

    /// Set the password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the extra ssh arguments.
    #[must_use]
    pub fn with_ssh_args(mut self, ssh_args: impl Into<String>) -> Self {
        self.ssh_args = ssh_args.into();
        self
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("ssh_args", &self.ssh_args)
            .finish()
    }
}

/// The optional jump host used when a target is not directly reachable.
pub type JumpHostConfig = Endpoint;

/// One post-login command.
#[derive(Debug, Clone)]
pub enum Command {
    /// Wait for the shell prompt, then send the text.
    Plain(String),
    /// Wait for the pattern (or the shell prompt), then send the text.
    ExpectThenSend(Pattern, String),
}

impl Command {
    /// The text this command sends.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Plain(text) | Self::ExpectThenSend(_, text) => text,
        }
    }
}

/// A configured host.
#[derive(Debug, Clone)]
pub struct HostProfile {
    /// Connection details.
    pub endpoint: Endpoint,
    /// One-line description shown in the host list.
    pub summary: String,
    /// Commands run in order after login.
    pub commands: Vec<Command>,
}

impl HostProfile {
    /// Create a profile with no summary and no commands.
    #[must_use]
    pub const fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            summary: String::new(),
            commands: Vec::new(),
        }
    }

    /// Set the post-login commands.
    #[must_use]
    pub fn with_commands(mut self, commands: Vec<Command>) -> Self {
        self.commands = commands;
        self
    }
}

/// Global settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Path of the ssh client.
    pub ssh_binary: String,
    /// Deadline for every login-phase expect.
    pub login_timeout: Duration,
    /// Deadline for every command expect.
    pub command_timeout: Duration,
    /// Whether to ping hosts before connecting.
    pub probe: bool,
    /// Deadline passed to the ping probe.
    pub probe_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ssh_binary: DEFAULT_SSH_BINARY.to_string(),
            login_timeout: DEFAULT_TIMEOUT,
            command_timeout: DEFAULT_TIMEOUT,
            probe: true,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

/// Known hosts, keyed by address.
#[derive(Debug, Clone, Default)]
pub struct HostTable {
    hosts: BTreeMap<String, HostProfile>,
}

impl HostTable {
    /// Create a table from profiles keyed by address.
    #[must_use]
    pub const fn new(hosts: BTreeMap<String, HostProfile>) -> Self {
        Self { hosts }
    }

    /// Add a profile under its endpoint address.
    pub fn insert(&mut self, profile: HostProfile) {
        self.hosts.insert(profile.endpoint.address.clone(), profile);
    }

    /// Look up a host by exact address.
    #[must_use]
    pub fn get(&self, address: &str) -> Option<&HostProfile> {
        self.hosts.get(address)
    }

    /// Number of configured hosts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Whether no host is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Resolve a command-line selector to a single host.
    ///
    /// An exact address wins. Otherwise the selector must be a substring of
    /// exactly one address, so `11.3` picks `192.168.11.3`.
    pub fn resolve(&self, selector: &str) -> Result<&HostProfile> {
        if let Some(profile) = self.hosts.get(selector) {
            return Ok(profile);
        }

        let mut candidates = self
            .hosts
            .iter()
            .filter(|(address, _)| address.contains(selector))
            .map(|(_, profile)| profile);

        match (candidates.next(), candidates.next()) {
            (Some(profile), None) => Ok(profile),
            (None, _) => Err(Error::ConfigMissing {
                selector: selector.to_string(),
            }),
            (Some(_), Some(_)) => Err(Error::AmbiguousSelector {
                selector: selector.to_string(),
                candidates: self
                    .hosts
                    .keys()
                    .filter(|address| address.contains(selector))
                    .cloned()
                    .collect(),
            }),
        }
    }

    /// The host list printed with usage errors, sorted by address.
    #[must_use]
    pub fn usage(&self) -> String {
        let mut out = String::from("available hosts:\n");
        if self.hosts.is_empty() {
            out.push_str("\n    (none configured)\n");
            return out;
        }

        let width = self.hosts.keys().map(String::len).max().unwrap_or(0);
        out.push('\n');
        for (address, profile) in &self.hosts {
            if profile.summary.is_empty() {
                out.push_str(&format!("    {address}\n"));
            } else {
                out.push_str(&format!("    {address:<width$}  {}\n", profile.summary));
            }
        }
        out
    }
}

/// The loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global settings.
    pub settings: Settings,
    /// The jump host, if any.
    pub jump_host: Option<JumpHostConfig>,
    /// Known hosts.
    pub hosts: HostTable,
}

impl Config {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        file::ConfigFile::parse(content)?.into_config()
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {e}", path.display())))?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;

        tracing::debug!(
            path = %path.display(),
            hosts = config.hosts.len(),
            jump_host = config.jump_host.is_some(),
            "loaded configuration"
        );
        Ok(config)
    }

    /// Apply `SSHHELPER_*` environment overrides.
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(ssh) = env.get("ssh") {
            self.settings.ssh_binary = ssh;
        }
        if let Some(timeout) = env.duration_secs("timeout") {
            self.settings.login_timeout = timeout;
            self.settings.command_timeout = timeout;
        }
        if env.bool("no_probe") == Some(true) {
            self.settings.probe = false;
        }
    }
}

/// Pick the configuration file: the explicit path, then
/// `SSHHELPER_CONFIG`, then `<config dir>/sshhelper/hosts.toml`.
pub fn config_path(explicit: Option<&Path>, env: &EnvConfig) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = env.get("config") {
        return Ok(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|dir| dir.join("sshhelper").join(CONFIG_FILE))
        .ok_or_else(|| Error::config("cannot determine the configuration directory"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(addresses: &[&str]) -> HostTable {
        let mut table = HostTable::default();
        for address in addresses {
            table.insert(HostProfile::new(Endpoint::new(*address, "jim")));
        }
        table
    }

    #[test]
    fn exact_match_wins_over_substrings() {
        let hosts = table(&["10.0.0.1", "10.0.0.11", "10.0.0.12"]);
        let profile = hosts.resolve("10.0.0.1").unwrap();
        assert_eq!(profile.endpoint.address, "10.0.0.1");
    }

    #[test]
    fn unique_substring_resolves() {
        let hosts = table(&["192.168.11.3", "10.0.0.5"]);
        assert_eq!(
            hosts.resolve("11.3").unwrap().endpoint.address,
            "192.168.11.3"
        );
    }

    #[test]
    fn missing_and_ambiguous() {
        let hosts = table(&["10.0.0.11", "10.0.0.12"]);

        let err = hosts.resolve("172.").unwrap_err();
        assert!(matches!(err, Error::ConfigMissing { .. }));

        match hosts.resolve("10.0.0.1").unwrap_err() {
            Error::AmbiguousSelector { candidates, .. } => {
                assert_eq!(candidates, vec!["10.0.0.11", "10.0.0.12"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn usage_lists_sorted_hosts_with_summary() {
        let mut hosts = table(&["b.example", "a.example"]);
        let mut db = HostProfile::new(Endpoint::new("c.example", "jim"));
        db.summary = "db box".into();
        hosts.insert(db);

        let usage = hosts.usage();
        let a = usage.find("a.example").unwrap();
        let b = usage.find("b.example").unwrap();
        assert!(a < b);
        assert!(usage.contains("db box"));
    }

    #[test]
    fn env_overrides() {
        let mut config = Config::default();
        config.apply_env(&EnvConfig::from_vars([
            ("SSHHELPER_SSH", "/opt/ssh"),
            ("SSHHELPER_TIMEOUT", "7"),
            ("SSHHELPER_NO_PROBE", "1"),
        ]));

        assert_eq!(config.settings.ssh_binary, "/opt/ssh");
        assert_eq!(config.settings.login_timeout, Duration::from_secs(7));
        assert_eq!(config.settings.command_timeout, Duration::from_secs(7));
        assert!(!config.settings.probe);
    }

    #[test]
    fn config_path_precedence() {
        let env = EnvConfig::from_vars([("SSHHELPER_CONFIG", "/etc/sshhelper.toml")]);
        assert_eq!(
            config_path(Some(Path::new("/tmp/x.toml")), &env).unwrap(),
            PathBuf::from("/tmp/x.toml")
        );
        assert_eq!(
            config_path(None, &env).unwrap(),
            PathBuf::from("/etc/sshhelper.toml")
        );
    }

    #[test]
    fn password_is_redacted_in_debug() {
        let endpoint = Endpoint::new("h", "u").with_password("hunter2");
        assert!(!format!("{endpoint:?}").contains("hunter2"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load(Path::new("/nonexistent/sshhelper/hosts.toml")).unwrap_err();
        assert_eq!(err.exit_code().as_i32(), 99);
    }
}
