//! On-disk TOML layout and its conversion into [`Config`](super::Config).

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use super::{Command, Config, Endpoint, HostProfile, HostTable, Settings};
use crate::error::{Error, Result};
use crate::expect::Pattern;

const fn default_port() -> u16 {
    22
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct ConfigFile {
    #[serde(default)]
    settings: SettingsFile,
    jump_host: Option<JumpHostFile>,
    #[serde(default)]
    hosts: BTreeMap<String, HostFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    ssh_binary: Option<String>,
    login_timeout: Option<u64>,
    command_timeout: Option<u64>,
    probe: Option<bool>,
    probe_timeout: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JumpHostFile {
    address: String,
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    ssh_args: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HostFile {
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    ssh_args: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    commands: Vec<CommandFile>,
}

/// A command is either `"text"` or `["expect", "send"]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommandFile {
    Plain(String),
    Pair([String; 2]),
}

impl ConfigFile {
    pub(super) fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(e.to_string()))
    }

    pub(super) fn into_config(self) -> Result<Config> {
        let settings = self.settings.into_settings()?;

        let jump_host = self
            .jump_host
            .map(|j| {
                validate_endpoint(&j.address, j.port, &j.ssh_args)?;
                Ok::<_, Error>(Endpoint {
                    address: j.address,
                    username: j.username,
                    password: j.password,
                    port: j.port,
                    ssh_args: j.ssh_args,
                })
            })
            .transpose()?;

        let mut hosts = BTreeMap::new();
        for (address, host) in self.hosts {
            validate_endpoint(&address, host.port, &host.ssh_args)?;
            let commands = host
                .commands
                .into_iter()
                .map(|c| c.into_command(&address))
                .collect::<Result<Vec<_>>>()?;

            let profile = HostProfile {
                endpoint: Endpoint {
                    address: address.clone(),
                    username: host.username,
                    password: host.password,
                    port: host.port,
                    ssh_args: host.ssh_args,
                },
                summary: host.summary,
                commands,
            };
            hosts.insert(address, profile);
        }

        Ok(Config {
            settings,
            jump_host,
            hosts: HostTable::new(hosts),
        })
    }
}

impl SettingsFile {
    fn into_settings(self) -> Result<Settings> {
        let defaults = Settings::default();
        Ok(Settings {
            ssh_binary: self.ssh_binary.unwrap_or(defaults.ssh_binary),
            login_timeout: seconds("login_timeout", self.login_timeout, defaults.login_timeout)?,
            command_timeout: seconds(
                "command_timeout",
                self.command_timeout,
                defaults.command_timeout,
            )?,
            probe: self.probe.unwrap_or(defaults.probe),
            probe_timeout: seconds("probe_timeout", self.probe_timeout, defaults.probe_timeout)?,
        })
    }
}

fn seconds(key: &str, value: Option<u64>, default: Duration) -> Result<Duration> {
    match value {
        None => Ok(default),
        Some(0) => Err(Error::config(format!(
            "settings: {key} must be at least 1 second"
        ))),
        Some(secs) => Ok(Duration::from_secs(secs)),
    }
}

impl CommandFile {
    fn into_command(self, host: &str) -> Result<Command> {
        match self {
            Self::Plain(text) => Ok(Command::Plain(text)),
            Self::Pair([expect, send]) => {
                let pattern = Pattern::from_user(&expect).map_err(|e| {
                    Error::config(format!("host {host}: bad expect pattern {expect:?}: {e}"))
                })?;
                Ok(Command::ExpectThenSend(pattern, send))
            }
        }
    }
}

fn validate_endpoint(host: &str, port: u16, ssh_args: &str) -> Result<()> {
    if port == 0 {
        return Err(Error::config(format!(
            "host {host}: port must be between 1 and 65535"
        )));
    }
    if shlex::split(ssh_args).is_none() {
        return Err(Error::config(format!(
            "host {host}: unbalanced quotes in ssh_args `{ssh_args}`"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_host_gets_defaults() {
        let config = ConfigFile::parse("[hosts.\"10.0.0.5\"]\nusername = \"jim\"\n")
            .unwrap()
            .into_config()
            .unwrap();

        let host = config.hosts.get("10.0.0.5").unwrap();
        assert_eq!(host.endpoint.port, 22);
        assert_eq!(host.endpoint.password, "");
        assert!(host.commands.is_empty());
        assert!(config.jump_host.is_none());
        assert_eq!(config.settings, Settings::default());
    }

    #[test]
    fn command_shapes() {
        let toml = r#"
            [hosts."10.0.0.5"]
            username = "jim"
            commands = ["ls", ["Password: ", "secret"], ["", "whoami"]]
        "#;
        let config = ConfigFile::parse(toml).unwrap().into_config().unwrap();
        let commands = &config.hosts.get("10.0.0.5").unwrap().commands;

        assert!(matches!(&commands[0], Command::Plain(t) if t == "ls"));
        assert!(matches!(
            &commands[1],
            Command::ExpectThenSend(Pattern::Regex(r), t) if r.pattern() == "Password: " && t == "secret"
        ));
        assert!(matches!(&commands[2], Command::ExpectThenSend(Pattern::Any, _)));
    }

    #[test]
    fn three_element_command_is_rejected() {
        let toml = r#"
            [hosts."10.0.0.5"]
            username = "jim"
            commands = [["a", "b", "c"]]
        "#;
        assert!(ConfigFile::parse(toml).is_err());
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let toml = r#"
            [hosts."10.0.0.5"]
            username = "jim"
            commands = [["(oops", "b"]]
        "#;
        let err = ConfigFile::parse(toml).unwrap().into_config().unwrap_err();
        assert!(err.to_string().contains("10.0.0.5"));
    }

    #[test]
    fn port_bounds() {
        let zero = "[hosts.h]\nusername = \"u\"\nport = 0\n";
        assert!(ConfigFile::parse(zero).unwrap().into_config().is_err());

        let too_big = "[hosts.h]\nusername = \"u\"\nport = 70000\n";
        assert!(ConfigFile::parse(too_big).is_err());
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        for key in ["login_timeout", "command_timeout", "probe_timeout"] {
            let toml = format!("[settings]\n{key} = 0\n");
            let err = ConfigFile::parse(&toml).unwrap().into_config().unwrap_err();
            assert!(matches!(err, Error::Config { .. }));
            assert!(err.to_string().contains(key));
        }
    }

    #[test]
    fn quoted_ssh_args_are_accepted() {
        let toml = r#"
            [hosts."10.0.0.5"]
            username = "jim"
            ssh_args = '-o "ProxyCommand=ssh -W %h:%p bastion"'
        "#;
        let config = ConfigFile::parse(toml).unwrap().into_config().unwrap();
        assert_eq!(
            config.hosts.get("10.0.0.5").unwrap().endpoint.ssh_args,
            r#"-o "ProxyCommand=ssh -W %h:%p bastion""#
        );
    }

    #[test]
    fn unbalanced_ssh_args_are_rejected() {
        let host = "[hosts.\"10.0.0.5\"]\nusername = \"jim\"\nssh_args = '-o \"Proxy'\n";
        let err = ConfigFile::parse(host).unwrap().into_config().unwrap_err();
        assert!(err.to_string().contains("10.0.0.5"));
        assert_eq!(err.exit_code().as_i32(), 99);

        let jump = "[jump_host]\naddress = \"10.0.0.1\"\nusername = \"hop\"\nssh_args = \"-o 'x\"\n";
        let err = ConfigFile::parse(jump).unwrap().into_config().unwrap_err();
        assert!(err.to_string().contains("10.0.0.1"));
    }

    #[test]
    fn settings_and_jump_host() {
        let toml = r#"
            [settings]
            ssh_binary = "/opt/ssh"
            login_timeout = 5
            probe = false

            [jump_host]
            address = "10.0.0.1"
            username = "hop"
            password = "hpw"
        "#;
        let config = ConfigFile::parse(toml).unwrap().into_config().unwrap();

        assert_eq!(config.settings.ssh_binary, "/opt/ssh");
        assert_eq!(config.settings.login_timeout, Duration::from_secs(5));
        assert_eq!(config.settings.command_timeout, Duration::from_secs(30));
        assert!(!config.settings.probe);

        let jump = config.jump_host.unwrap();
        assert_eq!(jump.address, "10.0.0.1");
        assert_eq!(jump.port, 22);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(ConfigFile::parse("[settings]\nprobe_timout = 3\n").is_err());
    }
}
