//! Integration tests for configuration loading.

use std::path::PathBuf;
use std::time::Duration;

use sshhelper::{Command, Config, EnvConfig};

struct TempConfig(PathBuf);

impl TempConfig {
    fn new(name: &str, content: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "sshhelper-{}-{name}.toml",
            std::process::id()
        ));
        std::fs::write(&path, content).unwrap();
        Self(path)
    }
}

impl Drop for TempConfig {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

const SAMPLE: &str = r#"
[settings]
login_timeout = 10

[jump_host]
address = "10.0.0.1"
username = "hop"
password = "hoppw"

[hosts."192.168.1.1"]
username = "jim"
password = "pw123"
summary = "db box"
commands = ["su", ["Password: ", "test123"]]

[hosts."192.168.11.3"]
username = "root"
port = 2222
ssh_args = "-A"
"#;

#[test]
fn load_sample_file() {
    let file = TempConfig::new("sample", SAMPLE);
    let config = Config::load(&file.0).unwrap();

    assert_eq!(config.hosts.len(), 2);
    assert_eq!(config.settings.login_timeout, Duration::from_secs(10));
    assert_eq!(config.jump_host.as_ref().unwrap().username, "hop");

    let db = config.hosts.resolve("1.1").unwrap();
    assert_eq!(db.endpoint.address, "192.168.1.1");
    assert_eq!(db.commands.len(), 2);
    assert!(matches!(&db.commands[0], Command::Plain(t) if t == "su"));

    let box3 = config.hosts.resolve("11.3").unwrap();
    assert_eq!(box3.endpoint.port, 2222);
    assert_eq!(box3.endpoint.ssh_args, "-A");
}

#[test]
fn malformed_file_is_args_error() {
    let file = TempConfig::new("malformed", "[hosts.\"h\"]\npassword = \"no user\"\n");
    let err = Config::load(&file.0).unwrap_err();
    assert_eq!(err.exit_code().as_i32(), 99);
    assert!(err.to_string().contains("username"));
}

#[test]
fn env_overrides_file_settings() {
    let file = TempConfig::new("env", SAMPLE);
    let mut config = Config::load(&file.0).unwrap();
    config.apply_env(&EnvConfig::from_vars([("SSHHELPER_TIMEOUT", "3")]));

    assert_eq!(config.settings.login_timeout, Duration::from_secs(3));
    assert_eq!(config.settings.command_timeout, Duration::from_secs(3));
}

#[test]
fn usage_lists_hosts_and_summaries() {
    let config = Config::from_toml_str(SAMPLE).unwrap();
    let usage = config.hosts.usage();

    assert!(usage.contains("192.168.1.1"));
    assert!(usage.contains("db box"));
    assert!(usage.contains("192.168.11.3"));
}
