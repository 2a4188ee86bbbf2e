//! Environment-based configuration overrides.

use std::collections::HashMap;
use std::time::Duration;

/// Environment configuration prefix.
pub const DEFAULT_PREFIX: &str = "SSHHELPER";

/// Environment variable reader.
///
/// Reads the process environment by default. Tests build one from a fixed
/// map with [`EnvConfig::from_vars`] instead of mutating the real
/// environment.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    prefix: String,
    vars: Option<HashMap<String, String>>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl EnvConfig {
    /// Create a reader over the process environment.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            vars: None,
        }
    }

    /// Create a reader over a fixed set of variables.
    #[must_use]
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            vars: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    fn var_name(&self, name: &str) -> String {
        format!("{}_{}", self.prefix, name.to_uppercase())
    }

    /// Get a string value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let var_name = self.var_name(name);
        match &self.vars {
            Some(vars) => vars.get(&var_name).cloned(),
            None => std::env::var(&var_name).ok(),
        }
        .filter(|v| !v.is_empty())
    }

    /// Get a parsed value.
    #[must_use]
    pub fn parse<T: std::str::FromStr>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|v| v.trim().parse().ok())
    }

    /// Get a boolean value.
    #[must_use]
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).map(|v| {
            matches!(
                v.to_lowercase().as_str(),
                "1" | "true" | "yes" | "on" | "enabled"
            )
        })
    }

    /// Get a positive duration in seconds. Zero counts as unset.
    #[must_use]
    pub fn duration_secs(&self, name: &str) -> Option<Duration> {
        self.parse::<u64>(name)
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_lookup() {
        let env = EnvConfig::from_vars([("SSHHELPER_SSH", "/opt/bin/ssh")]);
        assert_eq!(env.get("ssh").as_deref(), Some("/opt/bin/ssh"));
        assert_eq!(env.get("timeout"), None);
    }

    #[test]
    fn typed_values() {
        let env = EnvConfig::from_vars([
            ("SSHHELPER_TIMEOUT", "12"),
            ("SSHHELPER_NO_PROBE", "yes"),
            ("SSHHELPER_BAD", "twelve"),
        ]);
        assert_eq!(env.duration_secs("timeout"), Some(Duration::from_secs(12)));
        assert_eq!(env.bool("no_probe"), Some(true));
        assert_eq!(env.parse::<u64>("bad"), None);
    }

    #[test]
    fn zero_duration_is_unset() {
        let env = EnvConfig::from_vars([("SSHHELPER_TIMEOUT", "0")]);
        assert_eq!(env.duration_secs("timeout"), None);
    }

    #[test]
    fn empty_value_is_unset() {
        let env = EnvConfig::from_vars([("SSHHELPER_SSH", "")]);
        assert_eq!(env.get("ssh"), None);
    }
}
