//! Relay configuration.
//!
//! Loaded from `~/.serial-relay/config.toml` when present; every key has
//! a default. Each key can be overridden by a `SERIAL_RELAY_*` environment
//! variable, and command-line flags override both.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "SERIAL_RELAY_";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: String, value: String },

    #[error("{0}")]
    Invalid(String),
}

/// Relay configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Page hosting the simulation. Required to run the bridge.
    pub simulation_url: Option<String>,
    pub webdriver_url: String,
    /// Chrome remote-debugging address of the browser to attach to.
    pub debugger_address: String,
    /// Console polling period.
    pub sample_rate_ms: u64,
    pub queue_capacity: usize,
    /// How long to wait for the simulation page to come up.
    pub ready_timeout_secs: u64,
    pub telemetry: TelemetryConfig,
    /// Append delivered readings to this JSONL file.
    pub journal: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct TelemetryConfig {
    pub base_url: String,
    /// Device access token. Telemetry is off without one.
    pub token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            simulation_url: None,
            webdriver_url: "http://localhost:9515".into(),
            debugger_address: "localhost:9222".into(),
            sample_rate_ms: 50,
            queue_capacity: 256,
            ready_timeout_secs: 10,
            telemetry: TelemetryConfig::default(),
            journal: None,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://thingsboard.cloud".into(),
            token: None,
        }
    }
}

impl Config {
    /// The config file path: `~/.serial-relay/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".serial-relay").join("config.toml"))
    }

    /// Load from the default path and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override keys from environment variables, looked up through `var`.
    ///
    /// Empty values are ignored.
    pub fn apply_env(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |key: &str| {
            let name = format!("{ENV_PREFIX}{key}");
            var(&name).filter(|v| !v.is_empty()).map(|v| (name, v))
        };

        if let Some((_, v)) = get("SIMULATION_URL") {
            self.simulation_url = Some(v);
        }
        if let Some((_, v)) = get("WEBDRIVER_URL") {
            self.webdriver_url = v;
        }
        if let Some((_, v)) = get("DEBUGGER_ADDRESS") {
            self.debugger_address = v;
        }
        if let Some((name, v)) = get("SAMPLE_RATE_MS") {
            self.sample_rate_ms = parse_number(name, v)?;
        }
        if let Some((name, v)) = get("QUEUE_CAPACITY") {
            self.queue_capacity = parse_number(name, v)?;
        }
        if let Some((name, v)) = get("READY_TIMEOUT_SECS") {
            self.ready_timeout_secs = parse_number(name, v)?;
        }
        if let Some((_, v)) = get("TELEMETRY_URL") {
            self.telemetry.base_url = v;
        }
        if let Some((_, v)) = get("TELEMETRY_TOKEN") {
            self.telemetry.token = Some(v);
        }
        if let Some((_, v)) = get("JOURNAL") {
            self.journal = Some(PathBuf::from(v));
        }
        Ok(())
    }

    /// Check values that would make the bridge misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate_ms == 0 {
            return Err(ConfigError::Invalid("sample-rate-ms must be positive".into()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue-capacity must be positive".into()));
        }
        Ok(())
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_rate_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }
}

fn parse_number<T: std::str::FromStr>(var: String, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::from_file(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.sample_interval(), Duration::from_millis(50));
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
simulation-url = "https://www.tinkercad.com/things/abc/editel"
sample-rate-ms = 20
journal = "/tmp/readings.jsonl"

[telemetry]
token = "device-token"
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(
            config.simulation_url.as_deref(),
            Some("https://www.tinkercad.com/things/abc/editel")
        );
        assert_eq!(config.sample_rate_ms, 20);
        assert_eq!(config.telemetry.token.as_deref(), Some("device-token"));
        assert_eq!(config.telemetry.base_url, "http://thingsboard.cloud");
        assert_eq!(config.webdriver_url, "http://localhost:9515");
        assert_eq!(config.journal, Some(PathBuf::from("/tmp/readings.jsonl")));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "sample-rate = 20\n").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn env_overrides_file() {
        let mut config = Config {
            sample_rate_ms: 20,
            ..Config::default()
        };
        config
            .apply_env(env(&[
                ("SERIAL_RELAY_SAMPLE_RATE_MS", "75"),
                ("SERIAL_RELAY_TELEMETRY_TOKEN", "t"),
                ("SERIAL_RELAY_WEBDRIVER_URL", ""),
            ]))
            .unwrap();

        assert_eq!(config.sample_rate_ms, 75);
        assert_eq!(config.telemetry.token.as_deref(), Some("t"));
        assert_eq!(config.webdriver_url, "http://localhost:9515");
    }

    #[test]
    fn bad_env_number_is_an_error() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("SERIAL_RELAY_QUEUE_CAPACITY", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref var, .. } if var == "SERIAL_RELAY_QUEUE_CAPACITY"));
    }

    #[test]
    fn zero_rate_or_capacity_is_invalid() {
        let config = Config {
            sample_rate_ms: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            queue_capacity: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
        assert!(Config::default().validate().is_ok());
    }
}
