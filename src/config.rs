use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use logwire_client::{ClientConfig, ReconnectConfig};
use logwire_logs::DEFAULT_DISPLAY_CAP;

/// Viewer settings, read from an optional TOML file
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Server base address, `http(s)://host[:port]`
    pub server: String,

    pub reconnect: ReconnectConfig,

    /// How long a request may wait for its response
    pub request_timeout_ms: u64,

    /// Period of the stats refresh
    pub poll_interval_ms: u64,

    /// Records kept in the log table
    pub display_cap: usize,

    /// Lifetime of a notification
    pub notification_ms: u64,

    /// Records requested when (re)loading the table
    pub snapshot_limit: usize,

    /// Where downloaded log files are saved
    pub download_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        let client = ClientConfig::default();
        Self {
            server: client.server,
            reconnect: client.reconnect,
            request_timeout_ms: client.request_timeout_ms,
            poll_interval_ms: 5_000,
            display_cap: DEFAULT_DISPLAY_CAP,
            notification_ms: 3_000,
            snapshot_limit: 100,
            download_dir: PathBuf::from("."),
        }
    }
}

impl Settings {
    /// Load from a file, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.display_cap == 0 {
            anyhow::bail!("display_cap must be at least 1");
        }
        if self.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be greater than 0");
        }
        if self.request_timeout_ms == 0 {
            anyhow::bail!("request_timeout_ms must be greater than 0");
        }
        self.reconnect.validate().map_err(anyhow::Error::msg)?;
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            server: self.server.clone(),
            reconnect: self.reconnect.clone(),
            request_timeout_ms: self.request_timeout_ms,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn notification_lifetime(&self) -> Duration {
        Duration::from_millis(self.notification_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::parse("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.server, "http://127.0.0.1:8080");
        assert_eq!(settings.display_cap, 1000);
        assert_eq!(settings.poll_interval(), Duration::from_secs(5));
        assert_eq!(settings.notification_lifetime(), Duration::from_secs(3));
        assert_eq!(settings.reconnect.max_attempts, 5);
        assert_eq!(settings.reconnect.max_delay_ms, 30_000);
    }

    #[test]
    fn test_partial_file() {
        let settings = Settings::parse(
            r#"
            server = "https://logs.example.com"
            snapshot_limit = 250

            [reconnect]
            max_attempts = 10
            "#,
        )
        .unwrap();

        assert_eq!(settings.server, "https://logs.example.com");
        assert_eq!(settings.snapshot_limit, 250);
        assert_eq!(settings.reconnect.max_attempts, 10);
        assert_eq!(settings.reconnect.base_delay_ms, 3000);
        assert_eq!(settings.client_config().server, "https://logs.example.com");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Settings::parse("display_cap = 0").is_err());
        assert!(Settings::parse("colour = \"red\"").is_err());
        assert!(Settings::parse("[reconnect]\nmultiplier = inf\n").is_err());
        assert!(Settings::parse("[reconnect]\nmultiplier = nan\n").is_err());
        assert!(
            Settings::parse("[reconnect]\nbase_delay_ms = 40000\nmax_delay_ms = 1000\n").is_err()
        );
    }

    #[test]
    fn test_missing_file() {
        let err = Settings::load(Some(Path::new("/nonexistent/logwire.toml"))).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read config file"));
    }
}
