use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::countdown::{ClosingPolicy, DEFAULT_CLOSING_SOON_SECS};

/// Default config file path.
pub const CONFIG_PATH: &str = "relay.toml";

/// Env var overriding `relay.upstream_base`.
pub const ENV_UPSTREAM_BASE: &str = "RELAY_UPSTREAM_BASE";

/// Env var overriding `relay.bind`.
pub const ENV_BIND: &str = "RELAY_BIND";

/// Top-level application config deserialized from `relay.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub countdown: CountdownConfig,
    #[serde(default)]
    pub poll: PollConfig,
}

/// Relay server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Address the relay listens on.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Base URL every logical path is appended to.
    #[serde(default = "default_upstream_base")]
    pub upstream_base: String,
    /// Deadline for ordinary relayed requests, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Hard deadline for soft existence checks, in milliseconds.
    #[serde(default = "default_soft_check_timeout")]
    pub soft_check_timeout_ms: u64,
    /// Only paths with this prefix may use soft-check mode.
    #[serde(default = "default_soft_check_prefix")]
    pub soft_check_prefix: String,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_upstream_base() -> String {
    "https://api.0xnull.io".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_soft_check_timeout() -> u64 {
    4500
}

fn default_soft_check_prefix() -> String {
    "/api/predictions/pool/".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            upstream_base: default_upstream_base(),
            request_timeout_secs: default_request_timeout(),
            soft_check_timeout_ms: default_soft_check_timeout(),
            soft_check_prefix: default_soft_check_prefix(),
        }
    }
}

impl RelayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn soft_check_timeout(&self) -> Duration {
        Duration::from_millis(self.soft_check_timeout_ms)
    }
}

/// Countdown classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountdownConfig {
    /// Remaining seconds below which a market is flagged closing soon.
    #[serde(default = "default_closing_soon")]
    pub closing_soon_secs: i64,
}

fn default_closing_soon() -> i64 {
    DEFAULT_CLOSING_SOON_SECS
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            closing_soon_secs: default_closing_soon(),
        }
    }
}

impl CountdownConfig {
    pub fn policy(&self) -> ClosingPolicy {
        ClosingPolicy {
            closing_soon_secs: self.closing_soon_secs,
        }
    }
}

/// Poll loop periods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Countdown re-evaluation period in seconds.
    #[serde(default = "default_tick")]
    pub tick_secs: u64,
    /// Market data refresh period in seconds.
    #[serde(default = "default_refresh")]
    pub refresh_secs: u64,
}

fn default_tick() -> u64 {
    1
}

fn default_refresh() -> u64 {
    30
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick(),
            refresh_secs: default_refresh(),
        }
    }
}

impl AppConfig {
    /// Load config from the given TOML file path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Load config from `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the runtime cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.poll.tick_secs == 0 {
            bail!("poll.tick_secs must be greater than zero");
        }
        if self.poll.refresh_secs == 0 {
            bail!("poll.refresh_secs must be greater than zero");
        }
        Ok(())
    }

    /// Apply `RELAY_UPSTREAM_BASE` / `RELAY_BIND` from the environment.
    pub fn apply_env(&mut self) {
        if let Ok(base) = std::env::var(ENV_UPSTREAM_BASE) {
            if !base.trim().is_empty() {
                self.relay.upstream_base = base.trim().to_string();
            }
        }
        if let Ok(bind) = std::env::var(ENV_BIND) {
            if !bind.trim().is_empty() {
                self.relay.bind = bind.trim().to_string();
            }
        }
    }

    /// Write config to the given TOML file path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.relay.upstream_base, "https://api.0xnull.io");
        assert_eq!(config.relay.soft_check_timeout(), Duration::from_millis(4500));
        assert_eq!(config.relay.soft_check_prefix, "/api/predictions/pool/");
        assert_eq!(config.countdown.closing_soon_secs, 7200);
        assert_eq!(config.poll.tick_secs, 1);
        assert_eq!(config.poll.refresh_secs, 30);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AppConfig::parse(
            r#"
            [relay]
            upstream_base = "http://localhost:9000"
            soft_check_timeout_ms = 250

            [countdown]
            closing_soon_secs = 300
            "#,
        )
        .unwrap();
        assert_eq!(config.relay.upstream_base, "http://localhost:9000");
        assert_eq!(config.relay.soft_check_timeout_ms, 250);
        assert_eq!(config.relay.request_timeout_secs, 30);
        assert_eq!(config.countdown.policy().closing_soon_secs, 300);
        assert_eq!(config.poll.refresh_secs, 30);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(AppConfig::parse("[relay\nbind = ").is_err());
    }

    #[test]
    fn zero_poll_periods_are_rejected() {
        let err = AppConfig::parse("[poll]\ntick_secs = 0").unwrap_err();
        assert!(err.to_string().contains("poll.tick_secs"), "{err}");

        let err = AppConfig::parse("[poll]\nrefresh_secs = 0").unwrap_err();
        assert!(err.to_string().contains("poll.refresh_secs"), "{err}");
    }

    #[test]
    fn zero_period_file_fails_to_load() {
        let path =
            std::env::temp_dir().join(format!("market-relay-zero-{}.toml", std::process::id()));
        std::fs::write(&path, "[poll]\ntick_secs = 0\n").unwrap();
        let result = AppConfig::load_or_default(&path);
        std::fs::remove_file(&path).ok();
        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("poll.tick_secs"), "{err:#}");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config =
            AppConfig::load_or_default(Path::new("/nonexistent/market-relay/relay.toml")).unwrap();
        assert_eq!(config.relay.bind, "0.0.0.0:8080");
    }

    #[test]
    fn save_then_load() {
        let path = std::env::temp_dir().join(format!("market-relay-{}.toml", std::process::id()));
        let mut config = AppConfig::default();
        config.relay.upstream_base = "http://127.0.0.1:1234".to_string();
        config.save(&path).unwrap();
        let loaded = AppConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.relay.upstream_base, "http://127.0.0.1:1234");
    }
}
