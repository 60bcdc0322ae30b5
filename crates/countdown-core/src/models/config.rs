//! Application configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub version: String,
    pub api: ApiConfig,
    pub push: PushConfig,
    pub poll: PollConfig,
    pub log_level: String,
}

/// REST control API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Socket.IO push channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushConfig {
    pub enabled: bool,
    pub url: String,
    pub path: String,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollConfig {
    /// Poll period of the selected-timer display
    pub selected_interval_ms: u64,
}

const VALID_LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.api.validate()?;
        self.push.validate()?;
        self.poll.validate()?;

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(Error::Validation(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            api: ApiConfig::default(),
            push: PushConfig::default(),
            poll: PollConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::Validation(format!(
                "API base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }

        if self.timeout_secs == 0 {
            return Err(Error::Validation(
                "API timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_secs: 10,
        }
    }
}

impl PushConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(Error::Validation(format!(
                "Push URL must start with ws:// or wss://, got '{}'",
                self.url
            )));
        }

        if !self.path.starts_with('/') {
            return Err(Error::Validation(format!(
                "Push path must start with '/', got '{}'",
                self.path
            )));
        }

        if self.connect_timeout_secs == 0 {
            return Err(Error::Validation(
                "Push connect timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "ws://localhost:5000".to_string(),
            path: "/socket.io".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

impl PollConfig {
    const MIN_INTERVAL_MS: u64 = 250;
    const MAX_INTERVAL_MS: u64 = 60_000;

    pub fn validate(&self) -> Result<()> {
        if !(Self::MIN_INTERVAL_MS..=Self::MAX_INTERVAL_MS).contains(&self.selected_interval_ms) {
            return Err(Error::Validation(format!(
                "Poll interval must be between {} and {} ms",
                Self::MIN_INTERVAL_MS,
                Self::MAX_INTERVAL_MS
            )));
        }
        Ok(())
    }

    pub fn selected_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.selected_interval_ms)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            selected_interval_ms: 2000,
        }
    }
}

/// Command-line overrides layered on top of the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub push_url: Option<String>,
    pub disable_push: bool,
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    /// Apply and re-validate.
    pub fn apply(self, mut config: Config) -> Result<Config> {
        if let Some(api_url) = self.api_url {
            config.api.base_url = api_url;
        }
        if let Some(push_url) = self.push_url {
            config.push.url = push_url;
        }
        if self.disable_push {
            config.push.enabled = false;
        }
        if let Some(log_level) = self.log_level {
            config.log_level = log_level;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll.selected_interval().as_secs(), 2);
    }

    #[test]
    fn test_invalid_log_level() {
        let config = Config {
            log_level: "loud".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_api_url() {
        let mut config = Config::default();
        config.api.base_url = "localhost:5000".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_push_checks_skipped_when_disabled() {
        let mut config = Config::default();
        config.push.url = "http://wrong".to_string();
        assert!(config.validate().is_err());

        config.push.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_poll_interval_bounds() {
        let mut config = Config::default();
        config.poll.selected_interval_ms = 100;
        assert!(config.validate().is_err());

        config.poll.selected_interval_ms = 60_001;
        assert!(config.validate().is_err());

        config.poll.selected_interval_ms = 500;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let overrides = ConfigOverrides {
            api_url: Some("https://timers.example.com".to_string()),
            disable_push: true,
            ..ConfigOverrides::default()
        };
        let config = overrides.apply(Config::default()).unwrap();
        assert_eq!(config.api.base_url, "https://timers.example.com");
        assert!(!config.push.enabled);
        assert_eq!(config.log_level, "info");

        let overrides = ConfigOverrides {
            log_level: Some("chatty".to_string()),
            ..ConfigOverrides::default()
        };
        assert!(matches!(
            overrides.apply(Config::default()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_serialization_round_trip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }
}
