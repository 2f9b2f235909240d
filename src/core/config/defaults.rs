use std::time::Duration;

use crate::core::config::data::Config;
use crate::core::config::io::ConfigError;
use crate::utils::url::{construct_api_url, normalize_base_url, validate_base_url};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_CHAT_PATH: &str = "chat";
pub const HEALTH_PATH: &str = "health";
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;

pub const ENV_BASE_URL: &str = "VARYS_BASE_URL";
pub const ENV_IDLE_TIMEOUT: &str = "VARYS_IDLE_TIMEOUT_SECS";

/// Values given on the command line; they win over everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsOverrides {
    pub base_url: Option<String>,
    pub idle_timeout_secs: Option<u64>,
}

/// Effective client settings after layering flags, environment, config
/// file and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub base_url: String,
    pub chat_path: String,
    pub idle_timeout: Option<Duration>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            idle_timeout: idle_timeout_from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }
}

impl ClientSettings {
    pub fn resolve(config: &Config, overrides: &SettingsOverrides) -> Result<Self, ConfigError> {
        Self::resolve_with(config, overrides, |key| std::env::var(key).ok())
    }

    /// Like [`ClientSettings::resolve`] with an injectable environment lookup.
    pub fn resolve_with<F>(
        config: &Config,
        overrides: &SettingsOverrides,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = match overrides
            .base_url
            .clone()
            .or_else(|| env(ENV_BASE_URL).filter(|value| !value.trim().is_empty()))
            .or_else(|| config.base_url.clone())
        {
            Some(raw) => {
                validate_base_url(&raw).map_err(|err| ConfigError::InvalidValue {
                    key: "base-url".to_string(),
                    value: raw.clone(),
                    reason: err.to_string(),
                })?
            }
            None => DEFAULT_BASE_URL.to_string(),
        };

        let chat_path = config
            .chat_path
            .as_deref()
            .map(|path| path.trim().trim_matches('/'))
            .filter(|path| !path.is_empty())
            .unwrap_or(DEFAULT_CHAT_PATH)
            .to_string();

        let idle_timeout_secs = match overrides.idle_timeout_secs {
            Some(secs) => secs,
            None => match env(ENV_IDLE_TIMEOUT).filter(|value| !value.trim().is_empty()) {
                Some(raw) => raw.trim().parse::<u64>().map_err(|err| ConfigError::InvalidValue {
                    key: ENV_IDLE_TIMEOUT.to_string(),
                    value: raw.clone(),
                    reason: err.to_string(),
                })?,
                None => config
                    .idle_timeout_secs
                    .unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS),
            },
        };

        Ok(Self {
            base_url,
            chat_path,
            idle_timeout: idle_timeout_from_secs(idle_timeout_secs),
        })
    }

    pub fn chat_url(&self) -> String {
        construct_api_url(&self.base_url, &self.chat_path)
    }

    pub fn health_url(&self) -> String {
        construct_api_url(&normalize_base_url(&self.base_url), HEALTH_PATH)
    }
}

/// Zero disables the idle timeout.
pub fn idle_timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
