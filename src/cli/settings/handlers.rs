//! Handlers for the individual config keys.

use super::{success_set, success_unset, SettingError, SettingHandler};
use crate::core::config::defaults::{
    DEFAULT_BASE_URL, DEFAULT_CHAT_PATH, DEFAULT_IDLE_TIMEOUT_SECS,
};
use crate::core::config::{Config, ConfigStore};
use crate::utils::url::validate_base_url;

fn single_value(
    args: &[String],
    hint: &'static str,
    example: &'static str,
) -> Result<String, SettingError> {
    let value = args.join(" ");
    let value = value.trim();
    if value.is_empty() {
        return Err(SettingError::MissingArgs { hint, example });
    }
    Ok(value.to_string())
}

fn apply<F>(store: &ConfigStore, mutator: F, message: String) -> Result<String, SettingError>
where
    F: FnOnce(&mut Config),
{
    store.mutate(|config| {
        mutator(config);
        Ok::<_, SettingError>(())
    })?;
    Ok(message)
}

/// Handler for the `base-url` setting.
pub struct BaseUrlHandler;

impl SettingHandler for BaseUrlHandler {
    fn key(&self) -> &'static str {
        "base-url"
    }

    fn set(&self, args: &[String], store: &ConfigStore) -> Result<String, SettingError> {
        let input = single_value(
            args,
            "To set the service URL, specify it:",
            "varys set base-url http://localhost:8000",
        )?;
        let url = validate_base_url(&input).map_err(|err| SettingError::InvalidValue {
            key: "base-url",
            input: input.clone(),
            reason: err.to_string(),
        })?;
        let message = success_set("base-url", &url);
        apply(store, move |config| config.base_url = Some(url), message)
    }

    fn unset(&self, store: &ConfigStore) -> Result<String, SettingError> {
        apply(store, |config| config.base_url = None, success_unset("base-url"))
    }

    fn format(&self, config: &Config) -> String {
        match &config.base_url {
            Some(url) => format!("  base-url: {url}"),
            None => format!("  base-url: (unset, default {DEFAULT_BASE_URL})"),
        }
    }
}

/// Handler for the `chat-path` setting.
pub struct ChatPathHandler;

impl SettingHandler for ChatPathHandler {
    fn key(&self) -> &'static str {
        "chat-path"
    }

    fn set(&self, args: &[String], store: &ConfigStore) -> Result<String, SettingError> {
        let input = single_value(
            args,
            "To set the chat endpoint path, specify it:",
            "varys set chat-path v1/chat",
        )?;
        let path = input.trim_matches('/').to_string();
        if path.is_empty() || path.contains(char::is_whitespace) {
            return Err(SettingError::InvalidValue {
                key: "chat-path",
                input,
                reason: "expected a non-empty path without spaces".to_string(),
            });
        }
        let message = success_set("chat-path", &path);
        apply(store, move |config| config.chat_path = Some(path), message)
    }

    fn unset(&self, store: &ConfigStore) -> Result<String, SettingError> {
        apply(store, |config| config.chat_path = None, success_unset("chat-path"))
    }

    fn format(&self, config: &Config) -> String {
        match &config.chat_path {
            Some(path) => format!("  chat-path: {path}"),
            None => format!("  chat-path: (unset, default {DEFAULT_CHAT_PATH})"),
        }
    }
}

/// Handler for the `idle-timeout` setting, in whole seconds.
pub struct IdleTimeoutHandler;

impl SettingHandler for IdleTimeoutHandler {
    fn key(&self) -> &'static str {
        "idle-timeout"
    }

    fn set(&self, args: &[String], store: &ConfigStore) -> Result<String, SettingError> {
        let input = single_value(
            args,
            "To set the idle timeout, specify seconds (0 disables it):",
            "varys set idle-timeout 90",
        )?;
        let secs = match input.to_ascii_lowercase().as_str() {
            "off" => 0,
            other => other
                .trim_end_matches('s')
                .parse::<u64>()
                .map_err(|err| SettingError::InvalidValue {
                    key: "idle-timeout",
                    input: input.clone(),
                    reason: err.to_string(),
                })?,
        };
        let shown = if secs == 0 {
            "off".to_string()
        } else {
            format!("{secs}s")
        };
        let message = success_set("idle-timeout", &shown);
        apply(
            store,
            move |config| config.idle_timeout_secs = Some(secs),
            message,
        )
    }

    fn unset(&self, store: &ConfigStore) -> Result<String, SettingError> {
        apply(
            store,
            |config| config.idle_timeout_secs = None,
            success_unset("idle-timeout"),
        )
    }

    fn format(&self, config: &Config) -> String {
        match config.idle_timeout_secs {
            Some(0) => "  idle-timeout: off".to_string(),
            Some(secs) => format!("  idle-timeout: {secs}s"),
            None => format!("  idle-timeout: (unset, default {DEFAULT_IDLE_TIMEOUT_SECS}s)"),
        }
    }
}
