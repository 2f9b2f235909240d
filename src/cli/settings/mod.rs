//! Settings management for `varys set` / `varys unset`.
//!
//! Each config key has a [`SettingHandler`]; the [`SettingRegistry`] maps
//! key names to handlers and fixes the order used when listing values.

pub mod error;
pub mod handlers;
pub mod registry;

pub use error::SettingError;
pub use registry::SettingRegistry;

use crate::core::config::{Config, ConfigStore};

/// Trait for handling a configuration setting.
pub trait SettingHandler: Send + Sync {
    /// Returns the configuration key this handler manages.
    fn key(&self) -> &'static str;

    /// Validate `args` and store the value. Returns a success message.
    fn set(&self, args: &[String], store: &ConfigStore) -> Result<String, SettingError>;

    /// Clear the value so the default applies again.
    fn unset(&self, store: &ConfigStore) -> Result<String, SettingError>;

    /// Format the current value for display in `varys set` output.
    fn format(&self, config: &Config) -> String;
}

pub fn success_set(key: &str, value: &str) -> String {
    format!("✅ Set {key} to: {value}")
}

pub fn success_unset(key: &str) -> String {
    format!("✅ Unset {key}")
}

/// `varys set [key] [value...]`. Without a key, lists every setting.
pub fn run_set(
    registry: &SettingRegistry,
    store: &ConfigStore,
    key: Option<&str>,
    value: &[String],
) -> Result<String, SettingError> {
    let Some(key) = key else {
        return Ok(registry.describe(&store.load()?));
    };
    let handler = registry
        .get(key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;
    handler.set(value, store)
}

pub fn run_unset(
    registry: &SettingRegistry,
    store: &ConfigStore,
    key: &str,
) -> Result<String, SettingError> {
    let handler = registry
        .get(key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;
    handler.unset(store)
}
