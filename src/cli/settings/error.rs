//! Error types for settings operations.

use std::fmt;

use crate::core::config::ConfigError;

/// Errors that can occur when modifying configuration settings.
#[derive(Debug)]
pub enum SettingError {
    /// The provided setting key is not recognized.
    UnknownKey(String),
    /// The value could not be parsed or validated for `key`.
    InvalidValue {
        key: &'static str,
        input: String,
        reason: String,
    },
    /// Required arguments are missing.
    MissingArgs {
        hint: &'static str,
        example: &'static str,
    },
    /// An error occurred while loading or persisting the configuration.
    Config(ConfigError),
}

impl SettingError {
    /// Print the error message to stderr with appropriate formatting.
    pub fn print(&self) {
        match self {
            SettingError::UnknownKey(key) => {
                eprintln!("❌ Unknown config key: {key}");
                eprintln!("   Run 'varys set' to list available keys.");
            }
            SettingError::InvalidValue { key, input, reason } => {
                eprintln!("❌ Invalid value for {key}: {input}");
                eprintln!("   {reason}");
            }
            SettingError::MissingArgs { hint, example } => {
                eprintln!("⚠️  {hint}");
                eprintln!("Example: {example}");
            }
            SettingError::Config(err) => {
                eprintln!("❌ {err}");
            }
        }
    }
}

impl fmt::Display for SettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingError::UnknownKey(key) => write!(f, "Unknown config key: {key}"),
            SettingError::InvalidValue { key, input, reason } => {
                write!(f, "Invalid value for {key}: {input} ({reason})")
            }
            SettingError::MissingArgs { hint, .. } => write!(f, "{hint}"),
            SettingError::Config(err) => write!(f, "Config error: {err}"),
        }
    }
}

impl std::error::Error for SettingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingError::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for SettingError {
    fn from(err: ConfigError) -> Self {
        SettingError::Config(err)
    }
}
