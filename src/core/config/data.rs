use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persisted user configuration. Unset fields fall back to the environment
/// and then to built-in defaults, see [`super::ClientSettings`].
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Service base URL, e.g. `http://localhost:8000`
    pub base_url: Option<String>,
    /// Chat endpoint path relative to the base URL
    pub chat_path: Option<String>,
    /// Seconds without body bytes before a reply is abandoned; 0 disables
    pub idle_timeout_secs: Option<u64>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
///
/// # Examples
/// - Unix: `/home/user/.config/varys/config.toml` → `~/.config/varys/config.toml`
/// - macOS: `/Users/user/Library/Application Support/...` → `~/Library/Application Support/...`
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

impl Config {
    pub fn is_empty(&self) -> bool {
        self == &Config::default()
    }
}
