pub mod data;
pub mod defaults;
pub mod io;

pub use data::Config;
pub use defaults::{ClientSettings, SettingsOverrides};
pub use io::{ConfigError, ConfigStore};
