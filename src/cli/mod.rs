//! Command-line interface parsing and handling
//!
//! This module parses arguments, resolves settings and dispatches to the
//! chat loop or one of the one-shot commands.

pub mod chat;
pub mod health;
pub mod say;
pub mod settings;

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::cli::chat::run_chat;
use crate::cli::health::run_health;
use crate::cli::say::run_say;
use crate::cli::settings::{run_set, run_unset, SettingRegistry};
use crate::core::config::data::path_display;
use crate::core::config::{ClientSettings, ConfigStore, SettingsOverrides};
use crate::logging::init_tracing;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "varys", version)]
#[command(about = "Terminal chat client for a Varys assistant service")]
#[command(
    long_about = "Varys streams replies from a Varys assistant service into your terminal. \
Replies appear as they are generated and can be stopped at any time.\n\n\
Environment Variables:\n\
  VARYS_BASE_URL           Service base URL (default http://localhost:8000)\n\
  VARYS_IDLE_TIMEOUT_SECS  Seconds without reply bytes before giving up (0 disables)\n\
  RUST_LOG                 Diagnostic log filter (default warn)\n\n\
Chat commands:\n\
  /new              Start a new chat\n\
  /copy             Copy the last complete reply to the clipboard\n\
  /help             Show chat help\n\
  /quit             Leave varys\n\
  Ctrl+C            Stop a reply in progress, or quit while idle"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Service base URL, overriding VARYS_BASE_URL and the config file
    #[arg(short = 'u', long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Seconds to wait for reply bytes before giving up (0 disables)
    #[arg(long, global = true, value_name = "SECS")]
    pub idle_timeout: Option<u64>,

    /// Write diagnostic logs to this file instead of stderr
    #[arg(short = 'l', long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log debug events from varys itself
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the interactive chat (default)
    Chat,
    /// Send a single prompt and stream the reply to stdout
    Say {
        /// Prompt text (multiple words are joined with spaces)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Check that the service is reachable and healthy
    Health,
    /// Set configuration values, or list them when no key is given
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set for the key
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
    /// Show the config file location and current values
    Config,
}

impl Args {
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            base_url: self.base_url.clone(),
            idle_timeout_secs: self.idle_timeout,
        }
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.log_file.as_deref(), args.verbose)?;
    tokio::runtime::Runtime::new()?.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let overrides = args.overrides();
    let store = ConfigStore::discover()?;
    let registry = SettingRegistry::new();

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Set { key, value } => {
            report(run_set(&registry, &store, key.as_deref(), &value));
            Ok(())
        }
        Commands::Unset { key } => {
            report(run_unset(&registry, &store, &key));
            Ok(())
        }
        Commands::Config => {
            let config = store.load()?;
            println!("Config file: {}", path_display(store.path()));
            println!("{}", registry.describe(&config));
            Ok(())
        }
        command => {
            let config = store.load()?;
            let settings = ClientSettings::resolve(&config, &overrides)?;
            let client = reqwest::Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .build()?;
            match command {
                Commands::Say { prompt } => run_say(client, settings, prompt).await,
                Commands::Health => run_health(client, settings).await,
                _ => run_chat(client, settings).await,
            }
        }
    }
}

fn report(result: Result<String, settings::SettingError>) {
    match result {
        Ok(message) => println!("{message}"),
        Err(err) => {
            err.print();
            std::process::exit(1);
        }
    }
}
