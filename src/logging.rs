//! Diagnostic logging setup.
//!
//! Library code only emits `tracing` events; the binary decides where they
//! go. Without `--log-file` they go to stderr at `warn` so they do not mix
//! with streamed replies on stdout. `RUST_LOG` always wins.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "varys=debug,warn"
    } else {
        "warn"
    }
}

pub fn build_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)))
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_tracing(log_file: Option<&Path>, verbose: bool) -> io::Result<()> {
    let filter = build_filter(verbose);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true);
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(file_layer)
                .try_init();
            tracing::debug!(path = %path.display(), "file logging initialized");
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .with_target(false)
                .try_init();
        }
    }
    Ok(())
}
