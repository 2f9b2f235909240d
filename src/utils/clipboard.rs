use std::fmt;
use std::io::Write;
use std::process::{Command, Stdio};

use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    /// None of the platform clipboard commands could be started.
    Unavailable,
    Failed { command: &'static str },
}

impl fmt::Display for ClipboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipboardError::Unavailable => {
                write!(f, "No clipboard command found (install wl-copy, xclip, or xsel)")
            }
            ClipboardError::Failed { command } => {
                write!(f, "Clipboard command `{command}` failed")
            }
        }
    }
}

impl std::error::Error for ClipboardError {}

#[cfg(target_os = "macos")]
const CANDIDATES: &[(&str, &[&str])] = &[("pbcopy", &[])];

#[cfg(target_os = "windows")]
const CANDIDATES: &[(&str, &[&str])] = &[("cmd", &["/C", "clip"])];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const CANDIDATES: &[(&str, &[&str])] = &[
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
];

/// Copy `text` to the system clipboard using the first command that works.
pub fn copy_to_clipboard(text: &str) -> Result<(), ClipboardError> {
    let mut last_failure = ClipboardError::Unavailable;
    for (command, args) in CANDIDATES {
        match run_with_stdin(command, args, text) {
            Ok(()) => return Ok(()),
            Err(err) => {
                debug!(command, error = %err, "clipboard command did not succeed");
                if matches!(err, ClipboardError::Failed { .. }) {
                    last_failure = err;
                }
            }
        }
    }
    Err(last_failure)
}

fn run_with_stdin(
    command: &'static str,
    args: &[&str],
    input: &str,
) -> Result<(), ClipboardError> {
    let mut child = Command::new(command)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|_| ClipboardError::Unavailable)?;

    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(input.as_bytes());
    }
    match child.wait() {
        Ok(status) if status.success() => Ok(()),
        _ => Err(ClipboardError::Failed { command }),
    }
}
