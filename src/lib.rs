//! Varys is a terminal chat client for a Varys assistant service.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation: the transcript, the session state
//!   machine, incremental UTF-8 decoding and the streaming transport.
//! - [`ui`] renders session change events to the terminal.
//! - [`cli`] parses arguments and runs the chat loop or one-shot commands.
//! - [`api`] defines the JSON payloads exchanged with the service.
//!
//! The binary (`src/main.rs`) routes through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod logging;
pub mod ui;
pub mod utils;
