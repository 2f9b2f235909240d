//! Terminal presentation for chat sessions.
//!
//! [`printer`] turns session change events into incremental terminal output.
//! It owns no conversation state; [`crate::core`] does.

pub mod printer;
