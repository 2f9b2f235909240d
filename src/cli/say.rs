//! One-shot "say" command: stream a single reply to stdout.

use std::error::Error;
use std::io;

use crate::cli::chat::{drive_reply, flush_events};
use crate::core::config::ClientSettings;
use crate::core::conversation::Conversation;
use crate::core::session::Phase;
use crate::ui::printer::{PrinterOptions, TranscriptPrinter};

pub async fn run_say(
    client: reqwest::Client,
    settings: ClientSettings,
    prompt: Vec<String>,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: varys say <prompt>");
        std::process::exit(1);
    }

    let mut conversation = Conversation::from_settings(client, &settings);
    let mut events = conversation.subscribe();
    let mut printer = TranscriptPrinter::new(io::stdout(), PrinterOptions::plain());

    conversation.submit(&prompt)?;
    flush_events(&mut events, &mut printer, &conversation)?;
    drive_reply(&mut conversation, &mut events, &mut printer).await?;

    match conversation.manager().last_outcome() {
        Some(Phase::Failed) => std::process::exit(1),
        Some(Phase::Aborted) => std::process::exit(130),
        _ => Ok(()),
    }
}
