//! Interactive line-based chat loop.

use std::error::Error;
use std::future::Future;
use std::io::{self, BufRead, BufReader, Write};
use std::thread;

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::debug;

use crate::core::config::ClientSettings;
use crate::core::conversation::Conversation;
use crate::core::greeting::greeting_now;
use crate::core::session::SessionEvent;
use crate::ui::printer::{PrinterOptions, TranscriptPrinter};
use crate::utils::clipboard::copy_to_clipboard;

pub const HELP_TEXT: &str = "\
Commands:
  /new     Start a new chat
  /copy    Copy the last complete reply to the clipboard
  /help    Show this help
  /quit    Leave varys
Press Ctrl+C to stop a reply in progress, or to quit while idle.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand<'a> {
    Message(&'a str),
    New,
    Copy,
    Help,
    Quit,
    Unknown(&'a str),
}

pub fn parse_chat_command(line: &str) -> ChatCommand<'_> {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return ChatCommand::Message(trimmed);
    };
    match command.split_whitespace().next().unwrap_or_default() {
        "new" | "clear" => ChatCommand::New,
        "copy" => ChatCommand::Copy,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Unknown(trimmed),
    }
}

/// Writes pending session events through `printer`.
pub(crate) fn flush_events<W: Write>(
    events: &mut UnboundedReceiver<SessionEvent>,
    printer: &mut TranscriptPrinter<W>,
    conversation: &Conversation,
) -> io::Result<()> {
    while let Ok(event) = events.try_recv() {
        printer.apply(event, conversation.transcript())?;
    }
    Ok(())
}

/// Streams the in-flight reply to `printer` until the session is idle again.
/// Ctrl+C cancels the exchange.
pub(crate) async fn drive_reply<W: Write>(
    conversation: &mut Conversation,
    events: &mut UnboundedReceiver<SessionEvent>,
    printer: &mut TranscriptPrinter<W>,
) -> io::Result<()> {
    drive_reply_until(conversation, events, printer, tokio::signal::ctrl_c).await
}

async fn drive_reply_until<W, F, Fut>(
    conversation: &mut Conversation,
    events: &mut UnboundedReceiver<SessionEvent>,
    printer: &mut TranscriptPrinter<W>,
    mut interrupt: F,
) -> io::Result<()>
where
    W: Write,
    F: FnMut() -> Fut,
    Fut: Future,
{
    while conversation.phase().is_active() {
        tokio::select! {
            _ = conversation.pump() => {}
            _ = interrupt() => {
                debug!("interrupt received during reply");
                conversation.cancel();
            }
        }
        flush_events(events, printer, conversation)?;
    }
    Ok(())
}

/// Reads lines on a dedicated thread and forwards them over a channel.
///
/// The read must stay off the runtime's blocking pool: a pending read there
/// keeps the runtime from shutting down after Ctrl+C.
pub(crate) fn spawn_line_reader<R>(reader: R) -> io::Result<UnboundedReceiver<io::Result<String>>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    thread::Builder::new()
        .name("varys-stdin".into())
        .spawn(move || {
            for line in reader.lines() {
                let failed = line.is_err();
                if tx.send(line).is_err() || failed {
                    break;
                }
            }
        })?;
    Ok(rx)
}

fn prompt() -> io::Result<()> {
    let mut stdout = io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()
}

pub async fn run_chat(
    client: reqwest::Client,
    settings: ClientSettings,
) -> Result<(), Box<dyn Error>> {
    let mut conversation = Conversation::from_settings(client, &settings);
    let mut events = conversation.subscribe();
    let mut printer = TranscriptPrinter::new(io::stdout(), PrinterOptions::interactive());
    let mut lines = spawn_line_reader(BufReader::new(io::stdin()))?;

    debug!(url = %settings.chat_url(), "starting chat");
    printer.greeting(greeting_now())?;
    printer.notice("Type /help for commands.")?;

    loop {
        prompt()?;
        let line = tokio::select! {
            line = lines.recv() => line.transpose()?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let Some(line) = line else {
            println!();
            break;
        };

        match parse_chat_command(&line) {
            ChatCommand::Quit => break,
            ChatCommand::Help => printer.notice(HELP_TEXT)?,
            ChatCommand::New => {
                conversation.new_session();
                flush_events(&mut events, &mut printer, &conversation)?;
                printer.notice("Started a new chat.")?;
                printer.greeting(greeting_now())?;
            }
            ChatCommand::Copy => match conversation.transcript().last_copyable_reply() {
                Some(turn) => match copy_to_clipboard(turn.text()) {
                    Ok(()) => printer.notice("Copied the last reply to the clipboard.")?,
                    Err(err) => printer.notice(&format!("❌ {err}"))?,
                },
                None => printer.notice("There is no complete reply to copy yet.")?,
            },
            ChatCommand::Unknown(command) => {
                printer.notice(&format!("Unknown command: {command}. Type /help for commands."))?
            }
            ChatCommand::Message(text) => match conversation.submit(text) {
                Ok(_) => {
                    flush_events(&mut events, &mut printer, &conversation)?;
                    drive_reply(&mut conversation, &mut events, &mut printer).await?;
                }
                Err(rejected) => debug!(%rejected, "submission ignored"),
            },
        }
    }

    Ok(())
}
