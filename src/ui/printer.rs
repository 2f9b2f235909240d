//! Line-oriented transcript rendering for the terminal.
//!
//! The printer never re-reads the whole transcript. It follows
//! [`SessionEvent`]s and writes only what changed, which keeps streamed
//! replies flowing character by character on a plain terminal.

use std::io::{self, Write};

use crate::core::message::{Speaker, Turn, TurnDisplay};
use crate::core::session::{Phase, SessionEvent};
use crate::core::transcript::{speaker_label, Transcript};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrinterOptions {
    /// Prefix turns with `You:` / `Varys:`.
    pub labels: bool,
    /// Print user turns. Off for the REPL, where the user just typed them.
    pub echo_user: bool,
}

impl PrinterOptions {
    pub fn interactive() -> Self {
        Self {
            labels: true,
            echo_user: false,
        }
    }

    pub fn plain() -> Self {
        Self {
            labels: false,
            echo_user: false,
        }
    }
}

pub struct TranscriptPrinter<W: Write> {
    out: W,
    options: PrinterOptions,
    /// Assistant turn currently being streamed and how many bytes of it are on screen.
    active: Option<(usize, usize)>,
    /// The cursor sits mid-line after a label or partial text.
    line_open: bool,
    /// An assistant label was printed for a reply that has not produced a turn yet.
    label_pending: bool,
}

impl<W: Write> TranscriptPrinter<W> {
    pub fn new(out: W, options: PrinterOptions) -> Self {
        Self {
            out,
            options,
            active: None,
            line_open: false,
            label_pending: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn greeting(&mut self, text: &str) -> io::Result<()> {
        self.end_line(None)?;
        self.write_label(Speaker::Assistant)?;
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }

    pub fn notice(&mut self, text: &str) -> io::Result<()> {
        self.end_line(None)?;
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }

    pub fn apply(&mut self, event: SessionEvent, transcript: &Transcript) -> io::Result<()> {
        match event {
            SessionEvent::PhaseChanged(Phase::Sending) => {
                self.end_line(None)?;
                self.write_label(Speaker::Assistant)?;
                self.label_pending = true;
            }
            SessionEvent::PhaseChanged(Phase::Aborted) => {
                self.label_pending = false;
                self.active = None;
                self.end_line(Some("[stopped]"))?;
            }
            SessionEvent::PhaseChanged(Phase::Completed | Phase::Failed) => {
                self.label_pending = false;
                self.end_line(None)?;
            }
            SessionEvent::PhaseChanged(_) => {}
            SessionEvent::TurnAppended { index } => {
                if let Some(turn) = transcript.get(index) {
                    self.begin_turn(index, turn)?;
                }
            }
            SessionEvent::TurnUpdated { index } => {
                if let (Some((active, _)), Some(turn)) = (self.active, transcript.get(index)) {
                    if active == index {
                        self.write_progress(turn)?;
                    }
                }
            }
            SessionEvent::Cleared => {
                self.end_line(None)?;
                self.active = None;
                self.label_pending = false;
            }
        }
        self.out.flush()
    }

    fn begin_turn(&mut self, index: usize, turn: &Turn) -> io::Result<()> {
        match turn.speaker() {
            Speaker::User => {
                if self.options.echo_user {
                    self.end_line(None)?;
                    self.write_label(Speaker::User)?;
                    writeln!(self.out, "{}", turn.text())?;
                    self.line_open = false;
                }
            }
            Speaker::Assistant => {
                if !self.label_pending {
                    self.end_line(None)?;
                    self.write_label(Speaker::Assistant)?;
                }
                self.label_pending = false;
                self.active = Some((index, 0));
                self.write_progress(turn)?;
            }
        }
        Ok(())
    }

    fn write_progress(&mut self, turn: &Turn) -> io::Result<()> {
        let Some((index, printed)) = self.active else {
            return Ok(());
        };
        let text = turn.text();
        if printed < text.len() {
            self.out.write_all(text[printed..].as_bytes())?;
            self.line_open = true;
            self.active = Some((index, text.len()));
        }
        if turn.is_complete() {
            if turn.display() == TurnDisplay::Blank {
                self.out.write_all(b"(empty reply)")?;
                self.line_open = true;
            }
            if turn.is_interrupted() {
                self.end_line(Some("[interrupted]"))?;
            }
            self.active = None;
        }
        Ok(())
    }

    fn write_label(&mut self, speaker: Speaker) -> io::Result<()> {
        if self.options.labels {
            write!(self.out, "{}: ", speaker_label(speaker))?;
            self.line_open = true;
        }
        Ok(())
    }

    fn end_line(&mut self, suffix: Option<&str>) -> io::Result<()> {
        if !self.line_open {
            return Ok(());
        }
        match suffix {
            Some(suffix) => writeln!(self.out, " {suffix}")?,
            None => writeln!(self.out)?,
        }
        self.line_open = false;
        Ok(())
    }
}
