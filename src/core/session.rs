//! Streaming response session manager.
//!
//! Owns the transcript and the state of the single in-flight exchange. The
//! manager is synchronous: the transport runs elsewhere and its messages are
//! applied here in wire order through [`SessionManager::handle_stream_message`].

use std::fmt;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::api::ChatRequest;
use crate::core::chat_stream::StreamMessage;
use crate::core::decoder::Utf8StreamDecoder;
use crate::core::transcript::Transcript;
use crate::core::transport::TransportError;

/// Reply appended when an exchange fails for any reason other than the user
/// stopping it.
pub const FAILURE_MESSAGE: &str = "Sorry, there was an error processing your request.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    Idle,
    Sending,
    Streaming,
    Completed,
    Aborted,
    Failed,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Sending => "sending",
            Phase::Streaming => "streaming",
            Phase::Completed => "completed",
            Phase::Aborted => "aborted",
            Phase::Failed => "failed",
        }
    }

    /// An exchange is in flight.
    pub fn is_active(self) -> bool {
        matches!(self, Phase::Sending | Phase::Streaming)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Aborted | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a submission was refused. Callers are expected to prevent these by
/// disabling the submit control, so they are never shown in the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejected {
    EmptyInput,
    Busy(Phase),
}

impl fmt::Display for SubmitRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitRejected::EmptyInput => write!(f, "nothing to send"),
            SubmitRejected::Busy(phase) => write!(f, "an exchange is already {phase}"),
        }
    }
}

impl std::error::Error for SubmitRejected {}

/// Change notifications for transcript views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    TurnAppended { index: usize },
    TurnUpdated { index: usize },
    Cleared,
    PhaseChanged(Phase),
}

/// State of the send/stop control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitControl {
    Send { enabled: bool },
    Stop,
}

/// Everything the transport needs to run an accepted submission.
#[derive(Debug, Clone)]
pub struct StreamTicket {
    pub request: ChatRequest,
    pub cancel_token: CancellationToken,
    pub stream_id: u64,
}

#[derive(Debug, Default)]
pub struct SessionManager {
    transcript: Transcript,
    phase: Phase,
    input: String,
    cancel_token: Option<CancellationToken>,
    current_stream_id: u64,
    decoder: Utf8StreamDecoder,
    last_outcome: Option<Phase>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes change events to a new receiver, replacing any previous one.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Terminal phase reached by the most recent exchange.
    pub fn last_outcome(&self) -> Option<Phase> {
        self.last_outcome
    }

    pub fn current_stream_id(&self) -> u64 {
        self.current_stream_id
    }

    pub fn is_current_stream(&self, stream_id: u64) -> bool {
        self.current_stream_id == stream_id
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    pub fn submit_control(&self) -> SubmitControl {
        if self.phase().is_active() {
            SubmitControl::Stop
        } else {
            SubmitControl::Send {
                enabled: !self.input.trim().is_empty(),
            }
        }
    }

    /// Submits the current input buffer.
    pub fn submit_input(&mut self) -> Result<StreamTicket, SubmitRejected> {
        let input = std::mem::take(&mut self.input);
        let result = self.submit(&input);
        if result.is_err() {
            self.input = input;
        }
        result
    }

    pub fn submit(&mut self, input: &str) -> Result<StreamTicket, SubmitRejected> {
        if self.phase().is_active() {
            return Err(SubmitRejected::Busy(self.phase()));
        }
        let text = input.trim();
        if text.is_empty() {
            return Err(SubmitRejected::EmptyInput);
        }

        let index = self.transcript.push_user(text);
        self.input.clear();
        self.publish(SessionEvent::TurnAppended { index });

        self.current_stream_id += 1;
        let cancel_token = CancellationToken::new();
        self.cancel_token = Some(cancel_token.clone());
        self.decoder.reset();
        self.set_phase(Phase::Sending);

        Ok(StreamTicket {
            request: ChatRequest {
                messages: self.transcript.to_api_messages(),
            },
            cancel_token,
            stream_id: self.current_stream_id,
        })
    }

    pub fn handle_stream_message(&mut self, message: StreamMessage, stream_id: u64) {
        if !self.is_current_stream(stream_id) || !self.phase().is_active() {
            trace!(stream_id, "ignoring message for a stream that is no longer live");
            return;
        }

        match message {
            StreamMessage::Chunk(bytes) => self.apply_chunk(&bytes),
            StreamMessage::Error(err) => self.fail_stream(err),
            StreamMessage::End => self.finish_stream(),
        }
    }

    /// Stops the in-flight exchange, keeping whatever text already arrived.
    /// Returns `false` when there was nothing to stop.
    pub fn cancel(&mut self) -> bool {
        if !self.phase().is_active() {
            return false;
        }

        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        if let Some(index) = self.transcript.seal_open_turn() {
            self.publish(SessionEvent::TurnUpdated { index });
        }
        debug!(stream_id = self.current_stream_id, "chat stream stopped by user");
        self.settle(Phase::Aborted);
        true
    }

    /// Starts over with an empty transcript, stopping any exchange first.
    pub fn new_session(&mut self) {
        self.cancel();
        self.transcript.clear();
        self.input.clear();
        self.last_outcome = None;
        self.publish(SessionEvent::Cleared);
    }

    fn apply_chunk(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }

        if self.phase() == Phase::Sending {
            let index = self.transcript.open_assistant_turn();
            self.set_phase(Phase::Streaming);
            self.publish(SessionEvent::TurnAppended { index });
        }

        match self.decoder.decode(bytes) {
            Ok(text) if text.is_empty() => {}
            Ok(text) => {
                if let Some(index) = self.transcript.append_to_open_turn(&text) {
                    self.publish(SessionEvent::TurnUpdated { index });
                }
            }
            Err(err) => self.fail_stream(err.into()),
        }
    }

    fn finish_stream(&mut self) {
        if let Err(err) = self.decoder.finish() {
            self.fail_stream(err.into());
            return;
        }

        match self.transcript.seal_open_turn() {
            Some(index) => self.publish(SessionEvent::TurnUpdated { index }),
            None => {
                // The body ended before any bytes arrived.
                let index = self.transcript.push_assistant("");
                self.publish(SessionEvent::TurnAppended { index });
            }
        }
        self.settle(Phase::Completed);
    }

    fn fail_stream(&mut self, err: TransportError) {
        warn!(stream_id = self.current_stream_id, error = %err, "chat stream failed");

        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        if let Some(index) = self.transcript.interrupt_open_turn() {
            self.publish(SessionEvent::TurnUpdated { index });
        }
        let index = self.transcript.push_assistant(FAILURE_MESSAGE);
        self.publish(SessionEvent::TurnAppended { index });
        self.settle(Phase::Failed);
    }

    fn settle(&mut self, outcome: Phase) {
        debug_assert!(outcome.is_terminal());
        self.cancel_token = None;
        self.decoder.reset();
        self.last_outcome = Some(outcome);
        self.set_phase(outcome);
        self.set_phase(Phase::Idle);
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase == phase {
            return;
        }
        debug!(
            stream_id = self.current_stream_id,
            from = %self.phase,
            to = %phase,
            "session phase changed"
        );
        self.phase = phase;
        self.publish(SessionEvent::PhaseChanged(phase));
    }

    fn publish(&mut self, event: SessionEvent) {
        if let Some(tx) = &self.events {
            if tx.send(event).is_err() {
                self.events = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::{Speaker, TurnDisplay};

    fn chunk(text: &str) -> StreamMessage {
        StreamMessage::Chunk(text.as_bytes().to_vec())
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    fn summary(manager: &SessionManager) -> Vec<(Speaker, String, bool)> {
        manager
            .transcript()
            .turns()
            .iter()
            .map(|turn| (turn.speaker(), turn.text().to_string(), turn.is_complete()))
            .collect()
    }

    #[test]
    fn submit_appends_trimmed_user_turn_and_starts_sending() {
        let mut manager = SessionManager::new();
        manager.set_input("  hello  ");
        let ticket = manager.submit_input().expect("accepted");

        assert_eq!(manager.phase(), Phase::Sending);
        assert_eq!(manager.input(), "");
        assert_eq!(summary(&manager), vec![(Speaker::User, "hello".into(), true)]);
        assert_eq!(ticket.stream_id, manager.current_stream_id());
        assert_eq!(ticket.request.messages.len(), 1);
        assert_eq!(ticket.request.messages[0].content, "hello");
        assert!(!ticket.cancel_token.is_cancelled());
    }

    #[test]
    fn blank_input_is_rejected_and_kept() {
        let mut manager = SessionManager::new();
        manager.set_input("   \n");
        assert_eq!(manager.submit_input().unwrap_err(), SubmitRejected::EmptyInput);
        assert_eq!(manager.input(), "   \n");
        assert!(manager.transcript().is_empty());
        assert_eq!(manager.phase(), Phase::Idle);
    }

    #[test]
    fn streamed_chunks_accumulate_into_one_assistant_turn() {
        let mut manager = SessionManager::new();
        let ticket = manager.submit("hello").expect("accepted");
        let id = ticket.stream_id;

        manager.handle_stream_message(chunk("Hi"), id);
        assert_eq!(manager.phase(), Phase::Streaming);
        manager.handle_stream_message(chunk(" there"), id);
        manager.handle_stream_message(StreamMessage::End, id);

        assert_eq!(
            summary(&manager),
            vec![
                (Speaker::User, "hello".into(), true),
                (Speaker::Assistant, "Hi there".into(), true),
            ]
        );
        assert_eq!(manager.phase(), Phase::Idle);
        assert_eq!(manager.last_outcome(), Some(Phase::Completed));
        assert!(!ticket.cancel_token.is_cancelled());
    }

    #[test]
    fn chunk_events_name_only_the_open_turn() {
        let mut manager = SessionManager::new();
        let mut events = manager.subscribe();
        let id = manager.submit("hello").expect("accepted").stream_id;
        drain(&mut events);

        manager.handle_stream_message(chunk("Hi"), id);
        assert_eq!(
            drain(&mut events),
            vec![
                SessionEvent::PhaseChanged(Phase::Streaming),
                SessionEvent::TurnAppended { index: 1 },
                SessionEvent::TurnUpdated { index: 1 },
            ]
        );

        manager.handle_stream_message(chunk(" there"), id);
        assert_eq!(drain(&mut events), vec![SessionEvent::TurnUpdated { index: 1 }]);

        manager.handle_stream_message(StreamMessage::End, id);
        assert_eq!(
            drain(&mut events),
            vec![
                SessionEvent::TurnUpdated { index: 1 },
                SessionEvent::PhaseChanged(Phase::Completed),
                SessionEvent::PhaseChanged(Phase::Idle),
            ]
        );
    }

    #[test]
    fn error_after_partial_output_keeps_partial_and_appends_apology() {
        let mut manager = SessionManager::new();
        let ticket = manager.submit("explain X").expect("accepted");
        let id = ticket.stream_id;

        manager.handle_stream_message(chunk("Once"), id);
        manager.handle_stream_message(
            StreamMessage::Error(TransportError::Connection("reset by peer".into())),
            id,
        );

        let turns = manager.transcript().turns();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[1].text(), "Once");
        assert!(turns[1].is_interrupted());
        assert_eq!(turns[1].display(), TurnDisplay::Text { copyable: false });
        assert_eq!(turns[2].text(), FAILURE_MESSAGE);
        assert!(turns[2].is_complete());
        assert!(manager.transcript().is_well_formed());
        assert_eq!(manager.phase(), Phase::Idle);
        assert_eq!(manager.last_outcome(), Some(Phase::Failed));
        assert!(ticket.cancel_token.is_cancelled());
    }

    #[test]
    fn error_before_first_chunk_appends_only_apology() {
        let mut manager = SessionManager::new();
        let id = manager.submit("hello").expect("accepted").stream_id;
        manager.handle_stream_message(
            StreamMessage::Error(TransportError::Status {
                status: 500,
                summary: "boom".into(),
            }),
            id,
        );

        assert_eq!(
            summary(&manager),
            vec![
                (Speaker::User, "hello".into(), true),
                (Speaker::Assistant, FAILURE_MESSAGE.into(), true),
            ]
        );
        assert_eq!(manager.last_outcome(), Some(Phase::Failed));
    }

    #[test]
    fn invalid_utf8_takes_the_error_path() {
        let mut manager = SessionManager::new();
        let id = manager.submit("hello").expect("accepted").stream_id;
        manager.handle_stream_message(chunk("ok "), id);
        manager.handle_stream_message(StreamMessage::Chunk(vec![0xFF, 0xFE]), id);

        let turns = manager.transcript().turns();
        assert_eq!(turns[1].text(), "ok ");
        assert!(turns[1].is_interrupted());
        assert_eq!(turns[2].text(), FAILURE_MESSAGE);
        assert_eq!(manager.last_outcome(), Some(Phase::Failed));
    }

    #[test]
    fn body_ending_mid_character_takes_the_error_path() {
        let mut manager = SessionManager::new();
        let id = manager.submit("hello").expect("accepted").stream_id;
        let bytes = "é".as_bytes();
        manager.handle_stream_message(StreamMessage::Chunk(bytes[..1].to_vec()), id);
        assert_eq!(manager.transcript().turns()[1].display(), TurnDisplay::Pending);

        manager.handle_stream_message(StreamMessage::End, id);
        assert_eq!(manager.last_outcome(), Some(Phase::Failed));
        assert_eq!(manager.transcript().len(), 3);
    }

    #[test]
    fn empty_body_yields_blank_complete_reply() {
        let mut manager = SessionManager::new();
        let id = manager.submit("hello").expect("accepted").stream_id;
        manager.handle_stream_message(StreamMessage::End, id);

        let last = manager.transcript().last().expect("reply");
        assert_eq!(last.speaker(), Speaker::Assistant);
        assert_eq!(last.display(), TurnDisplay::Blank);
        assert_eq!(manager.last_outcome(), Some(Phase::Completed));
    }

    #[test]
    fn cancel_freezes_partial_reply_and_ignores_late_chunks() {
        let mut manager = SessionManager::new();
        let ticket = manager.submit("tell me").expect("accepted");
        let id = ticket.stream_id;
        manager.handle_stream_message(chunk("par"), id);

        assert!(manager.cancel());
        assert!(ticket.cancel_token.is_cancelled());
        assert_eq!(manager.phase(), Phase::Idle);
        assert_eq!(manager.last_outcome(), Some(Phase::Aborted));

        manager.handle_stream_message(chunk("tial"), id);
        manager.handle_stream_message(StreamMessage::End, id);

        assert_eq!(
            summary(&manager),
            vec![
                (Speaker::User, "tell me".into(), true),
                (Speaker::Assistant, "par".into(), true),
            ]
        );
        assert_eq!(
            manager.transcript().turns()[1].display(),
            TurnDisplay::Text { copyable: true }
        );
    }

    #[test]
    fn cancel_while_sending_appends_nothing() {
        let mut manager = SessionManager::new();
        let id = manager.submit("hello").expect("accepted").stream_id;
        assert!(manager.cancel());
        manager.handle_stream_message(chunk("late"), id);

        assert_eq!(summary(&manager), vec![(Speaker::User, "hello".into(), true)]);
        assert_eq!(manager.last_outcome(), Some(Phase::Aborted));
    }

    #[test]
    fn cancel_when_idle_is_a_no_op() {
        let mut manager = SessionManager::new();
        assert!(!manager.cancel());

        let id = manager.submit("hello").expect("accepted").stream_id;
        manager.handle_stream_message(chunk("Hi"), id);
        manager.handle_stream_message(StreamMessage::End, id);
        let before = manager.transcript().clone();

        assert!(!manager.cancel());
        assert!(!manager.cancel());
        assert_eq!(manager.transcript(), &before);
        assert_eq!(manager.last_outcome(), Some(Phase::Completed));
    }

    #[test]
    fn submit_while_streaming_changes_nothing() {
        let mut manager = SessionManager::new();
        let id = manager.submit("hello").expect("accepted").stream_id;
        manager.handle_stream_message(chunk("Hi"), id);
        let before = manager.transcript().clone();

        assert_eq!(
            manager.submit("another").unwrap_err(),
            SubmitRejected::Busy(Phase::Streaming)
        );
        assert_eq!(manager.transcript(), &before);
        assert_eq!(manager.phase(), Phase::Streaming);
        assert_eq!(manager.current_stream_id(), id);
    }

    #[test]
    fn messages_from_previous_streams_are_ignored() {
        let mut manager = SessionManager::new();
        let first = manager.submit("one").expect("accepted").stream_id;
        manager.cancel();
        let second = manager.submit("two").expect("accepted").stream_id;
        assert_ne!(first, second);

        manager.handle_stream_message(chunk("stale"), first);
        assert_eq!(manager.phase(), Phase::Sending);
        manager.handle_stream_message(chunk("fresh"), second);
        manager.handle_stream_message(StreamMessage::End, second);

        let texts: Vec<&str> = manager
            .transcript()
            .turns()
            .iter()
            .map(|turn| turn.text())
            .collect();
        assert_eq!(texts, vec!["one", "two", "fresh"]);
    }

    #[test]
    fn follow_up_request_carries_full_history() {
        let mut manager = SessionManager::new();
        let id = manager.submit("hello").expect("accepted").stream_id;
        manager.handle_stream_message(chunk("Hi there"), id);
        manager.handle_stream_message(StreamMessage::End, id);

        let ticket = manager.submit("how are you?").expect("accepted");
        let roles: Vec<(&str, &str)> = ticket
            .request
            .messages
            .iter()
            .map(|m| (m.role.as_str(), m.content.as_str()))
            .collect();
        assert_eq!(
            roles,
            vec![
                ("user", "hello"),
                ("assistant", "Hi there"),
                ("user", "how are you?")
            ]
        );
    }

    #[test]
    fn new_session_stops_stream_and_clears_transcript() {
        let mut manager = SessionManager::new();
        let mut events = manager.subscribe();
        let ticket = manager.submit("hello").expect("accepted");
        manager.handle_stream_message(chunk("Hi"), ticket.stream_id);
        manager.set_input("draft");

        manager.new_session();

        assert!(ticket.cancel_token.is_cancelled());
        assert!(manager.transcript().is_empty());
        assert_eq!(manager.input(), "");
        assert_eq!(manager.phase(), Phase::Idle);
        assert_eq!(drain(&mut events).last(), Some(&SessionEvent::Cleared));

        manager.handle_stream_message(chunk(" late"), ticket.stream_id);
        assert!(manager.transcript().is_empty());
    }

    #[test]
    fn submit_control_tracks_phase_and_input() {
        let mut manager = SessionManager::new();
        assert_eq!(manager.submit_control(), SubmitControl::Send { enabled: false });
        manager.set_input("  ");
        assert_eq!(manager.submit_control(), SubmitControl::Send { enabled: false });
        manager.set_input("hi");
        assert_eq!(manager.submit_control(), SubmitControl::Send { enabled: true });

        manager.submit_input().expect("accepted");
        assert_eq!(manager.submit_control(), SubmitControl::Stop);
        manager.cancel();
        assert_eq!(manager.submit_control(), SubmitControl::Send { enabled: false });
    }

    #[test]
    fn dropped_subscriber_does_not_break_the_manager() {
        let mut manager = SessionManager::new();
        drop(manager.subscribe());
        let id = manager.submit("hello").expect("accepted").stream_id;
        manager.handle_stream_message(chunk("Hi"), id);
        manager.handle_stream_message(StreamMessage::End, id);
        assert_eq!(manager.last_outcome(), Some(Phase::Completed));
    }
}
