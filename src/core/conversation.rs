//! Async driver that connects a [`SessionManager`] to a transport.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::core::chat_stream::{ChatStreamService, StreamMessage, StreamParams};
use crate::core::config::ClientSettings;
use crate::core::session::{Phase, SessionEvent, SessionManager, SubmitRejected};
use crate::core::transcript::Transcript;
use crate::core::transport::{ChatTransport, HttpTransport};

pub struct Conversation {
    manager: SessionManager,
    service: ChatStreamService,
    updates: mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    transport: Arc<dyn ChatTransport>,
    idle_timeout: Option<Duration>,
}

impl Conversation {
    pub fn new(transport: Arc<dyn ChatTransport>, idle_timeout: Option<Duration>) -> Self {
        let (service, updates) = ChatStreamService::new();
        Self {
            manager: SessionManager::new(),
            service,
            updates,
            transport,
            idle_timeout,
        }
    }

    pub fn from_settings(client: reqwest::Client, settings: &ClientSettings) -> Self {
        let transport = HttpTransport::new(client, settings.chat_url());
        Self::new(Arc::new(transport), settings.idle_timeout)
    }

    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// Replaces the pending input used by [`Conversation::submit_input`].
    pub fn set_input(&mut self, input: impl Into<String>) {
        self.manager.set_input(input);
    }

    pub fn transcript(&self) -> &Transcript {
        self.manager.transcript()
    }

    pub fn phase(&self) -> Phase {
        self.manager.phase()
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SessionEvent> {
        self.manager.subscribe()
    }

    /// Accepts `input` and starts streaming the reply in the background.
    pub fn submit(&mut self, input: &str) -> Result<u64, SubmitRejected> {
        let ticket = self.manager.submit(input)?;
        Ok(self.spawn(ticket))
    }

    pub fn submit_input(&mut self) -> Result<u64, SubmitRejected> {
        let ticket = self.manager.submit_input()?;
        Ok(self.spawn(ticket))
    }

    pub fn cancel(&mut self) -> bool {
        self.manager.cancel()
    }

    pub fn new_session(&mut self) {
        self.manager.new_session();
    }

    /// Applies the next transport message. Returns `false` without waiting
    /// when no exchange is in flight.
    pub async fn pump(&mut self) -> bool {
        if !self.manager.phase().is_active() {
            return false;
        }
        match self.updates.recv().await {
            Some((message, stream_id)) => {
                self.manager.handle_stream_message(message, stream_id);
                true
            }
            None => false,
        }
    }

    pub async fn wait_until_idle(&mut self) {
        while self.pump().await {}
    }

    fn spawn(&self, ticket: crate::core::session::StreamTicket) -> u64 {
        let stream_id = ticket.stream_id;
        self.service.spawn_stream(StreamParams {
            transport: Arc::clone(&self.transport),
            request: ticket.request,
            cancel_token: ticket.cancel_token,
            stream_id,
            idle_timeout: self.idle_timeout,
        });
        stream_id
    }

    #[cfg(test)]
    pub(crate) fn stream_service(&self) -> &ChatStreamService {
        &self.service
    }
}
