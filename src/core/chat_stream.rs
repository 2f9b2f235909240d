use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::ChatRequest;
use crate::core::transport::{ChatTransport, TransportError};

#[derive(Clone, Debug)]
pub enum StreamMessage {
    Chunk(Vec<u8>),
    Error(TransportError),
    End,
}

pub struct StreamParams {
    pub transport: Arc<dyn ChatTransport>,
    pub request: ChatRequest,
    pub cancel_token: CancellationToken,
    pub stream_id: u64,
    pub idle_timeout: Option<Duration>,
}

#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Runs one exchange on a background task, forwarding body chunks in
    /// wire order tagged with `stream_id`. Nothing is forwarded once the
    /// token is cancelled.
    pub fn spawn_stream(&self, params: StreamParams) {
        let tx_clone = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                transport,
                request,
                cancel_token,
                stream_id,
                idle_timeout,
            } = params;

            tokio::select! {
                _ = pump_body(transport, request, idle_timeout, &cancel_token, &tx_clone, stream_id) => {}
                _ = cancel_token.cancelled() => {
                    debug!(stream_id, "chat stream cancelled");
                }
            }
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, message: StreamMessage, stream_id: u64) {
        let _ = self.tx.send((message, stream_id));
    }
}

async fn pump_body(
    transport: Arc<dyn ChatTransport>,
    request: ChatRequest,
    idle_timeout: Option<Duration>,
    cancel_token: &CancellationToken,
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
) {
    let send = |message: StreamMessage| {
        if cancel_token.is_cancelled() {
            return false;
        }
        tx.send((message, stream_id)).is_ok()
    };

    let mut body = match within_idle_window(idle_timeout, transport.open(request)).await {
        Ok(Ok(body)) => body,
        Ok(Err(err)) | Err(err) => {
            send(StreamMessage::Error(err));
            return;
        }
    };
    debug!(stream_id, "chat stream opened");

    loop {
        match within_idle_window(idle_timeout, body.next()).await {
            Ok(Some(Ok(bytes))) => {
                if bytes.is_empty() {
                    continue;
                }
                if !send(StreamMessage::Chunk(bytes)) {
                    return;
                }
            }
            Ok(Some(Err(err))) | Err(err) => {
                send(StreamMessage::Error(err));
                return;
            }
            Ok(None) => {
                send(StreamMessage::End);
                return;
            }
        }
    }
}

async fn within_idle_window<F: Future>(
    limit: Option<Duration>,
    fut: F,
) -> Result<F::Output, TransportError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| TransportError::IdleTimeout(limit)),
        None => Ok(fut.await),
    }
}
