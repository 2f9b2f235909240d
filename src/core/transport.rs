//! Transport seam for the chat endpoint.
//!
//! The session manager only needs "send a request, get an ordered byte
//! stream back". [`HttpTransport`] is the production implementation; tests
//! plug in scripted transports.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;

use crate::api::{ChatRequest, HealthResponse};
use crate::core::decoder::DecodeError;

pub type BodyStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The endpoint answered with a non-success status.
    Status { status: u16, summary: String },
    /// The connection could not be made or broke mid-body.
    Connection(String),
    /// Nothing arrived within the configured idle window.
    IdleTimeout(Duration),
    /// The body was not valid UTF-8 text.
    Decode(DecodeError),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Status { status, summary } if summary.is_empty() => {
                write!(f, "chat endpoint returned HTTP {status}")
            }
            TransportError::Status { status, summary } => {
                write!(f, "chat endpoint returned HTTP {status}: {summary}")
            }
            TransportError::Connection(reason) => write!(f, "connection failed: {reason}"),
            TransportError::IdleTimeout(limit) => {
                write!(f, "no data received for {}s", limit.as_secs())
            }
            TransportError::Decode(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<DecodeError> for TransportError {
    fn from(value: DecodeError) -> Self {
        TransportError::Decode(value)
    }
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends `request` and resolves once the response head is accepted.
    async fn open(&self, request: ChatRequest) -> Result<BodyStream, TransportError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    chat_url: String,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, chat_url: impl Into<String>) -> Self {
        Self {
            client,
            chat_url: chat_url.into(),
        }
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open(&self, request: ChatRequest) -> Result<BodyStream, TransportError> {
        let response = self
            .client
            .post(&self.chat_url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|err| TransportError::Connection(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(TransportError::Status {
                status: status.as_u16(),
                summary: summarize_error_body(&error_text),
            });
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|err| TransportError::Connection(err.to_string()))
            })
            .boxed())
    }
}

/// Probes the backend's health route.
pub async fn check_health(
    client: &reqwest::Client,
    health_url: &str,
) -> Result<HealthResponse, TransportError> {
    let response = client
        .get(health_url)
        .send()
        .await
        .map_err(|err| TransportError::Connection(err.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(TransportError::Status {
            status: status.as_u16(),
            summary: summarize_error_body(&error_text),
        });
    }

    response
        .json::<HealthResponse>()
        .await
        .map_err(|err| TransportError::Connection(err.to_string()))
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("detail")
                .or_else(|| value.get("message"))
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// One-line description of an error body, for logs.
pub fn summarize_error_body(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&json_value) {
            if !summary.is_empty() {
                return summary;
            }
        }
        return json_value.to_string();
    }

    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}
