use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use memchr::memmem;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::api::ChatRequest;
use crate::core::transport::{BodyStream, ChatTransport, TransportError};

type BodyItem = Result<Vec<u8>, TransportError>;

/// In-memory transport whose response bodies are fed by the test.
#[derive(Default)]
pub struct ChannelTransport {
    queued: Mutex<VecDeque<Result<mpsc::UnboundedReceiver<BodyItem>, TransportError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ChannelTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues a response body for the next `open` and returns its feeder.
    pub fn expect_body(&self) -> BodyFeeder {
        let (tx, rx) = mpsc::unbounded_channel();
        self.queued.lock().unwrap().push_back(Ok(rx));
        BodyFeeder { tx: Some(tx) }
    }

    /// Makes the next `open` fail before any body arrives.
    pub fn expect_failure(&self, error: TransportError) {
        self.queued.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for ChannelTransport {
    async fn open(&self, request: ChatRequest) -> Result<BodyStream, TransportError> {
        self.requests.lock().unwrap().push(request);
        let next = self
            .queued
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Connection("no scripted response".into())));
        let rx = next?;
        Ok(futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed())
    }
}

pub struct BodyFeeder {
    tx: Option<mpsc::UnboundedSender<BodyItem>>,
}

impl BodyFeeder {
    pub fn bytes(&self, bytes: &[u8]) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Ok(bytes.to_vec()));
        }
    }

    pub fn text(&self, text: &str) {
        self.bytes(text.as_bytes());
    }

    pub fn fail(&self, error: TransportError) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Err(error));
        }
    }

    /// Closes the body cleanly.
    pub fn end(mut self) {
        self.tx.take();
    }
}

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub head: String,
    pub body: Vec<u8>,
}

#[derive(Clone, Debug)]
pub enum Ending {
    Clean,
    Drop,
    Hang,
}

/// Canned HTTP/1.1 response served by [`TestServer`].
#[derive(Clone, Debug)]
pub enum ScriptedResponse {
    Chunked {
        chunks: Vec<Vec<u8>>,
        delay: Duration,
        ending: Ending,
    },
    Status {
        status: u16,
        body: String,
    },
    Json(String),
}

impl ScriptedResponse {
    pub fn chunked(parts: &[&str]) -> Self {
        Self::chunked_bytes(parts.iter().map(|part| part.as_bytes().to_vec()).collect())
    }

    pub fn chunked_bytes(chunks: Vec<Vec<u8>>) -> Self {
        ScriptedResponse::Chunked {
            chunks,
            delay: Duration::from_millis(5),
            ending: Ending::Clean,
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        ScriptedResponse::Status {
            status,
            body: body.to_string(),
        }
    }

    pub fn json(body: &str) -> Self {
        ScriptedResponse::Json(body.to_string())
    }

    /// Closes the socket after the last chunk without the terminating chunk.
    pub fn dropping_connection(self) -> Self {
        self.with_ending(Ending::Drop)
    }

    /// Keeps the connection open after the last chunk.
    pub fn hanging(self) -> Self {
        self.with_ending(Ending::Hang)
    }

    fn with_ending(self, new_ending: Ending) -> Self {
        match self {
            ScriptedResponse::Chunked { chunks, delay, .. } => ScriptedResponse::Chunked {
                chunks,
                delay,
                ending: new_ending,
            },
            other => other,
        }
    }
}

/// Minimal HTTP server on a loopback port that answers every connection
/// with the same scripted response.
pub struct TestServer {
    addr: SocketAddr,
    requests: tokio::sync::Mutex<mpsc::UnboundedReceiver<RecordedRequest>>,
    task: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn start(response: ScriptedResponse) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let (tx, rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let response = response.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let _ = serve_connection(socket, response, tx).await;
                });
            }
        });

        Self {
            addr,
            requests: tokio::sync::Mutex::new(rx),
            task,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn recorded_request(&self) -> Option<RecordedRequest> {
        let mut rx = self.requests.lock().await;
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .ok()
            .flatten()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_connection(
    mut socket: TcpStream,
    response: ScriptedResponse,
    requests: mpsc::UnboundedSender<RecordedRequest>,
) -> std::io::Result<()> {
    let request = read_request(&mut socket).await?;
    let _ = requests.send(request);

    match response {
        ScriptedResponse::Chunked {
            chunks,
            delay,
            ending,
        } => {
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
                )
                .await?;
            socket.flush().await?;
            for chunk in chunks {
                tokio::time::sleep(delay).await;
                socket
                    .write_all(format!("{:x}\r\n", chunk.len()).as_bytes())
                    .await?;
                socket.write_all(&chunk).await?;
                socket.write_all(b"\r\n").await?;
                socket.flush().await?;
            }
            match ending {
                Ending::Clean => {
                    socket.write_all(b"0\r\n\r\n").await?;
                    socket.flush().await?;
                }
                Ending::Drop => {}
                Ending::Hang => std::future::pending::<()>().await,
            }
        }
        ScriptedResponse::Status { status, body } => {
            write_plain(&mut socket, status, "application/json", &body).await?;
        }
        ScriptedResponse::Json(body) => {
            write_plain(&mut socket, 200, "application/json", &body).await?;
        }
    }

    socket.shutdown().await
}

async fn write_plain(
    socket: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &str,
) -> std::io::Result<()> {
    let head = format!(
        "HTTP/1.1 {status} Scripted\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    socket.write_all(head.as_bytes()).await?;
    socket.write_all(body.as_bytes()).await?;
    socket.flush().await
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<RecordedRequest> {
    let mut buffer = Vec::new();
    let mut scratch = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = memmem::find(&buffer, b"\r\n\r\n") {
            break pos;
        }
        let read = socket.read(&mut scratch).await?;
        if read == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buffer.extend_from_slice(&scratch[..read]);
    };

    let head = String::from_utf8_lossy(&buffer[..head_end]).into_owned();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buffer[head_end + 4..].to_vec();
    while body.len() < content_length {
        let read = socket.read(&mut scratch).await?;
        if read == 0 {
            break;
        }
        body.extend_from_slice(&scratch[..read]);
    }

    Ok(RecordedRequest { head, body })
}
