use futures::future::BoxFuture;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::core::ports::transport::{EventPayloadStream, StreamTransport, TransportError};

/// Incremental decoder for text/event-stream framing. Bytes go in as they
/// arrive off the wire; complete event payloads come out. `data:` lines
/// accumulate until a blank line flushes the event; comment lines (the
/// server's keep-alives) and non-data fields are skipped.
#[derive(Debug, Default)]
pub struct SseFrameDecoder {
    buffer: String,
    data: Vec<String>,
}

impl SseFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut events = Vec::new();
        while let Some(line_end) = self.buffer.find('\n') {
            let line = self.buffer[..line_end].trim_end_matches('\r').to_string();
            self.buffer.drain(..=line_end);

            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(self.data.join("\n"));
                    self.data.clear();
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }
            if let Some(value) = line.strip_prefix("data:") {
                self.data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
            }
            // event:/id:/retry: fields carry nothing this feed uses.
        }
        events
    }
}

/// Push transport over the backend's SSE endpoint. `open` resolves once the
/// response headers are in (the "connection established" signal); the
/// returned stream yields one decoded data payload per event and ends when
/// the server closes the response.
pub struct SseTransport {
    client: reqwest::Client,
    base: String,
}

impl SseTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: format!("{}/api/v1", base_url.trim_end_matches('/')),
        }
    }
}

impl StreamTransport for SseTransport {
    fn open<'a>(
        &'a self,
        token: &'a str,
    ) -> BoxFuture<'a, Result<EventPayloadStream, TransportError>> {
        Box::pin(async move {
            let url = format!(
                "{}/log/stream?token={}",
                self.base,
                urlencoding::encode(token)
            );
            let response = self
                .client
                .get(&url)
                .header("accept", "text/event-stream")
                .send()
                .await
                .map_err(|error| TransportError::Connect(error.to_string()))?;
            if !response.status().is_success() {
                return Err(TransportError::Connect(format!(
                    "server returned {}",
                    response.status()
                )));
            }

            let mut bytes = response.bytes_stream();
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(async move {
                let mut decoder = SseFrameDecoder::new();
                loop {
                    tokio::select! {
                        // Receiver gone: the subscription was torn down.
                        _ = tx.closed() => break,
                        chunk = bytes.next() => match chunk {
                            Some(Ok(chunk)) => {
                                for payload in decoder.feed(&chunk) {
                                    if tx.send(Ok(payload)).is_err() {
                                        return;
                                    }
                                }
                            }
                            Some(Err(error)) => {
                                let _ = tx.send(Err(TransportError::Read(error.to_string())));
                                return;
                            }
                            None => break,
                        }
                    }
                }
            });

            Ok(UnboundedReceiverStream::new(rx).boxed())
        })
    }
}
