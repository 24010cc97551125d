use futures::future::BoxFuture;
use futures::stream::BoxStream;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("stream connect failed: {0}")]
    Connect(String),
    #[error("stream read failed: {0}")]
    Read(String),
}

/// Data payloads of push events, in arrival order. One item per event; the
/// payload is the event's decoded data block, not yet parsed as a record.
pub type EventPayloadStream = BoxStream<'static, Result<String, TransportError>>;

/// Push transport for the live log feed. `open` resolving successfully is
/// the transport's "connection established" signal; the returned stream
/// ends when the server closes the connection.
pub trait StreamTransport: Send + Sync {
    fn open<'a>(&'a self, token: &'a str)
        -> BoxFuture<'a, Result<EventPayloadStream, TransportError>>;
}
