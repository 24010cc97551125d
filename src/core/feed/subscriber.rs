use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::core::model::LogRecord;
use crate::core::ports::backend::LogBackend;
use crate::core::ports::transport::StreamTransport;

/// Health of the push connection. Transitions are produced only by the
/// subscriber; owners read them off the signal channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Errored,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Errored => "errored",
        }
    }

    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

#[derive(Debug)]
pub enum StreamSignal {
    State(ConnectionState),
    Record(LogRecord),
}

/// Emission guard for one activation. Every send re-checks the subscriber's
/// generation, so a signal racing `deactivate` is dropped instead of
/// reaching the owner; relying on task abort alone would leave that window
/// open.
struct SignalGate {
    generation: Arc<AtomicU64>,
    expected: u64,
    tx: mpsc::UnboundedSender<StreamSignal>,
}

impl SignalGate {
    fn send(&self, signal: StreamSignal) -> bool {
        if self.generation.load(Ordering::SeqCst) != self.expected {
            return false;
        }
        self.tx.send(signal).is_ok()
    }
}

/// Live log subscription: fetches a single-use stream token, opens the push
/// connection, and forwards decoded records and state changes to the owner.
///
/// There is no in-place reconnect. A transport error ends the activation
/// with an `Errored` signal; the owner restarts the whole sequence (fresh
/// token, fresh connection) when it wants the stream back.
pub struct StreamSubscriber {
    backend: Arc<dyn LogBackend>,
    transport: Arc<dyn StreamTransport>,
    generation: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl StreamSubscriber {
    pub fn new(backend: Arc<dyn LogBackend>, transport: Arc<dyn StreamTransport>) -> Self {
        Self {
            backend,
            transport,
            generation: Arc::new(AtomicU64::new(0)),
            task: None,
        }
    }

    /// Start a new activation, ending any previous one first. Signals for
    /// this activation flow into `tx` until the stream ends, errors, or
    /// `deactivate` is called.
    pub fn activate(&mut self, tx: mpsc::UnboundedSender<StreamSignal>) {
        self.deactivate();

        let gate = SignalGate {
            generation: Arc::clone(&self.generation),
            expected: self.generation.load(Ordering::SeqCst),
            tx,
        };
        let backend = Arc::clone(&self.backend);
        let transport = Arc::clone(&self.transport);
        self.task = Some(tokio::spawn(run_subscription(backend, transport, gate)));
    }

    /// End the current activation. Pending token requests and the open
    /// connection are released; no signal is delivered after this returns.
    pub fn deactivate(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for StreamSubscriber {
    fn drop(&mut self) {
        self.deactivate();
    }
}

async fn run_subscription(
    backend: Arc<dyn LogBackend>,
    transport: Arc<dyn StreamTransport>,
    gate: SignalGate,
) {
    gate.send(StreamSignal::State(ConnectionState::Connecting));

    let token = match backend.stream_token().await {
        Ok(token) => token,
        Err(error) => {
            log::warn!("stream token request failed: {}", error);
            gate.send(StreamSignal::State(ConnectionState::Errored));
            return;
        }
    };

    let mut events = match transport.open(&token).await {
        Ok(events) => events,
        Err(error) => {
            log::warn!("stream connect failed: {}", error);
            gate.send(StreamSignal::State(ConnectionState::Errored));
            return;
        }
    };

    gate.send(StreamSignal::State(ConnectionState::Connected));

    while let Some(item) = events.next().await {
        match item {
            Ok(payload) => match serde_json::from_str::<LogRecord>(&payload) {
                Ok(record) => {
                    if !gate.send(StreamSignal::Record(record)) {
                        return;
                    }
                }
                // One bad message must not end the subscription.
                Err(error) => log::warn!("dropping undecodable stream payload: {}", error),
            },
            Err(error) => {
                log::warn!("stream read failed: {}", error);
                gate.send(StreamSignal::State(ConnectionState::Errored));
                return;
            }
        }
    }

    // Server closed the stream without a transport error.
    gate.send(StreamSignal::State(ConnectionState::Disconnected));
}
