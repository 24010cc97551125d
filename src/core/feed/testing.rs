//! In-memory ports for feed tests.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::sync::Semaphore;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::core::feed::LogFilter;
use crate::core::model::LogRecord;
use crate::core::ports::backend::{BackendError, LogBackend};
use crate::core::ports::transport::{EventPayloadStream, StreamTransport, TransportError};

pub(crate) fn record(id: i64, time: i64) -> LogRecord {
    LogRecord {
        id,
        time,
        request_model_name: "gpt-4o".to_string(),
        channel_id: 1,
        channel_name: "primary".to_string(),
        actual_model_name: "gpt-4o".to_string(),
        input_tokens: 12,
        output_tokens: 34,
        ftut: 120,
        use_time: 900,
        cost: 0.0021,
        request_content: String::new(),
        response_content: String::new(),
        error: String::new(),
        attempts: Vec::new(),
        total_attempts: 1,
    }
}

pub(crate) fn push_payload(record: &LogRecord) -> String {
    serde_json::to_string(record).expect("serialize record")
}

/// Poll `check` until it reports true or the wait gives up.
pub(crate) async fn wait_until<F, Fut>(check: F) -> bool
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..400 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

pub(crate) struct MockBackend {
    pages: Mutex<HashMap<u64, Vec<LogRecord>>>,
    pub requested: Mutex<Vec<u64>>,
    pub list_calls: AtomicUsize,
    pub clear_calls: AtomicUsize,
    pub fail_next_list: AtomicBool,
    pub fail_token: AtomicBool,
    /// When set, every list call waits for one permit before answering.
    gate: Option<Arc<Semaphore>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(None))
    }

    /// Backend whose list calls block until the test releases them with
    /// `gate.add_permits(..)`.
    pub fn gated() -> (Arc<Self>, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        (Arc::new(Self::build(Some(Arc::clone(&gate)))), gate)
    }

    fn build(gate: Option<Arc<Semaphore>>) -> Self {
        Self {
            pages: Mutex::new(HashMap::new()),
            requested: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
            clear_calls: AtomicUsize::new(0),
            fail_next_list: AtomicBool::new(false),
            fail_token: AtomicBool::new(false),
            gate,
        }
    }

    pub fn put_page(&self, page: u64, records: Vec<LogRecord>) {
        self.pages.lock().expect("pages lock").insert(page, records);
    }

    pub fn requested_pages(&self) -> Vec<u64> {
        self.requested.lock().expect("requested lock").clone()
    }
}

impl LogBackend for MockBackend {
    fn list_logs<'a>(
        &'a self,
        page: u64,
        _page_size: usize,
        _filter: &'a LogFilter,
    ) -> BoxFuture<'a, Result<Vec<LogRecord>, BackendError>> {
        Box::pin(async move {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().expect("requested lock").push(page);

            if let Some(gate) = &self.gate {
                gate.acquire().await.expect("gate closed").forget();
            }

            if self.fail_next_list.swap(false, Ordering::SeqCst) {
                return Err(BackendError::Transport("connection refused".to_string()));
            }

            Ok(self
                .pages
                .lock()
                .expect("pages lock")
                .get(&page)
                .cloned()
                .unwrap_or_default())
        })
    }

    fn stream_token(&self) -> BoxFuture<'_, Result<String, BackendError>> {
        Box::pin(async move {
            if self.fail_token.load(Ordering::SeqCst) {
                return Err(BackendError::Status {
                    status: 401,
                    message: "token refused".to_string(),
                });
            }
            Ok("tok-test".to_string())
        })
    }

    fn clear_logs(&self) -> BoxFuture<'_, Result<(), BackendError>> {
        Box::pin(async move {
            self.clear_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

pub(crate) struct MockTransport {
    streams: Mutex<VecDeque<EventPayloadStream>>,
    pub opens: AtomicUsize,
    pub fail_connect: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            streams: Mutex::new(VecDeque::new()),
            opens: AtomicUsize::new(0),
            fail_connect: AtomicBool::new(false),
        })
    }

    /// Queue one stream for the next `open` call and hand back its feeding
    /// end. With nothing queued, `open` yields a silent, never-ending
    /// stream.
    pub fn push_stream(&self) -> mpsc::UnboundedSender<Result<String, TransportError>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.streams
            .lock()
            .expect("streams lock")
            .push_back(UnboundedReceiverStream::new(rx).boxed());
        tx
    }
}

impl StreamTransport for MockTransport {
    fn open<'a>(
        &'a self,
        _token: &'a str,
    ) -> BoxFuture<'a, Result<EventPayloadStream, TransportError>> {
        Box::pin(async move {
            if self.fail_connect.load(Ordering::SeqCst) {
                return Err(TransportError::Connect("connection refused".to_string()));
            }
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .streams
                .lock()
                .expect("streams lock")
                .pop_front()
                .unwrap_or_else(|| futures::stream::pending().boxed()))
        })
    }
}
