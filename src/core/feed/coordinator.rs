use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use super::filter::LogFilter;
use super::store::RecordStore;
use super::subscriber::{ConnectionState, StreamSignal, StreamSubscriber};
use crate::core::model::LogRecord;
use crate::core::ports::backend::{BackendError, LogBackend};
use crate::core::ports::transport::StreamTransport;

const FIRST_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Filter plus page size: the immutable scope of one coherent feed view.
/// Changing it discards cached pages, since pages fetched under another
/// configuration are generally disjoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub filter: LogFilter,
    pub page_size: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            filter: LogFilter::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Immutable snapshot handed to the UI layer.
#[derive(Debug, Clone)]
pub struct FeedView {
    pub records: Vec<LogRecord>,
    pub has_more: bool,
    pub connection: ConnectionState,
    pub last_error: Option<String>,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("page fetch failed: {0}")]
    Fetch(#[source] BackendError),
    #[error("log clear failed: {0}")]
    Clear(#[source] BackendError),
}

struct FeedState {
    config: FeedConfig,
    next_page: u64,
    exhausted: bool,
    fetch_in_flight: bool,
    /// Bumped whenever cached pages become invalid (configure, clear,
    /// dispose). A fetch started under an older value discards its result.
    fetch_epoch: u64,
    /// Bumped whenever the subscription restarts. The pump for an older
    /// activation stops forwarding as soon as it observes a newer value.
    stream_epoch: u64,
    store: RecordStore,
    connection: ConnectionState,
    last_error: Option<String>,
}

struct StreamTasks {
    subscriber: StreamSubscriber,
    pump: Option<JoinHandle<()>>,
}

/// Reconciles the paginated history with the live push stream into one
/// deduplicated, time-ordered view.
///
/// All state mutation is serialized behind one mutex; network round trips
/// (page fetch, token fetch, connect) run outside it and re-validate their
/// epoch afterwards, so a reconfiguration racing a slow fetch wins cleanly.
pub struct FeedCoordinator {
    backend: Arc<dyn LogBackend>,
    state: Arc<Mutex<FeedState>>,
    tasks: Mutex<StreamTasks>,
}

impl FeedCoordinator {
    pub fn new(
        backend: Arc<dyn LogBackend>,
        transport: Arc<dyn StreamTransport>,
        config: FeedConfig,
    ) -> Self {
        let subscriber = StreamSubscriber::new(Arc::clone(&backend), transport);
        Self {
            backend,
            state: Arc::new(Mutex::new(FeedState {
                config,
                next_page: FIRST_PAGE,
                exhausted: false,
                fetch_in_flight: false,
                fetch_epoch: 0,
                stream_epoch: 0,
                store: RecordStore::new(),
                connection: ConnectionState::Disconnected,
                last_error: None,
            })),
            tasks: Mutex::new(StreamTasks {
                subscriber,
                pump: None,
            }),
        }
    }

    /// Begin the live subscription for the current configuration.
    pub async fn start(&self) {
        self.restart_stream().await;
    }

    /// Re-run the whole activation sequence (fresh token, fresh
    /// connection), typically after observing `Errored`.
    pub async fn reconnect(&self) {
        self.restart_stream().await;
    }

    /// Switch to a new filter/page-size scope. Equal configuration is a
    /// no-op; otherwise cached records and the cursor are dropped and the
    /// subscription restarts so push arrivals are filtered consistently.
    pub async fn configure(&self, config: FeedConfig) {
        {
            let mut state = self.state.lock().await;
            if state.config == config {
                return;
            }
            state.config = config;
            state.fetch_epoch += 1;
            state.fetch_in_flight = false;
            state.next_page = FIRST_PAGE;
            state.exhausted = false;
            state.store.clear();
            state.last_error = None;
        }
        self.restart_stream().await;
    }

    /// Fetch the next historical page and merge it in. No-op while the
    /// history is exhausted or another fetch is in flight, so concurrent
    /// calls collapse into a single request.
    pub async fn load_more(&self) -> Result<(), FeedError> {
        let (page, page_size, filter, epoch) = {
            let mut state = self.state.lock().await;
            if state.exhausted || state.fetch_in_flight {
                return Ok(());
            }
            state.fetch_in_flight = true;
            (
                state.next_page,
                state.config.page_size,
                state.config.filter.clone(),
                state.fetch_epoch,
            )
        };

        let result = self.backend.list_logs(page, page_size, &filter).await;

        let mut state = self.state.lock().await;
        if state.fetch_epoch != epoch {
            // The configuration moved on while we were fetching; the result
            // belongs to a dead scope.
            return Ok(());
        }
        state.fetch_in_flight = false;

        match result {
            Ok(records) => {
                let fetched = records.len();
                if fetched < page_size {
                    state.exhausted = true;
                }
                state.store.merge(records);
                state.next_page += 1;
                state.last_error = None;
                log::debug!("merged page {} ({} records)", page, fetched);
                Ok(())
            }
            Err(error) => {
                state.last_error = Some(error.to_string());
                Err(FeedError::Fetch(error))
            }
        }
    }

    /// Clear the server-side history, then the local store, keeping both
    /// sides consistent. The cursor rewinds to the first page.
    pub async fn clear(&self) -> Result<(), FeedError> {
        self.backend.clear_logs().await.map_err(FeedError::Clear)?;

        let mut state = self.state.lock().await;
        state.fetch_epoch += 1;
        state.fetch_in_flight = false;
        state.next_page = FIRST_PAGE;
        state.exhausted = false;
        state.store.clear();
        state.last_error = None;
        Ok(())
    }

    pub async fn view(&self) -> FeedView {
        let state = self.state.lock().await;
        FeedView {
            records: state.store.view(),
            has_more: !state.exhausted,
            connection: state.connection,
            last_error: state.last_error.clone(),
        }
    }

    /// Tear the feed down: ends the subscription and invalidates the
    /// effects of any in-flight fetch. Merged history stays readable.
    pub async fn dispose(&self) {
        {
            let mut state = self.state.lock().await;
            state.fetch_epoch += 1;
            state.stream_epoch += 1;
            state.fetch_in_flight = false;
            state.connection = ConnectionState::Disconnected;
        }
        let mut tasks = self.tasks.lock().await;
        tasks.subscriber.deactivate();
        if let Some(pump) = tasks.pump.take() {
            pump.abort();
        }
    }

    async fn restart_stream(&self) {
        let epoch = {
            let mut state = self.state.lock().await;
            state.stream_epoch += 1;
            state.connection = ConnectionState::Connecting;
            state.stream_epoch
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let state = Arc::clone(&self.state);
        let pump = tokio::spawn(async move {
            while let Some(signal) = rx.recv().await {
                let mut state = state.lock().await;
                if state.stream_epoch != epoch {
                    break;
                }
                match signal {
                    StreamSignal::State(connection) => state.connection = connection,
                    StreamSignal::Record(record) => {
                        if state.config.filter.matches(&record) {
                            state.store.merge([record]);
                        }
                    }
                }
            }
        });

        let mut tasks = self.tasks.lock().await;
        tasks.subscriber.activate(tx);
        if let Some(old) = tasks.pump.replace(pump) {
            old.abort();
        }
    }
}
