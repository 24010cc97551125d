mod coordinator;
mod filter;
mod store;
mod subscriber;
#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{FeedConfig, FeedCoordinator, FeedError, FeedView, DEFAULT_PAGE_SIZE};
pub use filter::{LogFilter, RetriedFilter};
pub use store::RecordStore;
pub use subscriber::{ConnectionState, StreamSignal, StreamSubscriber};
