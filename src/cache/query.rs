//! Query contracts and per-entry state.

use std::fmt::Debug;
use std::hash::Hash;

use async_trait::async_trait;
use thiserror::Error;

use super::keys::Tag;

/// A cacheable read operation together with its arguments.
///
/// Two queries that compare equal share one cache entry, so parameters must
/// implement structural equality.
pub trait CacheQuery: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    type Data: Clone + Debug + Send + Sync + 'static;

    /// Operation name used in logs and metric labels.
    fn operation(&self) -> &'static str;

    /// Tags this query's result depends on.
    fn provides(&self) -> Vec<Tag>;
}

/// Performs the network read behind a query.
#[async_trait]
pub trait QueryFetcher<Q: CacheQuery>: Send + Sync + 'static {
    async fn fetch(&self, query: &Q) -> Result<Q::Data, FetchError>;
}

/// Failure stored on an errored entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server rejected request with status {status}")]
    Server { status: u16, message: Option<String> },
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl FetchError {
    /// Message suitable for display, falling back when the server sent none.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            FetchError::Server {
                message: Some(message),
                ..
            } => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStatus {
    #[default]
    Uninitialized,
    Loading,
    Success,
    Error,
}

/// Snapshot of one cache entry as seen by a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState<D> {
    pub status: QueryStatus,
    pub data: Option<D>,
    pub error: Option<FetchError>,
    /// A request for this entry is in flight, initial or background.
    pub is_fetching: bool,
    /// Data was invalidated and is waiting to be replaced.
    pub is_stale: bool,
}

impl<D> Default for QueryState<D> {
    fn default() -> Self {
        Self {
            status: QueryStatus::Uninitialized,
            data: None,
            error: None,
            is_fetching: false,
            is_stale: false,
        }
    }
}

impl<D> QueryState<D> {
    /// First load with nothing to show yet.
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub fn is_uninitialized(&self) -> bool {
        self.status == QueryStatus::Uninitialized
    }
}
