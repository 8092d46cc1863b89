//! The library store: one query cache, one REST client and the mutation
//! dispatcher tying writes back to cached reads.

mod queries;

use std::sync::Arc;

use libris_api_types::{Book, BookId, BookListParams, BookPayload, BorrowPayload};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::api::{ApiClient, ApiError};
use crate::cache::{
    CacheConfig, InvalidationOutcome, Mutation, MutationDispatcher, QueryCache, Subscription, Tag,
};
use crate::config::Settings;

pub use queries::{LibraryData, LibraryQuery};

/// Explicitly constructed store shared by every view. Cloning is cheap and
/// keeps pointing at the same cache.
///
/// The store owns the cache's eviction sweeper. It is aborted once the last
/// clone of the store is dropped.
#[derive(Clone)]
pub struct LibraryStore {
    api: ApiClient,
    cache: QueryCache<LibraryQuery>,
    dispatcher: Arc<MutationDispatcher>,
    sweeper: Option<Arc<SweeperGuard>>,
}

struct SweeperGuard(JoinHandle<()>);

impl Drop for SweeperGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl LibraryStore {
    /// Must be called from within a tokio runtime for released entries to be
    /// evicted after `config.keep_unused_for`.
    pub fn new(api: ApiClient, config: CacheConfig) -> Self {
        let cache = QueryCache::new(Arc::new(api.clone()), config);
        let dispatcher = Arc::new(MutationDispatcher::new(Arc::new(cache.clone())));
        let sweeper = Self::start_sweeper(&cache);
        Self {
            api,
            cache,
            dispatcher,
            sweeper,
        }
    }

    fn start_sweeper(cache: &QueryCache<LibraryQuery>) -> Option<Arc<SweeperGuard>> {
        // Released entries are evicted inline when retention is zero.
        if cache.config().keep_unused_for.is_zero() {
            return None;
        }
        if Handle::try_current().is_err() {
            warn!(
                keep_unused_for_ms = cache.config().keep_unused_for.as_millis() as u64,
                "No tokio runtime; eviction sweeper not started"
            );
            return None;
        }
        Some(Arc::new(SweeperGuard(cache.spawn_eviction_sweeper())))
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ApiError> {
        let api = ApiClient::from_settings(&settings.api)?;
        Ok(Self::new(api, CacheConfig::from(&settings.cache)))
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &QueryCache<LibraryQuery> {
        &self.cache
    }

    pub fn list_books(&self, params: BookListParams) -> Subscription<LibraryQuery> {
        self.cache.subscribe(LibraryQuery::ListBooks(params))
    }

    pub fn book(&self, id: BookId) -> Subscription<LibraryQuery> {
        self.cache.subscribe(LibraryQuery::GetBook(id))
    }

    pub fn borrow_summary(&self) -> Subscription<LibraryQuery> {
        self.cache.subscribe(LibraryQuery::BorrowSummary)
    }

    pub async fn create_book(&self, payload: &BookPayload) -> Result<Book, ApiError> {
        self.dispatcher
            .dispatch(Mutation::CreateBook, self.api.create_book(payload))
            .await
    }

    pub async fn update_book(&self, id: &BookId, payload: &BookPayload) -> Result<Book, ApiError> {
        self.dispatcher
            .dispatch(
                Mutation::UpdateBook { id: id.clone() },
                self.api.update_book(id, payload),
            )
            .await
    }

    pub async fn delete_book(&self, id: &BookId) -> Result<(), ApiError> {
        self.dispatcher
            .dispatch(
                Mutation::DeleteBook { id: id.clone() },
                self.api.delete_book(id),
            )
            .await
    }

    pub async fn borrow_book(&self, payload: &BorrowPayload) -> Result<serde_json::Value, ApiError> {
        self.dispatcher
            .dispatch(
                Mutation::BorrowBook {
                    book: payload.book.clone(),
                },
                self.api.borrow_book(payload),
            )
            .await
    }

    pub fn invalidate(&self, tags: &[Tag]) -> InvalidationOutcome {
        self.cache.invalidate(tags)
    }

    pub fn sweeper_running(&self) -> bool {
        self.sweeper
            .as_ref()
            .is_some_and(|guard| !guard.0.is_finished())
    }
}
