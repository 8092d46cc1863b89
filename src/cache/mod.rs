//! Query cache and tag invalidation graph.
//!
//! - [`QueryCache`] holds one entry per distinct query, deduplicates
//!   in-flight requests and notifies subscribers through a watch channel.
//! - [`TagRegistry`] maps the tags a query provides back to its entry.
//! - [`MutationDispatcher`] runs writes and invalidates their fixed tag set
//!   once the server has accepted them.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! keep_unused_for_seconds = 60
//! sweep_interval_seconds = 30
//! ```

mod config;
mod dispatcher;
mod events;
mod keys;
mod lock;
mod query;
mod registry;
mod store;

pub use config::CacheConfig;
pub use dispatcher::MutationDispatcher;
pub use events::{Epoch, Mutation, MutationEvent};
pub use keys::{Tag, TagKind};
pub use query::{CacheQuery, FetchError, QueryFetcher, QueryState, QueryStatus};
pub use registry::TagRegistry;
pub use store::{InvalidationOutcome, QueryCache, Subscription, TagInvalidator};
