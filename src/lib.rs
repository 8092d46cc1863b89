//! Client-side catalog layer for a library-management REST API: a
//! deduplicating query cache, tag-based invalidation driven by mutations, and
//! the view state that sits on top of them.

pub mod api;
pub mod cache;
pub mod config;
pub mod domain;
pub mod library;
pub mod telemetry;
pub mod views;

pub use api::{ApiClient, ApiError};
pub use library::{LibraryData, LibraryQuery, LibraryStore};
pub use libris_api_types as types;
