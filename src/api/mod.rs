//! REST client for the library-management backend.

mod client;
mod error;

pub use client::ApiClient;
pub use error::ApiError;
