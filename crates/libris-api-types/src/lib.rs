//! Wire types shared between the library-management REST API and its clients.
//!
//! Field names follow the server's JSON (camelCase, `_id` for identifiers);
//! Rust-side names stay snake_case.

mod books;
mod borrow;
mod envelope;

pub use books::{
    Book, BookId, BookListParams, BookPage, BookPayload, Genre, GenreFilter, PageMeta,
    StatusFilter,
};
pub use borrow::{BorrowPayload, BorrowSummaryEntry, BorrowedBook};
pub use envelope::{Envelope, ErrorBody};
