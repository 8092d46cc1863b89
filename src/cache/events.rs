//! Mutation events.
//!
//! Every write dispatched against the backend is recorded as an event with
//! a process-local epoch so log lines can be correlated and ordered.

use std::fmt;

use libris_api_types::BookId;
use time::OffsetDateTime;
use uuid::Uuid;

use super::keys::Tag;

/// Monotonic epoch for ordering mutation events.
pub type Epoch = u64;

/// Write operations and the tags they invalidate on success.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mutation {
    CreateBook,
    UpdateBook { id: BookId },
    DeleteBook { id: BookId },
    BorrowBook { book: BookId },
}

impl Mutation {
    pub fn operation(&self) -> &'static str {
        match self {
            Mutation::CreateBook => "createBook",
            Mutation::UpdateBook { .. } => "updateBook",
            Mutation::DeleteBook { .. } => "deleteBook",
            Mutation::BorrowBook { .. } => "borrowBook",
        }
    }

    /// Fixed invalidation set applied after the server accepts the write.
    pub fn invalidates(&self) -> Vec<Tag> {
        match self {
            Mutation::CreateBook => vec![Tag::BOOK],
            Mutation::UpdateBook { id } => {
                vec![Tag::book(id.clone()), Tag::BOOK, Tag::BORROW_SUMMARY]
            }
            Mutation::DeleteBook { id } => {
                vec![Tag::book(id.clone()), Tag::BOOK, Tag::BORROW_SUMMARY]
            }
            Mutation::BorrowBook { book } => vec![
                Tag::book(book.clone()),
                Tag::BOOK,
                Tag::BORROW_RECORD,
                Tag::BORROW_SUMMARY,
            ],
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::CreateBook => f.write_str("createBook"),
            Mutation::UpdateBook { id } => write!(f, "updateBook({id})"),
            Mutation::DeleteBook { id } => write!(f, "deleteBook({id})"),
            Mutation::BorrowBook { book } => write!(f, "borrowBook({book})"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MutationEvent {
    /// Unique identifier (UUIDv4).
    pub id: Uuid,
    pub epoch: Epoch,
    pub mutation: Mutation,
    pub timestamp: OffsetDateTime,
}

impl MutationEvent {
    pub fn new(mutation: Mutation, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            mutation,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}
