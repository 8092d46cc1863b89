use libris_api_types::{Book, BookId};

use crate::cache::{QueryState, Subscription};
use crate::library::{LibraryData, LibraryQuery, LibraryStore};

/// Single-book page.
pub struct BookDetail {
    book: Subscription<LibraryQuery>,
}

impl BookDetail {
    pub fn mount(store: &LibraryStore, id: BookId) -> Self {
        Self {
            book: store.book(id),
        }
    }

    pub fn state(&self) -> QueryState<LibraryData> {
        self.book.current()
    }

    pub async fn settled(&mut self) -> QueryState<LibraryData> {
        self.book.settled().await
    }

    pub fn book(&self) -> Option<Book> {
        self.state().data.as_ref().and_then(LibraryData::as_book).cloned()
    }

    /// Availability badge; `None` while the book has not loaded.
    pub fn is_available(&self) -> Option<bool> {
        self.book().map(|book| book.is_available())
    }
}
