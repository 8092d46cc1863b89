use async_trait::async_trait;
use libris_api_types::{Book, BookId, BookListParams, BookPage, BorrowSummaryEntry};

use crate::api::ApiClient;
use crate::cache::{CacheQuery, FetchError, QueryFetcher, Tag};

/// Read operations served through the query cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LibraryQuery {
    ListBooks(BookListParams),
    GetBook(BookId),
    BorrowSummary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryData {
    Books(BookPage),
    Book(Book),
    BorrowSummary(Vec<BorrowSummaryEntry>),
}

impl LibraryData {
    pub fn as_books(&self) -> Option<&BookPage> {
        match self {
            LibraryData::Books(page) => Some(page),
            _ => None,
        }
    }

    pub fn as_book(&self) -> Option<&Book> {
        match self {
            LibraryData::Book(book) => Some(book),
            _ => None,
        }
    }

    pub fn as_borrow_summary(&self) -> Option<&[BorrowSummaryEntry]> {
        match self {
            LibraryData::BorrowSummary(entries) => Some(entries),
            _ => None,
        }
    }
}

impl CacheQuery for LibraryQuery {
    type Data = LibraryData;

    fn operation(&self) -> &'static str {
        match self {
            LibraryQuery::ListBooks(_) => "listBooks",
            LibraryQuery::GetBook(_) => "getBook",
            LibraryQuery::BorrowSummary => "getBorrowSummary",
        }
    }

    fn provides(&self) -> Vec<Tag> {
        match self {
            LibraryQuery::ListBooks(_) => vec![Tag::BOOK],
            LibraryQuery::GetBook(id) => vec![Tag::book(id.clone())],
            LibraryQuery::BorrowSummary => vec![Tag::BORROW_SUMMARY],
        }
    }
}

#[async_trait]
impl QueryFetcher<LibraryQuery> for ApiClient {
    async fn fetch(&self, query: &LibraryQuery) -> Result<LibraryData, FetchError> {
        let data = match query {
            LibraryQuery::ListBooks(params) => self.list_books(params).await.map(LibraryData::Books),
            LibraryQuery::GetBook(id) => self.get_book(id).await.map(LibraryData::Book),
            LibraryQuery::BorrowSummary => self
                .borrow_summary()
                .await
                .map(LibraryData::BorrowSummary),
        };
        data.map_err(FetchError::from)
    }
}
