//! Catalog browsing: filter state, the paginated book list and the home
//! page preview.

use libris_api_types::{Book, BookListParams, GenreFilter, StatusFilter};

use super::notice::Notice;
use crate::cache::{QueryState, Subscription};
use crate::library::{LibraryData, LibraryQuery, LibraryStore};

/// Page sizes offered by the catalog.
pub const PAGE_SIZES: [u32; 4] = [5, 10, 20, 30];
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const HOME_PREVIEW_LIMIT: u32 = 5;

/// Filter state owned by the catalog view.
///
/// Changing the page size, search or either filter returns to page 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogFilters {
    page: u32,
    limit: u32,
    search: String,
    genre: GenreFilter,
    status: StatusFilter,
}

impl Default for CatalogFilters {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            search: String::new(),
            genre: GenreFilter::All,
            status: StatusFilter::All,
        }
    }
}

impl CatalogFilters {
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn genre(&self) -> GenreFilter {
        self.genre
    }

    pub fn status(&self) -> StatusFilter {
        self.status
    }

    /// Request parameters for the current filters. A blank search is omitted.
    pub fn params(&self) -> BookListParams {
        let search = self.search.trim();
        BookListParams {
            page: Some(self.page),
            limit: Some(self.limit),
            search: (!search.is_empty()).then(|| search.to_string()),
            genre: Some(self.genre),
            status: Some(self.status),
        }
    }

    /// Returns whether the filters changed.
    pub fn set_limit(&mut self, limit: u32) -> bool {
        if limit == 0 || limit == self.limit {
            return false;
        }
        self.limit = limit;
        self.page = 1;
        true
    }

    pub fn set_search(&mut self, search: impl Into<String>) -> bool {
        let search = search.into();
        if search == self.search {
            return false;
        }
        self.search = search;
        self.page = 1;
        true
    }

    pub fn set_genre(&mut self, genre: GenreFilter) -> bool {
        if genre == self.genre {
            return false;
        }
        self.genre = genre;
        self.page = 1;
        true
    }

    pub fn set_status(&mut self, status: StatusFilter) -> bool {
        if status == self.status {
            return false;
        }
        self.status = status;
        self.page = 1;
        true
    }

    /// Move to `page` if it lies within `1..=total_pages`.
    pub fn go_to_page(&mut self, page: u32, total_pages: u32) -> bool {
        if page == self.page || page < 1 || page > total_pages.max(1) {
            return false;
        }
        self.page = page;
        true
    }
}

/// Parameters of the home page preview: the first few books, unfiltered.
pub fn home_preview_params() -> BookListParams {
    BookListParams {
        limit: Some(HOME_PREVIEW_LIMIT),
        ..Default::default()
    }
}

/// Paginated, filterable book list bound to the store.
pub struct CatalogView {
    store: LibraryStore,
    filters: CatalogFilters,
    books: Subscription<LibraryQuery>,
}

impl CatalogView {
    pub fn mount(store: &LibraryStore, filters: CatalogFilters) -> Self {
        let books = store.list_books(filters.params());
        Self {
            store: store.clone(),
            filters,
            books,
        }
    }

    pub fn filters(&self) -> &CatalogFilters {
        &self.filters
    }

    pub fn state(&self) -> QueryState<LibraryData> {
        self.books.current()
    }

    pub async fn settled(&mut self) -> QueryState<LibraryData> {
        self.books.settled().await
    }

    /// Wait for the next change of the list entry.
    pub async fn changed(&mut self) -> Option<QueryState<LibraryData>> {
        self.books.changed().await
    }

    pub fn books(&self) -> Vec<Book> {
        self.state()
            .data
            .as_ref()
            .and_then(LibraryData::as_books)
            .map(|page| page.data.clone())
            .unwrap_or_default()
    }

    pub fn total_pages(&self) -> u32 {
        self.state()
            .data
            .as_ref()
            .and_then(LibraryData::as_books)
            .map(|page| page.total_pages())
            .unwrap_or(1)
    }

    pub fn set_page(&mut self, page: u32) -> bool {
        let total_pages = self.total_pages();
        let changed = self.filters.go_to_page(page, total_pages);
        if changed {
            self.resubscribe();
        }
        changed
    }

    pub fn set_limit(&mut self, limit: u32) -> bool {
        let changed = self.filters.set_limit(limit);
        if changed {
            self.resubscribe();
        }
        changed
    }

    pub fn set_search(&mut self, search: impl Into<String>) -> bool {
        let changed = self.filters.set_search(search);
        if changed {
            self.resubscribe();
        }
        changed
    }

    pub fn set_genre(&mut self, genre: GenreFilter) -> bool {
        let changed = self.filters.set_genre(genre);
        if changed {
            self.resubscribe();
        }
        changed
    }

    pub fn set_status(&mut self, status: StatusFilter) -> bool {
        let changed = self.filters.set_status(status);
        if changed {
            self.resubscribe();
        }
        changed
    }

    /// Retry after a failed load.
    pub fn retry(&self) -> bool {
        self.books.refetch()
    }

    pub async fn delete_book(&self, book: &Book) -> Notice {
        match self.store.delete_book(&book.id).await {
            Ok(()) => Notice::success(format!(
                "\"{}\" has been successfully deleted.",
                book.title
            )),
            Err(err) => Notice::error(err.user_message("Failed to delete book")),
        }
    }

    fn resubscribe(&mut self) {
        // The new subscription is taken before the old one drops, so an
        // unchanged key never loses its last subscriber in between.
        self.books = self.store.list_books(self.filters.params());
    }
}

/// The home page's short book list.
pub struct HomePreview {
    books: Subscription<LibraryQuery>,
}

impl HomePreview {
    pub fn mount(store: &LibraryStore) -> Self {
        Self {
            books: store.list_books(home_preview_params()),
        }
    }

    pub fn state(&self) -> QueryState<LibraryData> {
        self.books.current()
    }

    pub async fn settled(&mut self) -> QueryState<LibraryData> {
        self.books.settled().await
    }

    pub fn books(&self) -> Vec<Book> {
        self.state()
            .data
            .as_ref()
            .and_then(LibraryData::as_books)
            .map(|page| page.data.clone())
            .unwrap_or_default()
    }
}
