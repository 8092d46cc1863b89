use httpmock::MockServer;
use libris::cache::{CacheConfig, QueryStatus, Tag};
use libris::library::{LibraryQuery, LibraryStore};
use libris::types::{BookId, BookListParams, Genre};
use libris::views::{BookForm, CatalogFilters, CatalogView};
use libris::{ApiClient, ApiError};
use serde_json::{Value, json};

fn store(server: &MockServer) -> Result<LibraryStore, ApiError> {
    let api = ApiClient::new(&server.base_url())?;
    Ok(LibraryStore::new(api, CacheConfig::default()))
}

fn book_json(id: &str, title: &str, copies: u32) -> Value {
    json!({
        "_id": id,
        "title": title,
        "author": "Author",
        "genre": "FICTION",
        "isbn": format!("isbn-{id}"),
        "copies": copies,
        "available": copies > 0
    })
}

fn page_json(ids: std::ops::Range<u32>, total_pages: u32) -> Value {
    let data: Vec<Value> = ids
        .map(|id| book_json(&id.to_string(), &format!("Book {id}"), 2))
        .collect();
    let total_items = data.len();
    json!({
        "data": data,
        "meta": {"totalPages": total_pages, "currentPage": 1, "totalItems": total_items}
    })
}

#[tokio::test]
async fn concurrent_equal_queries_share_one_request() -> Result<(), ApiError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/books").query_param("page", "1");
        then.status(200).json_body(page_json(0..3, 1));
    });

    let store = store(&server)?;
    let mut first = store.list_books(CatalogFilters::default().params());
    let second = store.list_books(CatalogFilters::default().params());

    let state = first.settled().await;
    assert_eq!(state.status, QueryStatus::Success);
    assert_eq!(second.current().data, state.data);
    assert_eq!(
        store
            .cache()
            .subscriber_count(&LibraryQuery::ListBooks(CatalogFilters::default().params())),
        2
    );
    mock.assert_calls(1);
    Ok(())
}

#[tokio::test]
async fn returning_to_a_cached_page_issues_no_request() -> Result<(), ApiError> {
    let server = MockServer::start();
    let page_one = server.mock(|when, then| {
        when.method("GET").path("/books").query_param("page", "1");
        then.status(200).json_body(page_json(0..10, 2));
    });
    let page_two = server.mock(|when, then| {
        when.method("GET").path("/books").query_param("page", "2");
        then.status(200).json_body(page_json(10..12, 2));
    });

    let store = store(&server)?;
    let mut view = CatalogView::mount(&store, CatalogFilters::default());
    view.settled().await;
    assert_eq!(view.total_pages(), 2);

    assert!(view.set_page(2));
    view.settled().await;
    assert_eq!(view.books().len(), 2);

    assert!(view.set_page(1));
    let state = view.state();
    assert!(state.is_success());
    assert!(!state.is_fetching);
    assert_eq!(view.books().len(), 10);

    assert!(!view.set_page(3));
    page_one.assert_calls(1);
    page_two.assert_calls(1);
    Ok(())
}

#[tokio::test]
async fn create_book_refetches_lists_but_not_other_books() -> Result<(), ApiError> {
    let server = MockServer::start();
    let list = server.mock(|when, then| {
        when.method("GET").path("/books");
        then.status(200).json_body(page_json(0..3, 1));
    });
    let detail = server.mock(|when, then| {
        when.method("GET").path("/books/b9");
        then.status(200).json_body(json!({"data": book_json("b9", "Other", 1)}));
    });
    let create = server.mock(|when, then| {
        when.method("POST")
            .path("/books")
            .json_body_includes(r#"{"title":"Neuromancer","genre":"FICTION","copies":1}"#);
        then.status(201).json_body(book_json("b10", "Neuromancer", 1));
    });

    let store = store(&server)?;
    let mut catalog = CatalogView::mount(&store, CatalogFilters::default());
    let mut other = store.book(BookId::new("b9"));
    catalog.settled().await;
    other.settled().await;

    let mut form = BookForm::create();
    form.title = "Neuromancer".into();
    form.author = "William Gibson".into();
    form.isbn = "9780441569595".into();

    let notice = form.submit(&store).await.expect("form is valid");
    assert!(notice.is_success());
    assert_eq!(notice.message, "\"Neuromancer\" has been added to the library.");

    assert!(other.current().is_success());
    assert!(!other.current().is_fetching);
    catalog.settled().await;

    create.assert();
    list.assert_calls(2);
    detail.assert_calls(1);
    Ok(())
}

#[tokio::test]
async fn update_book_refetches_every_mounted_provider() -> Result<(), ApiError> {
    let server = MockServer::start();
    let list = server.mock(|when, then| {
        when.method("GET").path("/books");
        then.status(200).json_body(page_json(0..3, 1));
    });
    let edited = server.mock(|when, then| {
        when.method("GET").path("/books/7");
        then.status(200).json_body(json!({"data": book_json("7", "Dune", 3)}));
    });
    let untouched = server.mock(|when, then| {
        when.method("GET").path("/books/8");
        then.status(200).json_body(json!({"data": book_json("8", "Emma", 1)}));
    });
    let summary = server.mock(|when, then| {
        when.method("GET").path("/borrow");
        then.status(200).json_body(json!({"data": []}));
    });
    let update = server.mock(|when, then| {
        when.method("PUT").path("/books/7");
        then.status(200).json_body(json!({"data": book_json("7", "Dune Messiah", 3)}));
    });

    let store = store(&server)?;
    let mut books = store.list_books(BookListParams::default());
    let mut book = store.book(BookId::new("7"));
    let mut other = store.book(BookId::new("8"));
    let mut borrowed = store.borrow_summary();
    books.settled().await;
    book.settled().await;
    other.settled().await;
    borrowed.settled().await;

    let Some(current) = book.current().data.and_then(|data| data.as_book().cloned()) else {
        panic!("book should have loaded");
    };
    let mut form = BookForm::edit(&current);
    form.title = "Dune Messiah".into();
    let notice = form.submit(&store).await.expect("form is valid");
    assert_eq!(notice.message, "\"Dune Messiah\" has been updated in the library.");

    assert!(!other.current().is_fetching);
    books.settled().await;
    book.settled().await;
    borrowed.settled().await;

    update.assert();
    list.assert_calls(2);
    edited.assert_calls(2);
    summary.assert_calls(2);
    untouched.assert_calls(1);
    Ok(())
}

#[tokio::test]
async fn delete_refetches_list_and_marks_unmounted_detail_stale() -> Result<(), ApiError> {
    let server = MockServer::start();
    let mut list = server.mock(|when, then| {
        when.method("GET").path("/books");
        then.status(200).json_body(page_json(0..10, 1));
    });
    let detail = server.mock(|when, then| {
        when.method("GET").path("/books/4");
        then.status(200).json_body(json!({"data": book_json("4", "Book 4", 2)}));
    });
    let delete = server.mock(|when, then| {
        when.method("DELETE").path("/books/4");
        then.status(200).json_body(json!({"success": true}));
    });

    let store = store(&server)?;
    let mut catalog = CatalogView::mount(&store, CatalogFilters::default());
    catalog.settled().await;
    assert_eq!(catalog.books().len(), 10);

    let deleted = {
        let mut detail_view = store.book(BookId::new("4"));
        detail_view.settled().await;
        detail_view
            .current()
            .data
            .and_then(|data| data.as_book().cloned())
    };
    let Some(deleted) = deleted else {
        panic!("detail should have loaded");
    };

    list.assert_calls(1);
    list.delete();
    let list = server.mock(|when, then| {
        when.method("GET").path("/books");
        then.status(200).json_body(page_json(0..9, 1));
    });

    let notice = catalog.delete_book(&deleted).await;
    assert!(notice.is_success());
    assert_eq!(notice.message, "\"Book 4\" has been successfully deleted.");

    catalog.settled().await;
    assert_eq!(catalog.books().len(), 9);

    let detail_state = store.cache().snapshot(&LibraryQuery::GetBook(BookId::new("4")));
    assert!(detail_state.is_stale);
    assert!(!detail_state.is_fetching);

    delete.assert();
    list.assert_calls(1);
    detail.assert_calls(1);
    Ok(())
}

#[tokio::test]
async fn failed_delete_leaves_cache_untouched() -> Result<(), ApiError> {
    let server = MockServer::start();
    let list = server.mock(|when, then| {
        when.method("GET").path("/books");
        then.status(200).json_body(page_json(0..2, 1));
    });
    server.mock(|when, then| {
        when.method("DELETE").path("/books/1");
        then.status(404).json_body(json!({"message": "Book not found"}));
    });

    let store = store(&server)?;
    let mut catalog = CatalogView::mount(&store, CatalogFilters::default());
    catalog.settled().await;
    let books = catalog.books();

    let notice = catalog.delete_book(&books[1]).await;
    assert!(!notice.is_success());
    assert_eq!(notice.message, "Book not found");
    assert!(!catalog.state().is_fetching);
    assert!(!catalog.state().is_stale);
    list.assert_calls(1);
    Ok(())
}

#[tokio::test]
async fn invalidating_unmatched_tags_is_a_noop() -> Result<(), ApiError> {
    let server = MockServer::start();
    let list = server.mock(|when, then| {
        when.method("GET").path("/books");
        then.status(200).json_body(page_json(0..2, 1));
    });

    let store = store(&server)?;
    let mut books = store.list_books(BookListParams::default());
    books.settled().await;

    let outcome = store.invalidate(&[Tag::book(BookId::new("missing")), Tag::BORROW_RECORD]);
    assert!(outcome.is_noop());
    assert_eq!(outcome.refetched, 0);
    assert!(!books.current().is_fetching);
    list.assert_calls(1);
    Ok(())
}

#[tokio::test]
async fn failed_read_is_retried_only_on_request() -> Result<(), ApiError> {
    let server = MockServer::start();
    let mut failing = server.mock(|when, then| {
        when.method("GET").path("/books");
        then.status(500).json_body(json!({"message": "database offline"}));
    });

    let store = store(&server)?;
    let mut catalog = CatalogView::mount(&store, CatalogFilters::default());
    let state = catalog.settled().await;
    assert!(state.is_error());
    assert!(state.data.is_none());
    failing.assert_calls(1);
    failing.delete();

    let recovered = server.mock(|when, then| {
        when.method("GET").path("/books");
        then.status(200).json_body(page_json(0..1, 1));
    });
    assert!(catalog.retry());
    let state = catalog.settled().await;
    assert!(state.is_success());
    recovered.assert_calls(1);
    Ok(())
}

#[tokio::test]
async fn genre_filter_is_a_distinct_entry() -> Result<(), ApiError> {
    let server = MockServer::start();
    let all = server.mock(|when, then| {
        when.method("GET").path("/books").query_param("genre", "all");
        then.status(200).json_body(page_json(0..4, 1));
    });
    let fantasy = server.mock(|when, then| {
        when.method("GET")
            .path("/books")
            .query_param("genre", "FANTASY");
        then.status(200).json_body(page_json(0..1, 1));
    });

    let store = store(&server)?;
    let mut catalog = CatalogView::mount(&store, CatalogFilters::default());
    catalog.settled().await;

    assert!(catalog.set_genre(libris::types::GenreFilter::Only(Genre::Fantasy)));
    catalog.settled().await;
    assert_eq!(catalog.books().len(), 1);
    assert_eq!(catalog.filters().page(), 1);

    all.assert_calls(1);
    fantasy.assert_calls(1);
    Ok(())
}
