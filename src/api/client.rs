use libris_api_types::{
    Book, BookId, BookListParams, BookPage, BookPayload, BorrowPayload, BorrowSummaryEntry,
    Envelope, ErrorBody,
};
use reqwest::{Client, Method, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::ApiError;
use crate::config::ApiSettings;

/// Thin typed wrapper over the REST endpoints. Cloning shares the connection pool.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_user_agent(base_url, Self::user_agent())
    }

    pub fn with_user_agent(base_url: &str, user_agent: &str) -> Result<Self, ApiError> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidBase(base_url.to_string()));
        }
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client, base })
    }

    pub fn from_settings(settings: &ApiSettings) -> Result<Self, ApiError> {
        let user_agent = settings
            .user_agent
            .as_deref()
            .unwrap_or(Self::user_agent());
        Self::with_user_agent(settings.base_url.as_str(), user_agent)
    }

    pub fn user_agent() -> &'static str {
        concat!("libris/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve path segments below the base URL, percent-encoding each one.
    pub fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBase(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        let mut url = self.url(segments)?;
        if !query.is_empty() {
            let mut qp = url.query_pairs_mut();
            for (k, v) in query {
                qp.append_pair(k, v);
            }
        }

        debug!(%method, %url, "Sending API request");
        let mut req = self.client.request(method, url);
        if let Some(b) = body {
            req = req.json(b);
        }
        Ok(req.send().await?)
    }

    async fn request<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let resp = self.send(method, segments, query, body).await?;
        Self::handle(resp).await
    }

    async fn request_unit<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<(), ApiError> {
        let resp = self.send(method, segments, &[], body).await?;
        Self::check(resp).await.map(|_| ())
    }

    async fn check(resp: Response) -> Result<bytes::Bytes, ApiError> {
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .ok()
                .and_then(ErrorBody::into_message);
            return Err(ApiError::server(status.as_u16(), message));
        }
        Ok(bytes)
    }

    async fn handle<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
        let bytes = Self::check(resp).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// `GET books` with the set filters as query parameters.
    pub async fn list_books(&self, params: &BookListParams) -> Result<BookPage, ApiError> {
        self.request::<_, ()>(Method::GET, &["books"], &params.query_pairs(), None)
            .await
    }

    pub async fn get_book(&self, id: &BookId) -> Result<Book, ApiError> {
        self.request::<Envelope<Book>, ()>(Method::GET, &["books", id.as_str()], &[], None)
            .await
            .map(Envelope::into_inner)
    }

    pub async fn create_book(&self, payload: &BookPayload) -> Result<Book, ApiError> {
        self.request::<Envelope<Book>, _>(Method::POST, &["books"], &[], Some(payload))
            .await
            .map(Envelope::into_inner)
    }

    pub async fn update_book(&self, id: &BookId, payload: &BookPayload) -> Result<Book, ApiError> {
        self.request::<Envelope<Book>, _>(
            Method::PUT,
            &["books", id.as_str()],
            &[],
            Some(payload),
        )
        .await
        .map(Envelope::into_inner)
    }

    pub async fn delete_book(&self, id: &BookId) -> Result<(), ApiError> {
        self.request_unit::<()>(Method::DELETE, &["books", id.as_str()], None)
            .await
    }

    /// `POST borrow`. The created record is returned as-is; nothing reads it.
    pub async fn borrow_book(&self, payload: &BorrowPayload) -> Result<serde_json::Value, ApiError> {
        let resp = self
            .send(Method::POST, &["borrow"], &[], Some(payload))
            .await?;
        let bytes = Self::check(resp).await?;
        if bytes.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        let body: Envelope<serde_json::Value> = serde_json::from_slice(&bytes)?;
        Ok(body.into_inner())
    }

    pub async fn borrow_summary(&self) -> Result<Vec<BorrowSummaryEntry>, ApiError> {
        self.request::<Envelope<Vec<BorrowSummaryEntry>>, ()>(Method::GET, &["borrow"], &[], None)
            .await
            .map(Envelope::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;
    use libris_api_types::{Genre, GenreFilter, StatusFilter};
    use serde_json::json;
    use time::macros::date;

    use super::*;

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.base_url()).expect("client")
    }

    fn book_json(id: &str, title: &str, copies: u32) -> serde_json::Value {
        json!({
            "_id": id,
            "title": title,
            "author": "Author",
            "genre": "SCIENCE",
            "isbn": format!("isbn-{id}"),
            "copies": copies,
            "available": copies > 0
        })
    }

    #[test]
    fn url_keeps_base_path_and_encodes_segments() -> Result<(), ApiError> {
        let client = ApiClient::new("http://127.0.0.1:5000/api/")?;
        assert_eq!(
            client.url(&["books", "a/b"])?.as_str(),
            "http://127.0.0.1:5000/api/books/a%2Fb"
        );

        let bare = ApiClient::new("http://127.0.0.1:5000/api")?;
        assert_eq!(bare.url(&["borrow"])?.as_str(), "http://127.0.0.1:5000/api/borrow");
        Ok(())
    }

    #[test]
    fn rejects_non_hierarchical_base() {
        let err = ApiClient::new("mailto:library@example.com").expect_err("no base");
        assert!(matches!(err, ApiError::InvalidBase(_)));
    }

    #[tokio::test]
    async fn list_books_sends_filters_as_query() -> Result<(), ApiError> {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("GET")
                .path("/books")
                .query_param("page", "2")
                .query_param("limit", "10")
                .query_param("genre", "all")
                .query_param("status", "available");
            then.status(200).json_body(json!({
                "data": [book_json("1", "Cosmos", 2)],
                "meta": {"totalPages": 3, "currentPage": 2, "totalItems": 21}
            }));
        });

        let page = client(&server)
            .list_books(&BookListParams {
                page: Some(2),
                limit: Some(10),
                genre: Some(GenreFilter::All),
                status: Some(StatusFilter::Available),
                search: None,
            })
            .await?;

        mock.assert();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].genre, Genre::Science);
        assert_eq!(page.total_pages(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn get_book_unwraps_data_envelope() -> Result<(), ApiError> {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("GET").path("/books/66a1");
            then.status(200)
                .json_body(json!({"success": true, "data": book_json("66a1", "Dune", 0)}));
        });

        let book = client(&server).get_book(&BookId::new("66a1")).await?;
        mock.assert();
        assert_eq!(book.title, "Dune");
        assert!(!book.is_available());
        Ok(())
    }

    #[tokio::test]
    async fn update_book_puts_payload() -> Result<(), ApiError> {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("PUT")
                .path("/books/7")
                .json_body_includes(r#"{"title":"Cosmos","copies":4}"#);
            then.status(200).json_body(book_json("7", "Cosmos", 4));
        });

        let payload = BookPayload {
            title: "Cosmos".into(),
            author: "Carl Sagan".into(),
            genre: Genre::Science,
            isbn: "isbn-7".into(),
            description: None,
            copies: 4,
            available: true,
        };
        let book = client(&server)
            .update_book(&BookId::new("7"), &payload)
            .await?;
        mock.assert();
        assert_eq!(book.copies, 4);
        Ok(())
    }

    #[tokio::test]
    async fn delete_book_accepts_empty_body() -> Result<(), ApiError> {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("DELETE").path("/books/3");
            then.status(204);
        });

        client(&server).delete_book(&BookId::new("3")).await?;
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn borrow_posts_calendar_due_date() -> Result<(), ApiError> {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("POST")
                .path("/borrow")
                .json_body(json!({"book": "9", "quantity": 2, "dueDate": "2026-11-01"}));
            then.status(201)
                .json_body(json!({"data": {"_id": "r1", "quantity": 2}}));
        });

        let created = client(&server)
            .borrow_book(&BorrowPayload {
                book: BookId::new("9"),
                quantity: 2,
                due_date: date!(2026 - 11 - 01),
            })
            .await?;
        mock.assert();
        assert_eq!(created["_id"], "r1");
        Ok(())
    }

    #[tokio::test]
    async fn server_message_is_extracted_from_error_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("POST").path("/borrow");
            then.status(400)
                .json_body(json!({"message": "Not enough copies available", "success": false}));
        });

        let err = client(&server)
            .borrow_book(&BorrowPayload {
                book: BookId::new("9"),
                quantity: 5,
                due_date: date!(2026 - 11 - 01),
            })
            .await
            .expect_err("rejected borrow");

        assert!(matches!(err, ApiError::Server { status: 400, .. }));
        assert_eq!(err.server_message(), Some("Not enough copies available"));
    }

    #[tokio::test]
    async fn unreadable_error_body_has_no_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/borrow");
            then.status(502).body("<html>bad gateway</html>");
        });

        let err = client(&server)
            .borrow_summary()
            .await
            .expect_err("gateway failure");
        assert_eq!(err.server_message(), None);
        assert_eq!(err.user_message("Something went wrong."), "Something went wrong.");
    }

    #[tokio::test]
    async fn malformed_success_body_is_a_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/books");
            then.status(200).body("not json");
        });

        let err = client(&server)
            .list_books(&BookListParams::default())
            .await
            .expect_err("bad body");
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
