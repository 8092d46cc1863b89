use thiserror::Error;

use crate::cache::FetchError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("base URL `{0}` cannot be used for API paths")]
    InvalidBase(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server responded with status {status}")]
    Server { status: u16, message: Option<String> },
    #[error("failed to parse body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn server(status: u16, message: Option<String>) -> Self {
        Self::Server { status, message }
    }

    /// Message sent by the server in the error body, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Server {
                message: Some(message),
                ..
            } => Some(message.as_str()),
            _ => None,
        }
    }

    /// Server message when present, `fallback` otherwise.
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }
}

impl From<ApiError> for FetchError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Server { status, message } => FetchError::Server { status, message },
            ApiError::Decode(err) => FetchError::Decode(err.to_string()),
            other => FetchError::Transport(other.to_string()),
        }
    }
}
