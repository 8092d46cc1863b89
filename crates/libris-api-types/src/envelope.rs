use serde::{Deserialize, Serialize};

/// Response body that may or may not be wrapped in `{ "data": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(value) => value,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct NestedMessage {
    #[serde(default)]
    message: Option<String>,
}

/// Error body of a rejected request: `{ "message" }` or `{ "data": { "message" } }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<NestedMessage>,
}

impl ErrorBody {
    /// The server-provided message, if any non-blank one was sent.
    pub fn into_message(self) -> Option<String> {
        self.message
            .or_else(|| self.data.and_then(|data| data.message))
            .map(|message| message.trim().to_string())
            .filter(|message| !message.is_empty())
    }
}
