use serde::{Deserialize, Serialize};
use time::Date;

use crate::BookId;

time::serde::format_description!(due_date_format, Date, "[year]-[month]-[day]");

/// Body of `POST /borrow`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowPayload {
    pub book: BookId,
    pub quantity: u32,
    #[serde(with = "due_date_format")]
    pub due_date: Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowedBook {
    pub title: String,
    pub isbn: String,
}

/// One row of `GET /borrow`, aggregated per book by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowSummaryEntry {
    pub book: BorrowedBook,
    pub total_quantity: u32,
    #[serde(default)]
    pub due_dates: Vec<String>,
}
