//! Borrow workflow: `Closed → Open → Submitting → Closed`, falling back to
//! `Open` with the error attached when validation or the server rejects it.

use std::mem;

use libris_api_types::{Book, BookId, BorrowPayload};
use thiserror::Error;
use time::Date;
use tracing::debug;

use super::notice::Notice;
use crate::api::ApiError;
use crate::domain::FieldErrors;
use crate::domain::dates::default_due_date;
use crate::library::LibraryStore;

/// Form contents while the borrow modal is shown. `copies` is captured when
/// the modal opens and bounds the quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowDraft {
    pub book_id: BookId,
    pub title: String,
    pub copies: u32,
    pub quantity: String,
    pub due_date: Date,
    pub errors: FieldErrors,
    pub server_error: Option<String>,
}

impl BorrowDraft {
    fn new(book: &Book, today: Date) -> Self {
        Self {
            book_id: book.id.clone(),
            title: book.title.clone(),
            copies: book.copies,
            quantity: "1".to_string(),
            due_date: default_due_date(today),
            errors: FieldErrors::new(),
            server_error: None,
        }
    }

    fn validate(&self, today: Date) -> Result<BorrowPayload, FieldErrors> {
        let mut errors = FieldErrors::new();

        let quantity = match self.quantity.trim().parse::<i64>() {
            Ok(quantity) if quantity < 1 => {
                errors.add("quantity", "At least 1 book must be borrowed");
                0
            }
            Ok(quantity) => match u32::try_from(quantity) {
                Ok(quantity) if quantity <= self.copies => quantity,
                _ => {
                    errors.add("quantity", format!("Only {} copies available", self.copies));
                    0
                }
            },
            Err(_) => {
                errors.add("quantity", "Quantity must be a whole number");
                0
            }
        };

        if self.due_date <= today {
            errors.add("dueDate", "Due date must be in the future");
        }

        errors.into_result(BorrowPayload {
            book: self.book_id.clone(),
            quantity,
            due_date: self.due_date,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BorrowState {
    #[default]
    Closed,
    Open(BorrowDraft),
    Submitting(BorrowDraft),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BorrowError {
    #[error("borrow form is not open")]
    NotOpen,
    #[error("invalid borrow request: {0}")]
    Invalid(FieldErrors),
}

/// A validated borrow request handed out by [`BorrowModal::begin_submit`].
///
/// It carries the book title so the outcome can be reported even if the
/// modal was closed or reopened while the request was in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowSubmission {
    pub payload: BorrowPayload,
    pub title: String,
    seq: u64,
}

#[derive(Debug, Default)]
pub struct BorrowModal {
    state: BorrowState,
    next_seq: u64,
    pending: Option<u64>,
}

impl BorrowModal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &BorrowState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, BorrowState::Closed)
    }

    pub fn draft(&self) -> Option<&BorrowDraft> {
        match &self.state {
            BorrowState::Closed => None,
            BorrowState::Open(draft) | BorrowState::Submitting(draft) => Some(draft),
        }
    }

    /// Open for `book`. Ignored unless the modal is closed.
    pub fn open(&mut self, book: &Book, today: Date) -> bool {
        if self.is_open() {
            return false;
        }
        self.state = BorrowState::Open(BorrowDraft::new(book, today));
        true
    }

    /// Close without submitting. A request already in flight still settles.
    pub fn close(&mut self) {
        self.state = BorrowState::Closed;
        self.pending = None;
    }

    pub fn set_quantity(&mut self, quantity: impl Into<String>) -> bool {
        match self.draft_mut() {
            Some(draft) => {
                draft.quantity = quantity.into();
                true
            }
            None => false,
        }
    }

    pub fn set_due_date(&mut self, due_date: Date) -> bool {
        match self.draft_mut() {
            Some(draft) => {
                draft.due_date = due_date;
                true
            }
            None => false,
        }
    }

    fn draft_mut(&mut self) -> Option<&mut BorrowDraft> {
        match &mut self.state {
            BorrowState::Open(draft) => Some(draft),
            BorrowState::Closed | BorrowState::Submitting(_) => None,
        }
    }

    /// Validate the open draft and move to `Submitting`. On failure the modal
    /// stays open with the field errors attached.
    pub fn begin_submit(&mut self, today: Date) -> Result<BorrowSubmission, BorrowError> {
        if !matches!(self.state, BorrowState::Open(_)) {
            return Err(BorrowError::NotOpen);
        }
        let BorrowState::Open(mut draft) = mem::take(&mut self.state) else {
            return Err(BorrowError::NotOpen);
        };

        draft.server_error = None;
        match draft.validate(today) {
            Ok(payload) => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.pending = Some(seq);

                draft.errors = FieldErrors::new();
                let submission = BorrowSubmission {
                    payload,
                    title: draft.title.clone(),
                    seq,
                };
                self.state = BorrowState::Submitting(draft);
                Ok(submission)
            }
            Err(errors) => {
                draft.errors = errors.clone();
                self.state = BorrowState::Open(draft);
                Err(BorrowError::Invalid(errors))
            }
        }
    }

    /// Apply the outcome of `submission`. The modal only changes state if it
    /// is still waiting on that submission.
    pub fn finish(
        &mut self,
        submission: &BorrowSubmission,
        result: Result<serde_json::Value, ApiError>,
    ) -> Notice {
        let current = self.pending == Some(submission.seq)
            && matches!(self.state, BorrowState::Submitting(_));
        if current {
            self.pending = None;
        } else {
            debug!(
                book = %submission.payload.book,
                "Borrow settled after its modal moved on"
            );
        }

        match result {
            Ok(_) => {
                if current {
                    self.state = BorrowState::Closed;
                }
                Notice::success(format!(
                    "\"{}\" has been successfully borrowed.",
                    submission.title
                ))
            }
            Err(err) => {
                let message = err.user_message("Failed to borrow book.");
                if current && let BorrowState::Submitting(mut draft) = mem::take(&mut self.state) {
                    draft.server_error = Some(message.clone());
                    self.state = BorrowState::Open(draft);
                }
                Notice::error(message)
            }
        }
    }

    /// Validate, send and settle in one step.
    pub async fn submit(&mut self, store: &LibraryStore, today: Date) -> Result<Notice, BorrowError> {
        let submission = self.begin_submit(today)?;
        debug!(
            book = %submission.payload.book,
            quantity = submission.payload.quantity,
            "Submitting borrow"
        );
        let result = store.borrow_book(&submission.payload).await;
        Ok(self.finish(&submission, result))
    }
}
