//! Invalidation tags.
//!
//! A `Tag` names a resource that cached queries provide and mutations
//! invalidate. Matching is exact: `Book:42` and `Book` are unrelated tags.

use std::fmt;

use libris_api_types::BookId;

/// Resource families known to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagKind {
    /// Books, either the whole catalog or one record when an id is attached.
    Book,
    /// Individual borrow records.
    BorrowRecord,
    /// The aggregated borrow summary.
    BorrowSummary,
}

impl TagKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TagKind::Book => "Book",
            TagKind::BorrowRecord => "BorrowRecord",
            TagKind::BorrowSummary => "BorrowSummary",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    pub kind: TagKind,
    pub id: Option<BookId>,
}

impl Tag {
    /// Tag covering a whole resource family.
    pub const fn kind(kind: TagKind) -> Self {
        Self { kind, id: None }
    }

    /// Tag for a single book record.
    pub fn book(id: BookId) -> Self {
        Self {
            kind: TagKind::Book,
            id: Some(id),
        }
    }

    pub const BOOK: Tag = Tag::kind(TagKind::Book);
    pub const BORROW_RECORD: Tag = Tag::kind(TagKind::BorrowRecord);
    pub const BORROW_SUMMARY: Tag = Tag::kind(TagKind::BorrowSummary);
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{id}", self.kind.as_str()),
            None => f.write_str(self.kind.as_str()),
        }
    }
}

/// Render a tag list for log fields, e.g. `[Book:42, Book]`.
pub(crate) fn display_tags(tags: &[Tag]) -> String {
    let rendered: Vec<String> = tags.iter().map(Tag::to_string).collect();
    format!("[{}]", rendered.join(", "))
}
