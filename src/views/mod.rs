//! View-side state: filters, forms and the borrow workflow, bound to the
//! store through query subscriptions.

pub mod book_form;
pub mod borrow;
pub mod catalog;
pub mod dashboard;
pub mod detail;
pub mod notice;

pub use book_form::{BookForm, FormMode};
pub use borrow::{BorrowDraft, BorrowError, BorrowModal, BorrowState, BorrowSubmission};
pub use catalog::{CatalogFilters, CatalogView, HomePreview};
pub use dashboard::{BorrowDashboard, SummaryRow};
pub use detail::BookDetail;
pub use notice::{Notice, NoticeLevel};
