use libris_api_types::BorrowSummaryEntry;
use time::Date;

use crate::cache::QueryState;
use crate::domain::dates::{format_display_date, parse_due_date};
use crate::library::LibraryData;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub title: String,
    pub isbn: String,
    pub total_quantity: u32,
    pub latest_due: Option<Date>,
    pub overdue: bool,
}

impl SummaryRow {
    fn from_entry(entry: &BorrowSummaryEntry, today: Date) -> Self {
        let latest_due = entry
            .due_dates
            .iter()
            .filter_map(|value| parse_due_date(value))
            .max();
        Self {
            title: entry.book.title.clone(),
            isbn: entry.book.isbn.clone(),
            total_quantity: entry.total_quantity,
            latest_due,
            overdue: latest_due.is_some_and(|due| due < today),
        }
    }

    pub fn latest_due_label(&self) -> String {
        self.latest_due
            .map(format_display_date)
            .unwrap_or_else(|| "N/A".to_string())
    }
}

/// Aggregates shown above the borrow summary table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BorrowDashboard {
    pub rows: Vec<SummaryRow>,
    pub total_borrowed: u64,
    pub active_borrowers: usize,
    pub overdue_count: usize,
}

impl BorrowDashboard {
    pub fn from_entries(entries: &[BorrowSummaryEntry], today: Date) -> Self {
        let rows: Vec<SummaryRow> = entries
            .iter()
            .map(|entry| SummaryRow::from_entry(entry, today))
            .collect();
        Self {
            total_borrowed: rows.iter().map(|row| u64::from(row.total_quantity)).sum(),
            active_borrowers: rows.len(),
            overdue_count: rows.iter().filter(|row| row.overdue).count(),
            rows,
        }
    }

    /// `None` until the summary query has data.
    pub fn from_state(state: &QueryState<LibraryData>, today: Date) -> Option<Self> {
        state
            .data
            .as_ref()
            .and_then(LibraryData::as_borrow_summary)
            .map(|entries| Self::from_entries(entries, today))
    }
}
