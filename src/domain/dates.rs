use time::format_description::FormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime};

const CALENDAR_DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
const DISPLAY_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:short] [day], [year]");

/// Default loan period offered when the borrow form opens.
pub const DEFAULT_LOAN_DAYS: i64 = 14;

pub fn today_utc() -> Date {
    OffsetDateTime::now_utc().date()
}

pub fn default_due_date(today: Date) -> Date {
    today.saturating_add(Duration::days(DEFAULT_LOAN_DAYS))
}

/// Parse a due date sent either as `YYYY-MM-DD` or as an RFC 3339 timestamp.
pub fn parse_due_date(value: &str) -> Option<Date> {
    let value = value.trim();
    Date::parse(value, CALENDAR_DATE_FORMAT)
        .ok()
        .or_else(|| OffsetDateTime::parse(value, &Rfc3339).ok().map(|at| at.date()))
}

/// `Mar 07, 2026`.
pub fn format_display_date(date: Date) -> String {
    date.format(DISPLAY_DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}
