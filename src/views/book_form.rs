use libris_api_types::{Book, BookId, BookPayload, Genre};

use super::notice::Notice;
use crate::domain::FieldErrors;
use crate::library::LibraryStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(BookId),
}

/// Editable state of the add/edit book form. Fields hold raw user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookForm {
    pub mode: FormMode,
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub isbn: String,
    pub description: String,
    pub copies: i64,
    pub available: bool,
}

impl BookForm {
    pub fn create() -> Self {
        Self {
            mode: FormMode::Create,
            title: String::new(),
            author: String::new(),
            genre: Genre::default(),
            isbn: String::new(),
            description: String::new(),
            copies: 1,
            available: true,
        }
    }

    pub fn edit(book: &Book) -> Self {
        Self {
            mode: FormMode::Edit(book.id.clone()),
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre,
            isbn: book.isbn.clone(),
            description: book.description.clone().unwrap_or_default(),
            copies: i64::from(book.copies),
            available: book.available,
        }
    }

    pub fn validate(&self) -> Result<BookPayload, FieldErrors> {
        let mut errors = FieldErrors::new();
        let title = required(&mut errors, "title", &self.title, "Title is required");
        let author = required(&mut errors, "author", &self.author, "Author is required");
        let isbn = required(&mut errors, "isbn", &self.isbn, "ISBN is required");

        let copies = match u32::try_from(self.copies) {
            Ok(copies) if copies >= 1 => copies,
            Ok(_) => {
                errors.add("copies", "At least one copy is required");
                0
            }
            Err(_) if self.copies > 0 => {
                errors.add("copies", format!("At most {} copies are allowed", u32::MAX));
                0
            }
            Err(_) => {
                errors.add("copies", "At least one copy is required");
                0
            }
        };

        let description = self.description.trim();
        errors.into_result(BookPayload {
            title,
            author,
            genre: self.genre,
            isbn,
            description: (!description.is_empty()).then(|| description.to_string()),
            copies,
            available: self.available,
        })
    }

    /// Validate and dispatch create or update. Field errors never reach the
    /// network; server failures come back as an error notice.
    pub async fn submit(&self, store: &LibraryStore) -> Result<Notice, FieldErrors> {
        let payload = self.validate()?;
        let notice = match &self.mode {
            FormMode::Create => match store.create_book(&payload).await {
                Ok(_) => Notice::success(format!(
                    "\"{}\" has been added to the library.",
                    payload.title
                )),
                Err(err) => Notice::error(err.user_message("Something went wrong.")),
            },
            FormMode::Edit(id) => match store.update_book(id, &payload).await {
                Ok(_) => Notice::success(format!(
                    "\"{}\" has been updated in the library.",
                    payload.title
                )),
                Err(err) => Notice::error(err.user_message("Something went wrong.")),
            },
        };
        Ok(notice)
    }
}

impl Default for BookForm {
    fn default() -> Self {
        Self::create()
    }
}

fn required(
    errors: &mut FieldErrors,
    field: &'static str,
    value: &str,
    message: &'static str,
) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, message);
    }
    value.to_string()
}
