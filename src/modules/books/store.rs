//! In-memory book collection.
//!
//! The store owns every [`Book`] and keeps them in insertion order. All
//! validation runs before the collection is touched, so a rejected call never
//! leaves a partial write behind. The store itself is not synchronized; the
//! books module wraps it in a single mutex.

use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use bookshelf_kernel::settings::ListFilterMode;

use super::models::{Book, BookInput, BookQuery, BookSummary};

/// Reasons a caller's payload is refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing name")]
    MissingName,
    #[error("readPage exceeds pageCount")]
    ReadPageExceedsPageCount,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("book {0} not found")]
    NotFound(String),
    #[error("store invariant violated: {0}")]
    Internal(String),
}

pub type BookResult<T> = Result<T, BookError>;

/// Produces candidate ids for new books.
pub type IdGenerator = fn() -> String;

fn random_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Ordered, exclusively owned collection of books.
#[derive(Debug)]
pub struct BookStore {
    books: Vec<Book>,
    filter_mode: ListFilterMode,
    next_id: IdGenerator,
}

impl Default for BookStore {
    fn default() -> Self {
        Self::new(ListFilterMode::default())
    }
}

impl BookStore {
    pub fn new(filter_mode: ListFilterMode) -> Self {
        Self {
            books: Vec::new(),
            filter_mode,
            next_id: random_id,
        }
    }

    /// Replace the id source, mainly to exercise collision handling.
    pub fn with_id_generator(mut self, next_id: IdGenerator) -> Self {
        self.next_id = next_id;
        self
    }

    pub fn filter_mode(&self) -> ListFilterMode {
        self.filter_mode
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Validate `input`, store it as a new book and return the assigned id.
    pub fn create(&mut self, input: BookInput) -> BookResult<String> {
        let name = validate(&input)?;

        let id = (self.next_id)();
        if self.position(&id).is_some() {
            return Err(BookError::Internal(format!("generated id {id} already exists")));
        }

        let now = OffsetDateTime::now_utc();
        self.books.push(Book {
            id: id.clone(),
            name,
            year: input.year,
            author: input.author,
            summary: input.summary,
            publisher: input.publisher,
            page_count: input.page_count,
            read_page: input.read_page,
            finished: input.read_page == input.page_count,
            reading: input.reading,
            inserted_at: now,
            updated_at: now,
        });

        tracing::info!(book_id = %id, "book created");
        Ok(id)
    }

    /// Project the books matching `query` to `{id, name, publisher}`.
    pub fn list(&self, query: &BookQuery) -> Vec<BookSummary> {
        let matched: Vec<&Book> = match self.filter_mode {
            ListFilterMode::Legacy => self.list_legacy(query),
            ListFilterMode::Strict => self
                .books
                .iter()
                .filter(|book| matches_all(book, query))
                .collect(),
        };

        matched.into_iter().map(BookSummary::from).collect()
    }

    // Every present filter rescans the full collection, so only the last one
    // in name/reading/finished order takes effect. Nothing matched means
    // everything is returned.
    fn list_legacy(&self, query: &BookQuery) -> Vec<&Book> {
        let mut matched = Vec::new();

        if let Some(name) = &query.name {
            let needle = name.to_lowercase();
            matched = self
                .books
                .iter()
                .filter(|book| book.name.to_lowercase().contains(&needle))
                .collect();
        }

        if let Some(reading) = query.reading {
            matched = self
                .books
                .iter()
                .filter(|book| book.reading == reading)
                .collect();
        }

        if let Some(finished) = query.finished {
            matched = self
                .books
                .iter()
                .filter(|book| book.finished == finished)
                .collect();
        }

        if matched.is_empty() {
            matched = self.books.iter().collect();
        }
        matched
    }

    pub fn get(&self, id: &str) -> BookResult<Book> {
        self.books
            .iter()
            .find(|book| book.id == id)
            .cloned()
            .ok_or_else(|| BookError::NotFound(id.to_string()))
    }

    /// Replace every field but `id` and `inserted_at`, keeping the book's position.
    pub fn update(&mut self, id: &str, input: BookInput) -> BookResult<()> {
        let name = validate(&input)?;

        let index = self
            .position(id)
            .ok_or_else(|| BookError::NotFound(id.to_string()))?;

        let book = &mut self.books[index];
        book.name = name;
        book.year = input.year;
        book.author = input.author;
        book.summary = input.summary;
        book.publisher = input.publisher;
        book.page_count = input.page_count;
        book.read_page = input.read_page;
        book.finished = input.read_page == input.page_count;
        book.reading = input.reading;
        book.updated_at = OffsetDateTime::now_utc();

        tracing::info!(book_id = %id, "book updated");
        Ok(())
    }

    pub fn delete(&mut self, id: &str) -> BookResult<()> {
        let index = self
            .position(id)
            .ok_or_else(|| BookError::NotFound(id.to_string()))?;

        self.books.remove(index);

        tracing::info!(book_id = %id, "book deleted");
        Ok(())
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.books.iter().position(|book| book.id == id)
    }
}

/// Check the payload rules in order and hand back the accepted name.
fn validate(input: &BookInput) -> Result<String, ValidationError> {
    let name = match input.name.as_deref() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return Err(ValidationError::MissingName),
    };

    if input.read_page > input.page_count {
        return Err(ValidationError::ReadPageExceedsPageCount);
    }

    Ok(name)
}

fn matches_all(book: &Book, query: &BookQuery) -> bool {
    let name_matches = query.name.as_ref().map_or(true, |name| {
        book.name.to_lowercase().contains(&name.to_lowercase())
    });
    let reading_matches = query.reading.map_or(true, |reading| book.reading == reading);
    let finished_matches = query
        .finished
        .map_or(true, |finished| book.finished == finished);

    name_matches && reading_matches && finished_matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    fn input(name: &str, page_count: u32, read_page: u32, reading: bool) -> BookInput {
        BookInput {
            name: Some(name.to_string()),
            year: Some(2010),
            author: Some("Author".to_string()),
            summary: Some("Summary".to_string()),
            publisher: Some(format!("{name} Press")),
            page_count,
            read_page,
            reading,
        }
    }

    fn names(summaries: &[BookSummary]) -> Vec<&str> {
        summaries.iter().map(|s| s.name.as_str()).collect()
    }

    /// Dune (finished, not reading), Emma (reading), Ulysses (reading).
    fn shelf(mode: ListFilterMode) -> BookStore {
        let mut store = BookStore::new(mode);
        store.create(input("Dune", 500, 500, false)).unwrap();
        store.create(input("Emma", 300, 20, true)).unwrap();
        store.create(input("Ulysses", 700, 100, true)).unwrap();
        store
    }

    #[test]
    fn create_then_get_round_trips() {
        let mut store = BookStore::default();
        let payload = input("Dune", 500, 500, false);
        let id = store.create(payload.clone()).unwrap();

        let book = store.get(&id).unwrap();
        assert_eq!(book.id, id);
        assert_eq!(book.name, "Dune");
        assert_eq!(book.year, payload.year);
        assert_eq!(book.author, payload.author);
        assert_eq!(book.summary, payload.summary);
        assert_eq!(book.publisher, payload.publisher);
        assert_eq!(book.page_count, 500);
        assert_eq!(book.read_page, 500);
        assert!(book.finished);
        assert!(!book.reading);
        assert_eq!(book.inserted_at, book.updated_at);
    }

    #[test]
    fn unfinished_book_is_not_finished() {
        let mut store = BookStore::default();
        let id = store.create(input("Emma", 300, 20, true)).unwrap();
        assert!(!store.get(&id).unwrap().finished);
    }

    #[test]
    fn create_rejects_read_page_above_page_count() {
        let mut store = BookStore::default();
        let err = store.create(input("X", 100, 200, false)).unwrap_err();
        assert_eq!(
            err,
            BookError::Validation(ValidationError::ReadPageExceedsPageCount)
        );
        assert!(store.is_empty());
    }

    #[test]
    fn create_rejects_missing_or_empty_name() {
        let mut store = BookStore::default();
        let missing = BookInput {
            page_count: 10,
            ..BookInput::default()
        };
        assert_eq!(
            store.create(missing).unwrap_err(),
            BookError::Validation(ValidationError::MissingName)
        );

        let empty = BookInput {
            name: Some(String::new()),
            ..BookInput::default()
        };
        assert_eq!(
            store.create(empty).unwrap_err(),
            BookError::Validation(ValidationError::MissingName)
        );
        assert!(store.is_empty());
    }

    #[test]
    fn name_is_checked_before_page_counts() {
        let mut store = BookStore::default();
        let both_wrong = BookInput {
            page_count: 1,
            read_page: 2,
            ..BookInput::default()
        };
        assert_eq!(
            store.create(both_wrong).unwrap_err(),
            BookError::Validation(ValidationError::MissingName)
        );
    }

    #[test]
    fn generated_ids_are_unique() {
        let mut store = BookStore::default();
        let ids: HashSet<String> = (0..200)
            .map(|i| store.create(input(&format!("Book {i}"), 10, 0, false)).unwrap())
            .collect();
        assert_eq!(ids.len(), 200);
        assert_eq!(store.len(), 200);
    }

    #[test]
    fn id_collision_is_an_internal_error() {
        let mut store = BookStore::default().with_id_generator(|| "fixed".to_string());
        store.create(input("Dune", 10, 0, false)).unwrap();

        let err = store.create(input("Emma", 10, 0, false)).unwrap_err();
        assert!(matches!(err, BookError::Internal(_)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("fixed").unwrap().name, "Dune");
    }

    #[test]
    fn get_unknown_id_is_not_found() {
        let store = shelf(ListFilterMode::Legacy);
        assert_eq!(
            store.get("never-issued").unwrap_err(),
            BookError::NotFound("never-issued".to_string())
        );
    }

    #[test]
    fn list_without_filters_returns_all_in_order() {
        let store = shelf(ListFilterMode::Legacy);
        let all = store.list(&BookQuery::default());
        assert_eq!(names(&all), vec!["Dune", "Emma", "Ulysses"]);
        assert_eq!(all[0].publisher.as_deref(), Some("Dune Press"));
    }

    #[test]
    fn list_name_filter_is_case_insensitive_substring() {
        let store = shelf(ListFilterMode::Legacy);
        let query = BookQuery {
            name: Some("dun".to_string()),
            ..BookQuery::default()
        };
        let listed = store.list(&query);
        assert_eq!(names(&listed), vec!["Dune"]);
    }

    #[test]
    fn legacy_list_last_present_filter_wins() {
        let store = shelf(ListFilterMode::Legacy);
        // name alone would give Dune; finished=false overrides it.
        let query = BookQuery {
            name: Some("dune".to_string()),
            reading: None,
            finished: Some(false),
        };
        assert_eq!(names(&store.list(&query)), vec!["Emma", "Ulysses"]);

        let query = BookQuery {
            name: Some("emma".to_string()),
            reading: Some(false),
            finished: None,
        };
        assert_eq!(names(&store.list(&query)), vec!["Dune"]);
    }

    #[test]
    fn legacy_list_empty_match_falls_back_to_everything() {
        let store = shelf(ListFilterMode::Legacy);
        let query = BookQuery {
            name: Some("zzz".to_string()),
            ..BookQuery::default()
        };
        assert_eq!(store.list(&query).len(), 3);
    }

    #[test]
    fn strict_list_composes_filters_and_may_be_empty() {
        let store = shelf(ListFilterMode::Strict);
        let query = BookQuery {
            name: Some("u".to_string()),
            reading: Some(true),
            finished: Some(false),
        };
        assert_eq!(names(&store.list(&query)), vec!["Ulysses"]);

        let query = BookQuery {
            name: Some("dune".to_string()),
            reading: None,
            finished: Some(false),
        };
        assert!(store.list(&query).is_empty());
    }

    #[test]
    fn reads_do_not_mutate() {
        let store = shelf(ListFilterMode::Legacy);
        let query = BookQuery {
            reading: Some(true),
            ..BookQuery::default()
        };
        let first = store.list(&query);
        let second = store.list(&query);
        assert_eq!(first, second);

        let id = first[0].id.clone();
        assert_eq!(store.get(&id).unwrap(), store.get(&id).unwrap());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn update_replaces_fields_and_refreshes_updated_at() {
        let mut store = shelf(ListFilterMode::Legacy);
        let id = store.list(&BookQuery::default())[1].id.clone();
        let before = store.get(&id).unwrap();

        std::thread::sleep(Duration::from_millis(5));
        let replacement = BookInput {
            name: Some("Emma (annotated)".to_string()),
            year: Some(1815),
            author: Some("Jane Austen".to_string()),
            summary: None,
            publisher: Some("John Murray".to_string()),
            page_count: 320,
            read_page: 320,
            reading: false,
        };
        store.update(&id, replacement).unwrap();

        let after = store.get(&id).unwrap();
        assert_eq!(after.id, before.id);
        assert_eq!(after.name, "Emma (annotated)");
        assert_eq!(after.year, Some(1815));
        assert_eq!(after.author.as_deref(), Some("Jane Austen"));
        assert_eq!(before.summary.as_deref(), Some("Summary"));
        assert_eq!(after.summary, None);
        assert_eq!(after.publisher.as_deref(), Some("John Murray"));
        assert_eq!(after.page_count, 320);
        assert_eq!(after.read_page, 320);
        assert!(after.finished);
        assert!(!after.reading);
        assert_eq!(after.inserted_at, before.inserted_at);
        assert!(after.updated_at > before.updated_at);
        assert_eq!(
            names(&store.list(&BookQuery::default())),
            vec!["Dune", "Emma (annotated)", "Ulysses"]
        );
    }

    #[test]
    fn update_validates_before_existence() {
        let mut store = shelf(ListFilterMode::Legacy);
        let nameless = BookInput::default();
        assert_eq!(
            store.update("missing", nameless).unwrap_err(),
            BookError::Validation(ValidationError::MissingName)
        );
        assert_eq!(
            store.update("missing", input("X", 1, 2, false)).unwrap_err(),
            BookError::Validation(ValidationError::ReadPageExceedsPageCount)
        );
        assert_eq!(
            store.update("missing", input("X", 2, 1, false)).unwrap_err(),
            BookError::NotFound("missing".to_string())
        );
    }

    #[test]
    fn rejected_update_leaves_book_untouched() {
        let mut store = shelf(ListFilterMode::Legacy);
        let id = store.list(&BookQuery::default())[0].id.clone();
        let before = store.get(&id).unwrap();

        assert!(store.update(&id, input("Dune", 10, 11, true)).is_err());
        assert_eq!(store.get(&id).unwrap(), before);
    }

    #[test]
    fn delete_removes_exactly_one_and_keeps_order() {
        let mut store = shelf(ListFilterMode::Legacy);
        let listed = store.list(&BookQuery::default());
        let survivors_before: Vec<Book> = [&listed[0].id, &listed[2].id]
            .iter()
            .map(|id| store.get(id).unwrap())
            .collect();

        store.delete(&listed[1].id).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(
            store.get(&listed[1].id).unwrap_err(),
            BookError::NotFound(listed[1].id.clone())
        );
        let survivors_after: Vec<Book> = [&listed[0].id, &listed[2].id]
            .iter()
            .map(|id| store.get(id).unwrap())
            .collect();
        assert_eq!(survivors_before, survivors_after);
        assert_eq!(
            names(&store.list(&BookQuery::default())),
            vec!["Dune", "Ulysses"]
        );
    }

    #[test]
    fn delete_unknown_id_is_not_found() {
        let mut store = shelf(ListFilterMode::Legacy);
        assert!(matches!(
            store.delete("nope").unwrap_err(),
            BookError::NotFound(_)
        ));
        assert_eq!(store.len(), 3);
    }
}
