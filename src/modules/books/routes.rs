//! HTTP handlers for the books module.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;

use bookshelf_http::{AppError, Status};

use super::models::{Book, BookInput, BookSummary, ListBooksParams};
use super::store::{BookError, BookStore, ValidationError};

pub type SharedStore = Arc<Mutex<BookStore>>;

/// Successful response envelope.
#[derive(Debug, Serialize)]
pub struct Success<T: Serialize> {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> Success<T> {
    fn data(data: T) -> Self {
        Self {
            status: Status::Success,
            message: None,
            data: Some(data),
        }
    }

    fn with_message(message: &'static str, data: Option<T>) -> Self {
        Self {
            status: Status::Success,
            message: Some(message),
            data,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedBook {
    pub book_id: String,
}

#[derive(Debug, Serialize)]
pub struct BookList {
    pub books: Vec<BookSummary>,
}

#[derive(Debug, Serialize)]
pub struct BookDetail {
    pub book: Book,
}

/// Which write a store error came from; picks the message prefix.
#[derive(Debug, Clone, Copy)]
enum Action {
    Add,
    Update,
    Delete,
}

impl Action {
    fn failure(self) -> &'static str {
        match self {
            Action::Add => "Failed to add book",
            Action::Update => "Failed to update book",
            Action::Delete => "Failed to delete book",
        }
    }

    fn reject(self, error: BookError) -> AppError {
        let prefix = self.failure();
        match error {
            BookError::Validation(ValidationError::MissingName) => {
                AppError::bad_request(format!("{prefix}. Please provide the book name"))
            }
            BookError::Validation(ValidationError::ReadPageExceedsPageCount) => {
                AppError::bad_request(format!("{prefix}. readPage must not exceed pageCount"))
            }
            BookError::NotFound(_) => AppError::not_found(format!("{prefix}. Id not found")),
            BookError::Internal(_) => AppError::internal(prefix, error),
        }
    }
}

pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/", get(list_books).post(add_book))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(store)
}

// Every mutation validates before writing, so a poisoned lock still guards a
// consistent shelf.
pub(super) fn lock(store: &SharedStore) -> MutexGuard<'_, BookStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn add_book(
    State(store): State<SharedStore>,
    payload: Result<Json<BookInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Success<CreatedBook>>), AppError> {
    let Json(input) = payload?;
    let book_id = lock(&store)
        .create(input)
        .map_err(|e| Action::Add.reject(e))?;

    Ok((
        StatusCode::CREATED,
        Json(Success::with_message(
            "Book added",
            Some(CreatedBook { book_id }),
        )),
    ))
}

// Listing never fails: an unparsable query string lists with no filters.
async fn list_books(
    State(store): State<SharedStore>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Json<Success<BookList>> {
    let params = match query {
        Ok(Query(pairs)) => ListBooksParams::from_pairs(&pairs),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "ignoring malformed list query");
            ListBooksParams::default()
        }
    };
    let books = lock(&store).list(&params.into());
    Json(Success::data(BookList { books }))
}

async fn get_book(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<Json<Success<BookDetail>>, AppError> {
    let book = lock(&store).get(&id).map_err(|e| match e {
        BookError::NotFound(_) => AppError::not_found("Book not found"),
        other => AppError::internal("Failed to fetch book", other),
    })?;

    Ok(Json(Success::data(BookDetail { book })))
}

async fn update_book(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
    payload: Result<Json<BookInput>, JsonRejection>,
) -> Result<Json<Success<()>>, AppError> {
    let Json(input) = payload?;
    lock(&store)
        .update(&id, input)
        .map_err(|e| Action::Update.reject(e))?;

    Ok(Json(Success::with_message("Book updated", None)))
}

async fn delete_book(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<Json<Success<()>>, AppError> {
    lock(&store)
        .delete(&id)
        .map_err(|e| Action::Delete.reject(e))?;

    Ok(Json(Success::with_message("Book deleted", None)))
}

/// OpenAPI fragment for the routes above, merged by the HTTP facade.
pub fn openapi() -> serde_json::Value {
    let fail = |description: &str| {
        json!({
            "description": description,
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                }
            }
        })
    };
    let id_param = json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "string" }
    });
    let flag_param = |name: &str| {
        json!({
            "name": name,
            "in": "query",
            "required": false,
            "schema": { "type": "string", "enum": ["0", "1"] }
        })
    };
    let input_body = json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/BookInput" }
            }
        }
    });
    let message_ok = |description: &str| {
        json!({
            "description": description,
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/MessageResponse" }
                }
            }
        })
    };

    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "parameters": [
                        {
                            "name": "name",
                            "in": "query",
                            "required": false,
                            "schema": { "type": "string" }
                        },
                        flag_param("reading"),
                        flag_param("finished")
                    ],
                    "responses": {
                        "200": {
                            "description": "Book projections",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/BookListResponse" }
                                }
                            }
                        }
                    }
                },
                "post": {
                    "summary": "Add a book",
                    "tags": ["Books"],
                    "requestBody": input_body.clone(),
                    "responses": {
                        "201": message_ok("Book added"),
                        "400": fail("Invalid book payload"),
                        "500": fail("Book could not be stored")
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Get a book",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "responses": {
                        "200": {
                            "description": "Full book record",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/BookResponse" }
                                }
                            }
                        },
                        "404": fail("Book not found")
                    }
                },
                "put": {
                    "summary": "Replace a book",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "requestBody": input_body,
                    "responses": {
                        "200": message_ok("Book updated"),
                        "400": fail("Invalid book payload"),
                        "404": fail("Book not found")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [id_param],
                    "responses": {
                        "200": message_ok("Book deleted"),
                        "404": fail("Book not found")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "BookInput": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "year": { "type": ["integer", "null"] },
                        "author": { "type": ["string", "null"] },
                        "summary": { "type": ["string", "null"] },
                        "publisher": { "type": ["string", "null"] },
                        "pageCount": { "type": "integer", "minimum": 0 },
                        "readPage": { "type": "integer", "minimum": 0 },
                        "reading": { "type": "boolean" }
                    },
                    "required": ["name"]
                },
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string" },
                        "name": { "type": "string" },
                        "year": { "type": ["integer", "null"] },
                        "author": { "type": ["string", "null"] },
                        "summary": { "type": ["string", "null"] },
                        "publisher": { "type": ["string", "null"] },
                        "pageCount": { "type": "integer" },
                        "readPage": { "type": "integer" },
                        "finished": { "type": "boolean" },
                        "reading": { "type": "boolean" },
                        "insertedAt": { "type": "string", "format": "date-time" },
                        "updatedAt": { "type": "string", "format": "date-time" }
                    },
                    "required": [
                        "id", "name", "pageCount", "readPage", "finished",
                        "reading", "insertedAt", "updatedAt"
                    ]
                },
                "BookSummary": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string" },
                        "name": { "type": "string" },
                        "publisher": { "type": ["string", "null"] }
                    },
                    "required": ["id", "name"]
                },
                "BookListResponse": {
                    "type": "object",
                    "properties": {
                        "status": { "type": "string" },
                        "data": {
                            "type": "object",
                            "properties": {
                                "books": {
                                    "type": "array",
                                    "items": { "$ref": "#/components/schemas/BookSummary" }
                                }
                            }
                        }
                    }
                },
                "BookResponse": {
                    "type": "object",
                    "properties": {
                        "status": { "type": "string" },
                        "data": {
                            "type": "object",
                            "properties": {
                                "book": { "$ref": "#/components/schemas/Book" }
                            }
                        }
                    }
                },
                "MessageResponse": {
                    "type": "object",
                    "properties": {
                        "status": { "type": "string" },
                        "message": { "type": "string" },
                        "data": { "type": "object" }
                    },
                    "required": ["status", "message"]
                }
            }
        }
    })
}
