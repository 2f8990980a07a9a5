//! HTTP surface of the catalog.
//!
//! | Route | Method |
//! |---|---|
//! | `/books` | GET |
//! | `/books/*isbn` | GET |
//! | `/isbns` | GET |
//! | `/submit-book` | POST, form encoded |
//!
//! Handlers only translate between HTTP and [`Library`]; the status code for
//! each error kind is decided in one place, the `IntoResponse` impl below.

use axum::{
    extract::{rejection::FormRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::books::Library;
use crate::error::{Error, Result};
use crate::models::{Book, NewBook};

pub fn router(library: Library) -> Router {
    Router::new()
        .route("/books", get(list_books).head(method_not_allowed))
        .route("/books/", get(missing_isbn).head(method_not_allowed))
        .route("/books/*isbn", get(get_book).head(method_not_allowed))
        .route("/isbns", get(list_isbns).head(method_not_allowed))
        .route("/submit-book", post(submit_book))
        .layer(TraceLayer::new_for_http())
        .with_state(library)
}

/// Runs a blocking repository call off the async executor.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

async fn list_books(State(library): State<Library>) -> Response {
    match blocking(move || library.list_books()).await {
        Ok(books) => Json(books).into_response(),
        Err(err) => {
            log::error!("failed to list books: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to get books: {err}"),
            )
                .into_response()
        }
    }
}

async fn list_isbns(State(library): State<Library>) -> Response {
    match blocking(move || library.list_isbns()).await {
        Ok(isbns) => Json(isbns).into_response(),
        Err(err) => {
            log::error!("failed to list isbns: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to get isbns: {err}"),
            )
                .into_response()
        }
    }
}

async fn get_book(
    State(library): State<Library>,
    Path(isbn): Path<String>,
) -> Result<Json<Book>> {
    let book = blocking(move || library.get_book(&isbn)).await?;
    Ok(Json(book))
}

// `get` would otherwise answer HEAD as well
async fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, "Invalid request method").into_response()
}

async fn missing_isbn() -> Response {
    (StatusCode::BAD_REQUEST, "ISBN required").into_response()
}

/// Fields of the submit form. Missing fields read as empty strings.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitBookForm {
    #[serde(default)]
    pub isbn: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub year: String,
    #[serde(rename = "imgURL", default)]
    pub img_url: String,
    #[serde(default)]
    pub authors: String,
}

impl TryFrom<SubmitBookForm> for NewBook {
    type Error = Error;

    fn try_from(form: SubmitBookForm) -> Result<Self> {
        Ok(NewBook {
            year: parse_year(&form.year)?,
            isbn: form.isbn,
            title: form.title,
            subtitle: non_empty(form.subtitle),
            img_url: non_empty(form.img_url),
            authors: form.authors,
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// An empty year means "unknown"; anything else must be an integer.
pub fn parse_year(raw: &str) -> Result<Option<i64>> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| Error::InvalidYear(raw.to_string()))
}

async fn submit_book(
    State(library): State<Library>,
    form: Result<Form<SubmitBookForm>, FormRejection>,
) -> Response {
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => {
            log::warn!("rejected submit form: {}", rejection);
            return (StatusCode::BAD_REQUEST, "Failed to parse form").into_response();
        }
    };

    let book = match NewBook::try_from(form) {
        Ok(book) => book,
        Err(err) => return err.into_response(),
    };

    match blocking(move || library.submit_book(&book)).await {
        Ok(()) => Redirect::to("/").into_response(),
        Err(err) => err.into_response(),
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "Book not found").into_response(),
            Error::InvalidYear(_) => {
                (StatusCode::BAD_REQUEST, "Invalid year format").into_response()
            }
            err @ Error::DuplicateIsbn(_) => (StatusCode::CONFLICT, err.to_string()).into_response(),
            err => {
                log::error!("request failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
            }
        }
    }
}
