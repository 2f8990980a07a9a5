use thiserror::Error;

/// Errors produced by the catalog.
///
/// The storage layers only ever return these; turning them into HTTP
/// responses is the job of [`crate::routes`].
#[derive(Debug, Error)]
pub enum Error {
    /// No book is stored under the requested ISBN.
    #[error("book not found: {0}")]
    NotFound(String),

    /// A book with this ISBN already exists. The submission was rolled back.
    #[error("book already exists: {0}")]
    DuplicateIsbn(String),

    /// The submitted year is not an integer.
    #[error("invalid year format: {0:?}")]
    InvalidYear(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
