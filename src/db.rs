use rusqlite::Connection;
use std::fs;
use std::path::Path;

use crate::error::Result;

const SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS books (
        isbn TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        subtitle TEXT,
        year INTEGER,
        imgURL TEXT
    );

    CREATE TABLE IF NOT EXISTS authors (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS book_authors (
        book_isbn TEXT NOT NULL,
        author_id INTEGER NOT NULL,
        FOREIGN KEY (book_isbn) REFERENCES books(isbn),
        FOREIGN KEY (author_id) REFERENCES authors(id),
        PRIMARY KEY (book_isbn, author_id)
    );
";

/// Opens the database file at `path`, creating it and its directory if
/// needed, and makes sure the catalog tables exist.
pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir)?;
        }
    }

    let conn = Connection::open(path)?;
    prepare(&conn)?;
    Ok(conn)
}

/// Same as [`open_db`] but backed by a private in-memory database.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    prepare(&conn)?;
    Ok(conn)
}

fn prepare(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    ensure_schema(conn)
}

/// Creates `books`, `authors` and `book_authors` if they are missing.
///
/// Safe to run on every startup; existing tables and rows are untouched.
/// There is no versioning, a changed table definition is not migrated.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
