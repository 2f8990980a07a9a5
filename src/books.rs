use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::authors::{resolve_author, split_author_names};
use crate::db;
use crate::error::{Error, Result};
use crate::models::{Author, Book, NewBook};

const BOOK_COLUMNS: &str = "isbn, title, subtitle, year, imgURL";

/// Shared handle to the catalog database.
///
/// One connection is opened at startup and every clone refers to it.
/// Each call holds the lock for the whole operation, so a submission's
/// transaction never interleaves with other statements.
#[derive(Clone)]
pub struct Library {
    conn: Arc<Mutex<Connection>>,
}

impl Library {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(db::open_db(path)?))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(db::open_in_memory()?))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::LockPoisoned)
    }

    pub fn list_books(&self) -> Result<Vec<Book>> {
        let conn = self.lock()?;
        list_books(&conn)
    }

    pub fn list_isbns(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        list_isbns(&conn)
    }

    pub fn get_book(&self, isbn: &str) -> Result<Book> {
        let conn = self.lock()?;
        get_book(&conn, isbn)
    }

    pub fn submit_book(&self, book: &NewBook) -> Result<()> {
        let mut conn = self.lock()?;
        submit_book(&mut conn, book)
    }
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        isbn: row.get(0)?,
        title: row.get(1)?,
        subtitle: row.get(2)?,
        year: row.get(3)?,
        img_url: row.get(4)?,
        authors: Vec::new(),
    })
}

/// Every book with its authors, in table scan order.
///
/// Authors are fetched with one query per book. Any failure fails the
/// whole listing.
pub fn list_books(conn: &Connection) -> Result<Vec<Book>> {
    let mut stmt = conn.prepare(&format!("SELECT {BOOK_COLUMNS} FROM books"))?;
    let rows = stmt.query_map([], book_from_row)?;

    let mut books = Vec::new();
    for row in rows {
        let mut book = row?;
        book.authors = get_authors_for_book(conn, &book.isbn)?;
        books.push(book);
    }

    Ok(books)
}

pub fn list_isbns(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT isbn FROM books")?;
    let rows = stmt.query_map([], |row| row.get(0))?;

    let mut isbns = Vec::new();
    for row in rows {
        isbns.push(row?);
    }

    Ok(isbns)
}

pub fn get_book(conn: &Connection, isbn: &str) -> Result<Book> {
    let book = conn
        .query_row(
            &format!("SELECT {BOOK_COLUMNS} FROM books WHERE isbn = ?1"),
            params![isbn],
            book_from_row,
        )
        .optional()?;

    let mut book = book.ok_or_else(|| Error::NotFound(isbn.to_string()))?;
    book.authors = get_authors_for_book(conn, &book.isbn)?;
    Ok(book)
}

/// Authors linked to `isbn`, in the order they were submitted.
pub fn get_authors_for_book(conn: &Connection, isbn: &str) -> Result<Vec<Author>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.name
         FROM authors a
         JOIN book_authors ba ON a.id = ba.author_id
         WHERE ba.book_isbn = ?1
         ORDER BY ba.rowid",
    )?;
    let rows = stmt.query_map(params![isbn], |row| {
        Ok(Author {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;

    let mut authors = Vec::new();
    for row in rows {
        authors.push(row?);
    }

    Ok(authors)
}

/// Inserts a book, resolves each comma separated author and links them,
/// all in one transaction.
///
/// On any error the transaction is dropped without commit, so nothing
/// from this submission is persisted.
pub fn submit_book(conn: &mut Connection, book: &NewBook) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO books (isbn, title, subtitle, year, imgURL) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![book.isbn, book.title, book.subtitle, book.year, book.img_url],
    )
    .map_err(|err| duplicate_isbn(err, &book.isbn))?;

    for name in split_author_names(&book.authors) {
        let author_id = resolve_author(&tx, name)?;
        tx.execute(
            "INSERT INTO book_authors (book_isbn, author_id) VALUES (?1, ?2)",
            params![book.isbn, author_id],
        )?;
    }

    tx.commit()?;
    log::info!("stored book {} ({:?})", book.isbn, book.title);
    Ok(())
}

fn duplicate_isbn(err: rusqlite::Error, isbn: &str) -> Error {
    let primary_key_violation = matches!(
        err.sqlite_error(),
        Some(e) if e.code == ErrorCode::ConstraintViolation
            && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    );

    if primary_key_violation {
        Error::DuplicateIsbn(isbn.to_string())
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn go_book() -> NewBook {
        NewBook {
            isbn: "978-0".to_string(),
            title: "Go".to_string(),
            year: Some(2009),
            authors: "Rob Pike, Ken Thompson".to_string(),
            ..Default::default()
        }
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn submitted_book_reads_back() {
        let mut conn = open_in_memory().unwrap();
        let book = NewBook {
            subtitle: Some("Programming".to_string()),
            img_url: Some("http://example.com/go.png".to_string()),
            ..go_book()
        };
        submit_book(&mut conn, &book).unwrap();

        let stored = get_book(&conn, "978-0").unwrap();
        assert_eq!(stored.title, "Go");
        assert_eq!(stored.subtitle.as_deref(), Some("Programming"));
        assert_eq!(stored.year, Some(2009));
        assert_eq!(stored.img_url.as_deref(), Some("http://example.com/go.png"));

        let names: Vec<&str> = stored.authors.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Rob Pike", "Ken Thompson"]);
        assert!(stored.authors.iter().all(|a| a.id > 0));
    }

    #[test]
    fn authors_are_reused_across_books() {
        let mut conn = open_in_memory().unwrap();
        submit_book(&mut conn, &go_book()).unwrap();
        submit_book(
            &mut conn,
            &NewBook {
                isbn: "978-1".to_string(),
                title: "The Practice of Programming".to_string(),
                authors: "Brian Kernighan,Rob Pike".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        let first = get_book(&conn, "978-0").unwrap();
        let second = get_book(&conn, "978-1").unwrap();
        assert_eq!(first.authors[0].name, "Rob Pike");
        assert_eq!(second.authors[1].name, "Rob Pike");
        assert_eq!(first.authors[0].id, second.authors[1].id);
        assert_eq!(count(&conn, "authors"), 3);

        // submission order, not id order
        let names: Vec<&str> = second.authors.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Brian Kernighan", "Rob Pike"]);
    }

    #[test]
    fn duplicate_isbn_rolls_back() {
        let mut conn = open_in_memory().unwrap();
        submit_book(&mut conn, &go_book()).unwrap();
        let before = get_book(&conn, "978-0").unwrap();

        let err = submit_book(
            &mut conn,
            &NewBook {
                title: "Overwrite".to_string(),
                authors: "Someone New".to_string(),
                ..go_book()
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateIsbn(ref isbn) if isbn == "978-0"));

        assert_eq!(get_book(&conn, "978-0").unwrap(), before);
        assert_eq!(count(&conn, "authors"), 2);
        assert_eq!(count(&conn, "book_authors"), 2);
    }

    #[test]
    fn failing_association_rolls_back_everything() {
        let mut conn = open_in_memory().unwrap();
        let err = submit_book(
            &mut conn,
            &NewBook {
                authors: "Fresh Author, Rob Pike, Rob Pike".to_string(),
                ..go_book()
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::Database(_)));

        assert_eq!(count(&conn, "books"), 0);
        assert_eq!(count(&conn, "authors"), 0);
        assert_eq!(count(&conn, "book_authors"), 0);
    }

    #[test]
    fn trailing_comma_creates_empty_author() {
        let mut conn = open_in_memory().unwrap();
        submit_book(
            &mut conn,
            &NewBook {
                authors: "Rob Pike,".to_string(),
                ..go_book()
            },
        )
        .unwrap();

        let names: Vec<String> = get_book(&conn, "978-0")
            .unwrap()
            .authors
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["Rob Pike".to_string(), String::new()]);
    }

    #[test]
    fn missing_book_is_not_found() {
        let conn = open_in_memory().unwrap();
        let err = get_book(&conn, "nope").unwrap_err();
        assert!(matches!(err, Error::NotFound(ref isbn) if isbn == "nope"));
    }

    #[test]
    fn listings_cover_every_stored_book() {
        let mut conn = open_in_memory().unwrap();
        assert!(list_books(&conn).unwrap().is_empty());
        assert!(list_isbns(&conn).unwrap().is_empty());

        submit_book(&mut conn, &go_book()).unwrap();
        submit_book(
            &mut conn,
            &NewBook {
                isbn: "978-1".to_string(),
                title: "Unix".to_string(),
                authors: "Ken Thompson".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
        let _ = submit_book(&mut conn, &go_book());

        let mut isbns = list_isbns(&conn).unwrap();
        isbns.sort();
        assert_eq!(isbns, vec!["978-0", "978-1"]);

        let books = list_books(&conn).unwrap();
        assert_eq!(books.len(), 2);
        let unix = books.iter().find(|b| b.isbn == "978-1").unwrap();
        assert_eq!(unix.year, None);
        assert_eq!(unix.authors.len(), 1);
        assert_eq!(unix.authors[0].name, "Ken Thompson");
    }

    #[test]
    fn library_handle_shares_one_connection() {
        let library = Library::in_memory().unwrap();
        let clone = library.clone();
        clone.submit_book(&go_book()).unwrap();

        assert_eq!(library.list_isbns().unwrap(), vec!["978-0"]);
        assert_eq!(library.get_book("978-0").unwrap().authors.len(), 2);
        assert_eq!(library.list_books().unwrap().len(), 1);
    }
}
