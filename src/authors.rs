use rusqlite::{params, OptionalExtension, Transaction};

use crate::error::Result;

/// Splits the raw `authors` form value on commas.
///
/// Nothing is filtered out: a trailing or doubled comma yields an empty
/// token, which [`resolve_author`] stores as an author with an empty name.
pub fn split_author_names(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',')
}

/// Maps an author name to its id, inserting a new author when the trimmed
/// name has not been seen before.
///
/// Lookup and insert are two statements inside the caller's transaction,
/// so two concurrent submissions of the same new name can both insert.
/// `authors.name` carries no unique constraint to catch that.
pub fn resolve_author(tx: &Transaction<'_>, name: &str) -> Result<i64> {
    let name = name.trim();

    let existing: Option<i64> = tx
        .query_row(
            "SELECT id FROM authors WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(id) = existing {
        return Ok(id);
    }

    tx.execute("INSERT INTO authors (name) VALUES (?1)", params![name])?;
    let id = tx.last_insert_rowid();
    log::info!("created author {} ({:?})", id, name);
    Ok(id)
}
