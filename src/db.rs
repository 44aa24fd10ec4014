use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{Connection, Row};

use crate::record::BookRecord;

const SCRAPED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const BOOK_COLUMNS: &str = "title, author, publisher, publication_year, pages, dimensions,
     registration_number, isbn, dewey_code, price, storage_location, language,
     document_type, availability, keywords, subject, department, summary,
     cover_image, url";

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating database directory {}", dir.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("opening database {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS books (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            title               TEXT NOT NULL DEFAULT '',
            author              TEXT NOT NULL DEFAULT '',
            publisher           TEXT NOT NULL DEFAULT '',
            publication_year    INTEGER NOT NULL DEFAULT 0,
            pages               TEXT NOT NULL DEFAULT '',
            dimensions          TEXT NOT NULL DEFAULT '',
            registration_number TEXT NOT NULL DEFAULT '',
            isbn                TEXT NOT NULL DEFAULT '',
            dewey_code          TEXT NOT NULL DEFAULT '',
            price               TEXT NOT NULL DEFAULT '',
            storage_location    TEXT NOT NULL DEFAULT '',
            language            TEXT NOT NULL DEFAULT '',
            document_type       TEXT NOT NULL DEFAULT '',
            availability        TEXT NOT NULL DEFAULT '',
            keywords            TEXT NOT NULL DEFAULT '',
            subject             TEXT NOT NULL DEFAULT '',
            department          TEXT NOT NULL DEFAULT '',
            summary             TEXT NOT NULL DEFAULT '',
            cover_image         TEXT NOT NULL DEFAULT '',
            url                 TEXT NOT NULL DEFAULT '',
            scraped_at          TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );
        CREATE INDEX IF NOT EXISTS idx_books_language ON books(language);
        ",
    )?;
    Ok(())
}

/// Insert a batch in one transaction. Absent values go in as '' (or 0 for the year).
pub fn save_books(conn: &Connection, books: &[BookRecord]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO books ({BOOK_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)"
        ))?;
        for b in books {
            stmt.execute(rusqlite::params![
                text(&b.title),
                text(&b.author),
                text(&b.publisher),
                b.publication_year.unwrap_or(0),
                text(&b.pages),
                text(&b.dimensions),
                text(&b.registration_number),
                text(&b.isbn),
                text(&b.dewey_code),
                text(&b.price),
                text(&b.storage_location),
                text(&b.language),
                text(&b.document_type),
                text(&b.availability),
                text(&b.keywords),
                text(&b.subject),
                text(&b.department),
                text(&b.summary),
                text(&b.cover_image),
                b.url,
            ])?;
        }
    }
    tx.commit()?;
    Ok(books.len())
}

fn text(v: &Option<String>) -> &str {
    v.as_deref().unwrap_or("")
}

fn opt(v: String) -> Option<String> {
    if v.is_empty() {
        None
    } else {
        Some(v)
    }
}

/// A saved record with its row id and insertion time.
#[derive(Debug, Clone)]
pub struct StoredBook {
    pub id: i64,
    pub scraped_at: Option<NaiveDateTime>,
    pub book: BookRecord,
}

fn stored_book(row: &Row<'_>) -> rusqlite::Result<StoredBook> {
    let year: i64 = row.get(4)?;
    let scraped_at: Option<String> = row.get(21)?;
    Ok(StoredBook {
        id: row.get(0)?,
        scraped_at: scraped_at
            .and_then(|s| NaiveDateTime::parse_from_str(&s, SCRAPED_AT_FORMAT).ok()),
        book: BookRecord {
            title: opt(row.get(1)?),
            author: opt(row.get(2)?),
            publisher: opt(row.get(3)?),
            publication_year: i32::try_from(year).ok().filter(|y| *y != 0),
            pages: opt(row.get(5)?),
            dimensions: opt(row.get(6)?),
            registration_number: opt(row.get(7)?),
            isbn: opt(row.get(8)?),
            dewey_code: opt(row.get(9)?),
            price: opt(row.get(10)?),
            storage_location: opt(row.get(11)?),
            language: opt(row.get(12)?),
            document_type: opt(row.get(13)?),
            availability: opt(row.get(14)?),
            keywords: opt(row.get(15)?),
            subject: opt(row.get(16)?),
            department: opt(row.get(17)?),
            summary: opt(row.get(18)?),
            cover_image: opt(row.get(19)?),
            url: row.get(20)?,
        },
    })
}

/// Rows in insertion order.
pub fn fetch_books(conn: &Connection) -> Result<Vec<StoredBook>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, {BOOK_COLUMNS}, scraped_at FROM books ORDER BY id"
    ))?;
    let rows = stmt
        .query_map([], stored_book)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Most recent rows first.
pub fn latest_books(conn: &Connection, limit: usize) -> Result<Vec<StoredBook>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, {BOOK_COLUMNS}, scraped_at FROM books ORDER BY id DESC LIMIT ?1"
    ))?;
    let rows = stmt
        .query_map([limit as i64], stored_book)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn count_books(conn: &Connection) -> Result<usize> {
    let n: usize = conn.query_row("SELECT COUNT(*) FROM books", [], |r| r.get(0))?;
    Ok(n)
}

/// (language, count), most common first; blank language counts as "unknown".
pub fn language_breakdown(conn: &Connection) -> Result<Vec<(String, usize)>> {
    let mut stmt = conn.prepare(
        "SELECT CASE WHEN language = '' THEN 'unknown' ELSE language END AS lang, COUNT(*) AS n
         FROM books
         GROUP BY lang
         ORDER BY n DESC, lang",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}
