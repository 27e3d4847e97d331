//! SQLite FTS5-based test search.
//!
//! # Responsibility
//! - Provide keyword search over test title and description.
//! - Build safe MATCH expressions from free user input.
//!
//! # Invariants
//! - User terms are always quoted; raw FTS5 syntax is never passed through.
//! - A test matches when any term matches (stemmed via `porter`).
//! - Result ordering is deterministic by rank, then `created_at DESC`.

use crate::db::DbError;
use crate::model::test::TestId;
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Result type for search APIs.
pub type SearchResult<T> = Result<T, SearchError>;

/// Search-layer error for DB interaction and result decoding.
#[derive(Debug)]
pub enum SearchError {
    Db(DbError),
    InvalidData(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid search row: {message}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Search options for ranked test lookup.
#[derive(Debug, Clone)]
pub struct TestSearchQuery {
    /// User query text.
    pub text: String,
    /// Maximum number of hits to return.
    pub limit: u32,
}

impl TestSearchQuery {
    /// Creates a query with the default hit limit.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: 20,
        }
    }
}

/// Single search hit returned by [`search_tests`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSearchHit {
    pub test_id: TestId,
    pub title: String,
    /// Highlighted excerpt from the best matching column.
    pub snippet: String,
}

/// Searches tests via FTS5 and returns ranked results.
///
/// Returns an empty list for blank queries or a zero limit.
pub fn search_tests(
    conn: &Connection,
    query: &TestSearchQuery,
) -> SearchResult<Vec<TestSearchHit>> {
    let Some(match_expr) = build_match_expression(&query.text) else {
        return Ok(Vec::new());
    };
    if query.limit == 0 {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(
        "SELECT
            tests.uuid AS uuid,
            tests.title AS title,
            snippet(tests_fts, -1, '[', ']', ' ... ', 10) AS snippet
         FROM tests_fts
         JOIN tests ON tests.id = tests_fts.rowid
         WHERE tests_fts MATCH ?1
         ORDER BY bm25(tests_fts), tests.created_at DESC, tests.id DESC
         LIMIT ?2;",
    )?;
    let mut rows = stmt.query(params![match_expr, i64::from(query.limit)])?;
    let mut hits = Vec::new();
    while let Some(row) = rows.next()? {
        hits.push(parse_search_hit(row)?);
    }

    Ok(hits)
}

/// Builds an FTS5 MATCH expression that matches any of the given terms.
///
/// Returns `None` when `text` holds no terms.
pub(crate) fn build_match_expression(text: &str) -> Option<String> {
    let terms = text
        .split_whitespace()
        .map(escape_fts_term)
        .collect::<Vec<_>>();

    if terms.is_empty() {
        return None;
    }

    Some(terms.join(" OR "))
}

fn escape_fts_term(raw: &str) -> String {
    let escaped = raw.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

fn parse_search_hit(row: &Row<'_>) -> SearchResult<TestSearchHit> {
    let uuid_text: String = row.get("uuid")?;
    let test_id = Uuid::parse_str(&uuid_text)
        .map_err(|_| SearchError::InvalidData(format!("invalid uuid `{uuid_text}`")))?;

    Ok(TestSearchHit {
        test_id,
        title: row.get("title")?,
        snippet: row.get("snippet")?,
    })
}
