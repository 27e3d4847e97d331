//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for tests and questions.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Write paths validate records before SQL mutations.
//! - Repository APIs return semantic errors (`TestNotFound`,
//!   `QuestionNotFound`) in addition to DB transport errors.
//! - Multi-statement writes run in one immediate transaction.

use crate::db::migrations::latest_version;
use rusqlite::Connection;

pub mod question_repo;
pub mod test_repo;

const REQUIRED_TABLES: &[&str] = &["tests", "test_tags", "questions", "tests_fts"];

/// Verifies that `conn` is migrated to the schema this binary expects.
pub(crate) fn ensure_connection_ready(conn: &Connection) -> test_repo::RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(test_repo::RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in REQUIRED_TABLES {
        if !table_exists(conn, table)? {
            return Err(test_repo::RepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> test_repo::RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
