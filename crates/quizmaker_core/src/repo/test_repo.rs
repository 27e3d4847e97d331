//! Test repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and paged listing over `tests` + `test_tags`.
//! - Own the cascade delete of a test and all of its questions.
//!
//! # Invariants
//! - Write paths call `Test::validate()` / `NewTest::normalized()` first.
//! - Tag replacement and cascade delete are atomic.
//! - Listing is newest first; insertion order breaks `created_at` ties.

use crate::db::DbError;
use crate::model::question::{QuestionId, QuestionValidationError};
use crate::model::test::{NewTest, Test, TestId, TestSummary, TestValidationError};
use crate::repo::ensure_connection_ready;
use crate::repo::question_repo::delete_questions_of;
use crate::search::fts::build_match_expression;
use log::info;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const TESTS_DEFAULT_LIMIT: u32 = 10;
const TESTS_DEFAULT_PAGE: u32 = 1;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for test/question persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    InvalidTest(TestValidationError),
    InvalidQuestion(QuestionValidationError),
    Db(DbError),
    TestNotFound(TestId),
    QuestionNotFound(QuestionId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTest(err) => write!(f, "{err}"),
            Self::InvalidQuestion(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::TestNotFound(id) => write!(f, "test not found: {id}"),
            Self::QuestionNotFound(id) => write!(f, "question not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "quiz repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "quiz repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted quiz data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidTest(err) => Some(err),
            Self::InvalidQuestion(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TestValidationError> for RepoError {
    fn from(value: TestValidationError) -> Self {
        Self::InvalidTest(value)
    }
}

impl From<QuestionValidationError> for RepoError {
    fn from(value: QuestionValidationError) -> Self {
        Self::InvalidQuestion(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Query options for listing tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestListQuery {
    /// Full-text terms over title/description; any term may match.
    pub search: Option<String>,
    /// Exact tag filter.
    pub tag: Option<String>,
    /// 1-based page. `None` or `0` means the first page.
    pub page: Option<u32>,
    /// Page size. `None` or `0` means 10.
    pub limit: Option<u32>,
}

/// One page of listed tests.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TestPage {
    /// Number of tests matching the filters, ignoring paging.
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub tests: Vec<TestSummary>,
}

/// Repository interface for test CRUD operations.
pub trait TestRepository {
    fn create_test(&self, test: &NewTest) -> RepoResult<TestId>;
    /// Loads one test with its ordered question ids.
    fn get_test(&self, id: TestId) -> RepoResult<Option<Test>>;
    fn list_tests(&self, query: &TestListQuery) -> RepoResult<TestPage>;
    /// Persists title, description and tags. Question ids are ignored.
    fn update_test(&self, test: &Test) -> RepoResult<()>;
    /// Deletes the test and all of its questions in one transaction.
    fn delete_test(&self, id: TestId) -> RepoResult<()>;
}

/// SQLite-backed test repository.
pub struct SqliteTestRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTestRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TestRepository for SqliteTestRepository<'_> {
    fn create_test(&self, test: &NewTest) -> RepoResult<TestId> {
        let normalized = test.normalized()?;
        let id = Uuid::new_v4();
        let id_text = id.to_string();

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO tests (uuid, title, description) VALUES (?1, ?2, ?3);",
            params![
                id_text.as_str(),
                normalized.title.as_str(),
                normalized.description.as_str()
            ],
        )?;
        replace_tags(&tx, id_text.as_str(), &normalized.tags)?;
        tx.commit()?;

        Ok(id)
    }

    fn get_test(&self, id: TestId) -> RepoResult<Option<Test>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, title, description, created_at, updated_at
             FROM tests
             WHERE uuid = ?1;",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let summary = parse_test_row(self.conn, row)?;
        let question_ids = load_question_ids(self.conn, &summary.id.to_string())?;
        Ok(Some(Test {
            id: summary.id,
            title: summary.title,
            description: summary.description,
            tags: summary.tags,
            question_ids,
            created_at: summary.created_at,
            updated_at: summary.updated_at,
        }))
    }

    fn list_tests(&self, query: &TestListQuery) -> RepoResult<TestPage> {
        let page = normalize_page(query.page);
        let limit = normalize_limit(query.limit);

        let mut filter_sql = String::from(" FROM tests WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(tag) = query.tag.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            filter_sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM test_tags tt
                    WHERE tt.test_uuid = tests.uuid
                      AND tt.tag = ?
                )",
            );
            bind_values.push(Value::Text(tag.to_string()));
        }

        if let Some(match_expr) = query.search.as_deref().and_then(build_match_expression) {
            filter_sql.push_str(
                " AND tests.id IN (
                    SELECT rowid FROM tests_fts WHERE tests_fts MATCH ?
                )",
            );
            bind_values.push(Value::Text(match_expr));
        }

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*){filter_sql};"),
            params_from_iter(bind_values.iter()),
            |row| row.get(0),
        )?;

        let offset = i64::from(page - 1) * i64::from(limit);
        let mut sql = format!(
            "SELECT uuid, title, description, created_at, updated_at{filter_sql}
             ORDER BY created_at DESC, id DESC
             LIMIT ? OFFSET ?"
        );
        sql.push(';');
        bind_values.push(Value::Integer(i64::from(limit)));
        bind_values.push(Value::Integer(offset));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tests = Vec::new();
        while let Some(row) = rows.next()? {
            tests.push(parse_test_row(self.conn, row)?);
        }

        Ok(TestPage {
            total: u64::try_from(total).unwrap_or_default(),
            page,
            limit,
            tests,
        })
    }

    fn update_test(&self, test: &Test) -> RepoResult<()> {
        test.validate()?;
        let id_text = test.id.to_string();

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE tests
             SET
                title = ?2,
                description = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![
                id_text.as_str(),
                test.title.as_str(),
                test.description.as_str()
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::TestNotFound(test.id));
        }

        replace_tags(&tx, id_text.as_str(), &test.tags)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_test(&self, id: TestId) -> RepoResult<()> {
        let id_text = id.to_string();

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let removed_questions = delete_questions_of(&tx, id_text.as_str())?;
        let changed = tx.execute("DELETE FROM tests WHERE uuid = ?1;", [id_text.as_str()])?;
        if changed == 0 {
            return Err(RepoError::TestNotFound(id));
        }
        tx.commit()?;

        info!(
            "event=test_delete module=repo status=ok removed_questions={}",
            removed_questions
        );
        Ok(())
    }
}

/// Normalizes a requested page number. `None`/`0` become the first page.
pub fn normalize_page(page: Option<u32>) -> u32 {
    match page {
        Some(0) | None => TESTS_DEFAULT_PAGE,
        Some(value) => value,
    }
}

/// Normalizes a requested page size. `None`/`0` become the default.
pub fn normalize_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => TESTS_DEFAULT_LIMIT,
        Some(value) => value,
    }
}

fn parse_test_row(conn: &Connection, row: &Row<'_>) -> RepoResult<TestSummary> {
    let uuid_text: String = row.get("uuid")?;
    let id = parse_uuid(&uuid_text, "tests.uuid")?;
    let tags = load_tags(conn, &uuid_text)?;

    Ok(TestSummary {
        id,
        title: row.get("title")?,
        description: row.get("description")?,
        tags,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn load_tags(conn: &Connection, test_uuid: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT tag
         FROM test_tags
         WHERE test_uuid = ?1
         ORDER BY tag ASC;",
    )?;
    let mut rows = stmt.query([test_uuid])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        tags.push(row.get(0)?);
    }
    Ok(tags)
}

fn load_question_ids(conn: &Connection, test_uuid: &str) -> RepoResult<Vec<QuestionId>> {
    let mut stmt = conn.prepare(
        "SELECT uuid
         FROM questions
         WHERE test_uuid = ?1
         ORDER BY position ASC, uuid ASC;",
    )?;
    let mut rows = stmt.query([test_uuid])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, "questions.uuid")?);
    }
    Ok(ids)
}

fn replace_tags(tx: &Transaction<'_>, test_uuid: &str, tags: &[String]) -> RepoResult<()> {
    tx.execute("DELETE FROM test_tags WHERE test_uuid = ?1;", [test_uuid])?;
    for tag in tags {
        tx.execute(
            "INSERT OR IGNORE INTO test_tags (test_uuid, tag) VALUES (?1, ?2);",
            params![test_uuid, tag.as_str()],
        )?;
    }
    Ok(())
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}
