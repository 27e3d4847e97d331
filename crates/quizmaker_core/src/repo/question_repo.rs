//! Question repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `questions`, scoped to an owning test.
//! - Keep each test's question order in the `position` column.
//!
//! # Invariants
//! - A question is appended to the end of its test's list on create.
//! - Updates never rewrite `type` or `test_uuid`; both are fixed at create.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::model::question::{Question, QuestionBody, QuestionId, QuestionType};
use crate::model::test::TestId;
use crate::repo::ensure_connection_ready;
use crate::repo::test_repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const QUESTION_SELECT_SQL: &str = "SELECT
    uuid,
    test_uuid,
    type,
    text,
    points,
    options_json,
    correct_answers_json,
    correct_answer_text
FROM questions";

/// Repository interface for question CRUD operations.
pub trait QuestionRepository {
    /// Appends a question to its owning test.
    fn create_question(&self, question: &Question) -> RepoResult<QuestionId>;
    fn get_question(&self, id: QuestionId) -> RepoResult<Option<Question>>;
    /// Lists a test's questions in list order.
    fn list_questions_for_test(&self, test_id: TestId) -> RepoResult<Vec<Question>>;
    /// Persists text, points and type-specific fields.
    fn update_question(&self, question: &Question) -> RepoResult<()>;
    /// Deletes one question and removes it from its test's list.
    fn delete_question(&self, id: QuestionId) -> RepoResult<()>;
    /// Deletes every question owned by `test_id`, returning the count.
    fn delete_questions_for_test(&self, test_id: TestId) -> RepoResult<usize>;
    /// Returns whether a test with `test_id` exists.
    fn test_exists(&self, test_id: TestId) -> RepoResult<bool>;
}

/// SQLite-backed question repository.
pub struct SqliteQuestionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteQuestionRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl QuestionRepository for SqliteQuestionRepository<'_> {
    fn create_question(&self, question: &Question) -> RepoResult<QuestionId> {
        question.validate()?;
        let columns = BodyColumns::encode(&question.body)?;
        let test_uuid = question.test_id.to_string();

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !test_exists_in_tx(&tx, test_uuid.as_str())? {
            return Err(RepoError::TestNotFound(question.test_id));
        }

        let position: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM questions WHERE test_uuid = ?1;",
            [test_uuid.as_str()],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO questions (
                uuid,
                test_uuid,
                position,
                type,
                text,
                points,
                options_json,
                correct_answers_json,
                correct_answer_text
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                question.id.to_string(),
                test_uuid.as_str(),
                position,
                question.kind().as_str(),
                question.text.as_str(),
                i64::from(question.points),
                columns.options_json,
                columns.correct_answers_json,
                columns.correct_answer_text,
            ],
        )?;
        touch_test(&tx, test_uuid.as_str())?;
        tx.commit()?;

        Ok(question.id)
    }

    fn get_question(&self, id: QuestionId) -> RepoResult<Option<Question>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{QUESTION_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_question_row(row)?));
        }
        Ok(None)
    }

    fn list_questions_for_test(&self, test_id: TestId) -> RepoResult<Vec<Question>> {
        let mut stmt = self.conn.prepare(&format!(
            "{QUESTION_SELECT_SQL}
             WHERE test_uuid = ?1
             ORDER BY position ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([test_id.to_string()])?;
        let mut questions = Vec::new();
        while let Some(row) = rows.next()? {
            questions.push(parse_question_row(row)?);
        }
        Ok(questions)
    }

    fn update_question(&self, question: &Question) -> RepoResult<()> {
        question.validate()?;
        let columns = BodyColumns::encode(&question.body)?;
        let changed = self.conn.execute(
            "UPDATE questions
             SET
                text = ?3,
                points = ?4,
                options_json = ?5,
                correct_answers_json = ?6,
                correct_answer_text = ?7,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND type = ?2;",
            params![
                question.id.to_string(),
                question.kind().as_str(),
                question.text.as_str(),
                i64::from(question.points),
                columns.options_json,
                columns.correct_answers_json,
                columns.correct_answer_text,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::QuestionNotFound(question.id));
        }
        Ok(())
    }

    fn delete_question(&self, id: QuestionId) -> RepoResult<()> {
        let id_text = id.to_string();

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let test_uuid: Option<String> = tx
            .query_row(
                "SELECT test_uuid FROM questions WHERE uuid = ?1;",
                [id_text.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(test_uuid) = test_uuid else {
            return Err(RepoError::QuestionNotFound(id));
        };

        tx.execute("DELETE FROM questions WHERE uuid = ?1;", [id_text.as_str()])?;
        touch_test(&tx, test_uuid.as_str())?;
        tx.commit()?;
        Ok(())
    }

    fn delete_questions_for_test(&self, test_id: TestId) -> RepoResult<usize> {
        delete_questions_of(self.conn, test_id.to_string().as_str())
    }

    fn test_exists(&self, test_id: TestId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tests WHERE uuid = ?1);",
            [test_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

/// Column projection of a `QuestionBody`.
struct BodyColumns {
    options_json: Option<String>,
    correct_answers_json: Option<String>,
    correct_answer_text: Option<String>,
}

impl BodyColumns {
    fn encode(body: &QuestionBody) -> RepoResult<Self> {
        match body {
            QuestionBody::Single {
                options,
                correct_answers,
            }
            | QuestionBody::Multiple {
                options,
                correct_answers,
            } => Ok(Self {
                options_json: Some(encode_strings(options)?),
                correct_answers_json: Some(encode_strings(correct_answers)?),
                correct_answer_text: None,
            }),
            QuestionBody::Text {
                correct_answer_text,
            } => Ok(Self {
                options_json: None,
                correct_answers_json: None,
                correct_answer_text: Some(correct_answer_text.clone()),
            }),
        }
    }
}

fn parse_question_row(row: &Row<'_>) -> RepoResult<Question> {
    let uuid_text: String = row.get("uuid")?;
    let id = parse_uuid(&uuid_text, "questions.uuid")?;
    let test_uuid_text: String = row.get("test_uuid")?;
    let test_id = parse_uuid(&test_uuid_text, "questions.test_uuid")?;

    let type_text: String = row.get("type")?;
    let kind = QuestionType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid question type `{type_text}` in questions.type"))
    })?;

    let points_raw: i64 = row.get("points")?;
    let points = u32::try_from(points_raw).map_err(|_| {
        RepoError::InvalidData(format!("invalid points value `{points_raw}` in questions.points"))
    })?;

    let body = match kind {
        QuestionType::Single | QuestionType::Multiple => {
            let options = decode_strings(row.get("options_json")?, "questions.options_json")?;
            let correct_answers = decode_strings(
                row.get("correct_answers_json")?,
                "questions.correct_answers_json",
            )?;
            if kind == QuestionType::Single {
                QuestionBody::Single {
                    options,
                    correct_answers,
                }
            } else {
                QuestionBody::Multiple {
                    options,
                    correct_answers,
                }
            }
        }
        QuestionType::Text => QuestionBody::Text {
            correct_answer_text: row
                .get::<_, Option<String>>("correct_answer_text")?
                .unwrap_or_default(),
        },
    };

    let question = Question {
        id,
        test_id,
        text: row.get("text")?,
        points,
        body,
    };
    question.validate()?;
    Ok(question)
}

fn encode_strings(values: &[String]) -> RepoResult<String> {
    serde_json::to_string(values)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode string list: {err}")))
}

fn decode_strings(value: Option<String>, column: &'static str) -> RepoResult<Vec<String>> {
    let Some(text) = value else {
        return Ok(Vec::new());
    };
    serde_json::from_str(&text)
        .map_err(|err| RepoError::InvalidData(format!("invalid string list in {column}: {err}")))
}

/// Removes every question owned by `test_uuid`. Also used by the test
/// cascade inside its transaction.
pub(crate) fn delete_questions_of(conn: &Connection, test_uuid: &str) -> RepoResult<usize> {
    Ok(conn.execute("DELETE FROM questions WHERE test_uuid = ?1;", [test_uuid])?)
}

fn test_exists_in_tx(tx: &Transaction<'_>, test_uuid: &str) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM tests WHERE uuid = ?1);",
        [test_uuid],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn touch_test(tx: &Transaction<'_>, test_uuid: &str) -> RepoResult<()> {
    tx.execute(
        "UPDATE tests
         SET updated_at = (strftime('%s', 'now') * 1000)
         WHERE uuid = ?1;",
        [test_uuid],
    )?;
    Ok(())
}
