//! Test use-case service.
//!
//! # Responsibility
//! - Provide create/get/list/update/delete APIs for tests.
//! - Resolve a test's questions eagerly and score submitted answers.
//!
//! # Invariants
//! - Deleting a test removes all of its questions in the same transaction.
//! - Answer payloads are checked before the test is looked up.
//! - Scoring always uses the test's current question order.

use crate::model::answer::{AnswerSheet, MalformedAnswerPayload};
use crate::model::question::Question;
use crate::model::test::{NewTest, Test, TestId, TestPatch, TestValidationError};
use crate::repo::question_repo::QuestionRepository;
use crate::repo::test_repo::{RepoError, TestListQuery, TestPage, TestRepository};
use crate::scoring::scorer::{score, QuestionResult, ScoreSummary};
use log::info;
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for test use-cases.
#[derive(Debug)]
pub enum TestServiceError {
    /// Title/description rule violated.
    Validation(TestValidationError),
    /// Target test does not exist.
    TestNotFound(TestId),
    /// Scoring input is not a question-id -> answer mapping.
    MalformedAnswerPayload(MalformedAnswerPayload),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl TestServiceError {
    /// Returns `true` when the caller sent a bad request rather than the
    /// server failing.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::TestNotFound(_) | Self::MalformedAnswerPayload(_)
        )
    }
}

impl Display for TestServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::TestNotFound(id) => write!(f, "Test not found: {id}"),
            Self::MalformedAnswerPayload(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent test state: {details}"),
        }
    }
}

impl Error for TestServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::MalformedAnswerPayload(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TestValidationError> for TestServiceError {
    fn from(value: TestValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<MalformedAnswerPayload> for TestServiceError {
    fn from(value: MalformedAnswerPayload) -> Self {
        Self::MalformedAnswerPayload(value)
    }
}

impl From<RepoError> for TestServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::InvalidTest(err) => Self::Validation(err),
            RepoError::TestNotFound(id) => Self::TestNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// A test with its questions resolved in list order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestWithQuestions {
    pub test: Test,
    pub questions: Vec<Question>,
}

/// Result of checking submitted answers against one test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerCheck {
    pub test_id: TestId,
    pub results: Vec<QuestionResult>,
    pub summary: ScoreSummary,
}

/// Test service facade over test and question repositories.
pub struct TestService<T: TestRepository, Q: QuestionRepository> {
    tests: T,
    questions: Q,
}

impl<T: TestRepository, Q: QuestionRepository> TestService<T, Q> {
    /// Creates a service using the provided repository implementations.
    pub fn new(tests: T, questions: Q) -> Self {
        Self { tests, questions }
    }

    /// Creates one empty test.
    pub fn create_test(&self, payload: &NewTest) -> Result<Test, TestServiceError> {
        let id = self.tests.create_test(payload)?;
        info!("event=test_create module=service status=ok");
        self.tests
            .get_test(id)?
            .ok_or(TestServiceError::InconsistentState(
                "created test not found in read-back",
            ))
    }

    /// Gets one test with its ordered question ids.
    pub fn get_test(&self, id: TestId) -> Result<Test, TestServiceError> {
        self.tests
            .get_test(id)?
            .ok_or(TestServiceError::TestNotFound(id))
    }

    /// Gets one test with its questions resolved.
    pub fn get_test_with_questions(
        &self,
        id: TestId,
    ) -> Result<TestWithQuestions, TestServiceError> {
        let test = self.get_test(id)?;
        let questions = self.questions.list_questions_for_test(id)?;
        Ok(TestWithQuestions { test, questions })
    }

    /// Lists tests with paging, optional tag filter and text search.
    pub fn list_tests(&self, query: &TestListQuery) -> Result<TestPage, TestServiceError> {
        self.tests.list_tests(query).map_err(Into::into)
    }

    /// Applies a partial update to one test.
    pub fn update_test(&self, id: TestId, patch: TestPatch) -> Result<Test, TestServiceError> {
        let mut test = self.get_test(id)?;
        test.apply_update(patch)?;
        self.tests.update_test(&test)?;
        self.tests
            .get_test(id)?
            .ok_or(TestServiceError::InconsistentState(
                "updated test not found in read-back",
            ))
    }

    /// Deletes one test together with all of its questions.
    pub fn delete_test(&self, id: TestId) -> Result<(), TestServiceError> {
        self.tests.delete_test(id).map_err(Into::into)
    }

    /// Scores a raw JSON answer payload against one test.
    ///
    /// # Errors
    /// - `MalformedAnswerPayload` when `answers` is not a mapping of
    ///   question id to string or string array.
    /// - `TestNotFound` when the test does not exist.
    pub fn check_answers(
        &self,
        id: TestId,
        answers: &Value,
    ) -> Result<AnswerCheck, TestServiceError> {
        let sheet = AnswerSheet::from_json(answers)?;
        self.check_answer_sheet(id, &sheet)
    }

    /// Scores an already-parsed answer sheet against one test.
    pub fn check_answer_sheet(
        &self,
        id: TestId,
        sheet: &AnswerSheet,
    ) -> Result<AnswerCheck, TestServiceError> {
        let resolved = self.get_test_with_questions(id)?;
        let report = score(&resolved.questions, sheet);
        info!(
            "event=answers_check module=service status=ok questions={} percentage={}",
            report.summary.total_questions, report.summary.percentage_score
        );

        Ok(AnswerCheck {
            test_id: id,
            results: report.results,
            summary: report.summary,
        })
    }
}
