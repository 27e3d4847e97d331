//! Question use-case service.
//!
//! # Responsibility
//! - Validate question payloads before they reach persistence.
//! - Provide add/update/delete entry points scoped to an owning test.
//!
//! # Invariants
//! - A missing owner test is reported before payload validation errors.
//! - Updates go through `Question::apply_update`, so type stays fixed and
//!   falsy `text`/`points` are skipped.

use crate::model::question::{
    NewQuestion, Question, QuestionId, QuestionPatch, QuestionValidationError,
};
use crate::model::test::TestId;
use crate::repo::question_repo::QuestionRepository;
use crate::repo::test_repo::{RepoError, RepoResult};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for question use-cases.
#[derive(Debug)]
pub enum QuestionServiceError {
    /// Payload violates a question rule (`InvalidQuestionShape`/`ImmutableField`).
    Validation(QuestionValidationError),
    /// Owner test does not exist.
    TestNotFound(TestId),
    /// Target question does not exist.
    QuestionNotFound(QuestionId),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl QuestionServiceError {
    /// Returns `true` when the caller sent a bad request rather than the
    /// server failing.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::TestNotFound(_) | Self::QuestionNotFound(_)
        )
    }
}

impl Display for QuestionServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::TestNotFound(id) => write!(f, "Test not found: {id}"),
            Self::QuestionNotFound(id) => write!(f, "Question not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent question state: {details}")
            }
        }
    }
}

impl Error for QuestionServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<QuestionValidationError> for QuestionServiceError {
    fn from(value: QuestionValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for QuestionServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::InvalidQuestion(err) => Self::Validation(err),
            RepoError::TestNotFound(id) => Self::TestNotFound(id),
            RepoError::QuestionNotFound(id) => Self::QuestionNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Question service facade over repository implementations.
pub struct QuestionService<R: QuestionRepository> {
    repo: R,
}

impl<R: QuestionRepository> QuestionService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Validates `payload` and appends the new question to `test_id`.
    pub fn add_question(
        &self,
        test_id: TestId,
        payload: NewQuestion,
    ) -> Result<Question, QuestionServiceError> {
        if !self.repo.test_exists(test_id)? {
            return Err(QuestionServiceError::TestNotFound(test_id));
        }

        let question = payload.into_question(test_id)?;
        let question_id = self.repo.create_question(&question)?;
        info!(
            "event=question_add module=service status=ok type={} points={}",
            question.kind(),
            question.points
        );

        self.repo
            .get_question(question_id)?
            .ok_or(QuestionServiceError::InconsistentState(
                "created question not found in read-back",
            ))
    }

    /// Gets one question by stable ID.
    pub fn get_question(&self, id: QuestionId) -> RepoResult<Option<Question>> {
        self.repo.get_question(id)
    }

    /// Applies a partial update to one question.
    pub fn update_question(
        &self,
        id: QuestionId,
        patch: QuestionPatch,
    ) -> Result<Question, QuestionServiceError> {
        let mut question = self
            .repo
            .get_question(id)?
            .ok_or(QuestionServiceError::QuestionNotFound(id))?;

        question.apply_update(patch)?;
        self.repo.update_question(&question)?;

        self.repo
            .get_question(id)?
            .ok_or(QuestionServiceError::InconsistentState(
                "updated question not found in read-back",
            ))
    }

    /// Deletes one question and removes it from its test's list.
    pub fn delete_question(&self, id: QuestionId) -> Result<(), QuestionServiceError> {
        self.repo.delete_question(id)?;
        info!("event=question_delete module=service status=ok");
        Ok(())
    }
}
