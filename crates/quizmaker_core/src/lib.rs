//! Core domain logic for quizmaker.
//! Tests, their questions and answer scoring live here; transports only
//! translate requests into these services.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod scoring;
pub mod search;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::answer::{Answer, AnswerSheet, MalformedAnswerPayload};
pub use model::question::{
    NewQuestion, Question, QuestionBody, QuestionId, QuestionPatch, QuestionType,
    QuestionValidationError,
};
pub use model::test::{NewTest, Test, TestId, TestPatch, TestSummary, TestValidationError};
pub use repo::question_repo::{QuestionRepository, SqliteQuestionRepository};
pub use repo::test_repo::{
    RepoError, RepoResult, SqliteTestRepository, TestListQuery, TestPage, TestRepository,
};
pub use scoring::scorer::{score, QuestionResult, ScoreReport, ScoreSummary};
pub use search::fts::{search_tests, SearchError, SearchResult, TestSearchHit, TestSearchQuery};
pub use service::question_service::{QuestionService, QuestionServiceError};
pub use service::test_service::{AnswerCheck, TestService, TestServiceError, TestWithQuestions};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
