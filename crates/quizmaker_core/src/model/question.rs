//! Question domain model and shape validation.
//!
//! # Responsibility
//! - Define the canonical question record owned by one test.
//! - Enforce per-type structural rules on create and update payloads.
//!
//! # Invariants
//! - Type-conditional fields are carried by `QuestionBody`, so a question
//!   can never hold fields that do not match its type.
//! - `test_id` and question type never change after creation.
//! - `points >= 1` and `text` is non-blank with at most 500 chars.
//!
//! # See also
//! - `crate::scoring::scorer` for how answer keys are graded.

use crate::model::test::TestId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one question.
pub type QuestionId = Uuid;

/// Maximum question text length, counted in chars.
pub const QUESTION_TEXT_MAX_CHARS: usize = 500;
/// Points assigned when a create payload omits them.
pub const DEFAULT_POINTS: u32 = 1;

const MSG_TOO_FEW_OPTIONS: &str =
    "Single and multiple choice questions require at least 2 options";
const MSG_SINGLE_CORRECT: &str = "Single choice questions require exactly one correct answer";
const MSG_MULTIPLE_CORRECT: &str =
    "Multiple choice questions require at least one correct answer";
const MSG_TEXT_CORRECT: &str = "Text questions require a correct answer text";
const MSG_TEXT_REQUIRED: &str = "Question text is required";
const MSG_TEXT_TOO_LONG: &str = "Question text cannot be more than 500 characters";
const MSG_POINTS_MIN: &str = "Points must be at least 1";

/// Question kind, serialized as `single|multiple|text`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Exactly one correct option.
    #[default]
    Single,
    /// One or more correct options.
    Multiple,
    /// Free-text answer compared case-insensitively.
    Text,
}

impl QuestionType {
    /// Storage/wire name of this type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Multiple => "multiple",
            Self::Text => "text",
        }
    }

    /// Parses a storage/wire name. Returns `None` for unknown values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "single" => Some(Self::Single),
            "multiple" => Some(Self::Multiple),
            "text" => Some(Self::Text),
            _ => None,
        }
    }

    fn is_choice(self) -> bool {
        matches!(self, Self::Single | Self::Multiple)
    }
}

impl Display for QuestionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-conditional part of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionBody {
    Single {
        options: Vec<String>,
        #[serde(rename = "correctAnswers")]
        correct_answers: Vec<String>,
    },
    Multiple {
        options: Vec<String>,
        #[serde(rename = "correctAnswers")]
        correct_answers: Vec<String>,
    },
    Text {
        #[serde(rename = "correctAnswerText")]
        correct_answer_text: String,
    },
}

impl QuestionBody {
    /// Returns the question type this body belongs to.
    pub fn kind(&self) -> QuestionType {
        match self {
            Self::Single { .. } => QuestionType::Single,
            Self::Multiple { .. } => QuestionType::Multiple,
            Self::Text { .. } => QuestionType::Text,
        }
    }

    /// Options of a choice question, `None` for text questions.
    pub fn options(&self) -> Option<&[String]> {
        match self {
            Self::Single { options, .. } | Self::Multiple { options, .. } => Some(options),
            Self::Text { .. } => None,
        }
    }

    /// Correct answers of a choice question, `None` for text questions.
    pub fn correct_answers(&self) -> Option<&[String]> {
        match self {
            Self::Single {
                correct_answers, ..
            }
            | Self::Multiple {
                correct_answers, ..
            } => Some(correct_answers),
            Self::Text { .. } => None,
        }
    }

    /// Reference answer of a text question, `None` for choice questions.
    pub fn correct_answer_text(&self) -> Option<&str> {
        match self {
            Self::Text {
                correct_answer_text,
            } => Some(correct_answer_text),
            _ => None,
        }
    }

    /// Validates the structural rules for this body's type.
    pub fn validate(&self) -> Result<(), QuestionValidationError> {
        check_shape(
            self.kind(),
            self.options(),
            self.correct_answers(),
            self.correct_answer_text(),
        )
    }
}

/// Canonical question record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    /// Owning test. Serialized as `test` to match external schema naming.
    #[serde(rename = "test")]
    pub test_id: TestId,
    pub text: String,
    pub points: u32,
    #[serde(flatten)]
    pub body: QuestionBody,
}

impl Question {
    /// Returns this question's immutable type.
    pub fn kind(&self) -> QuestionType {
        self.body.kind()
    }

    /// Validates the full record, including the type-specific shape.
    pub fn validate(&self) -> Result<(), QuestionValidationError> {
        self.body.validate()?;
        check_text(&self.text)?;
        if self.points < 1 {
            return Err(QuestionValidationError::InvalidQuestionShape(MSG_POINTS_MIN));
        }
        Ok(())
    }

    /// Validates `patch` against this question and applies it in place.
    ///
    /// # Contract
    /// - Rejects a type change with `ImmutableField`.
    /// - Empty `text` and zero `points` are treated as not supplied.
    /// - Fields that do not belong to this question's type are ignored.
    /// - The patched record is re-validated before returning.
    /// - On error the question is left unchanged.
    pub fn apply_update(&mut self, patch: QuestionPatch) -> Result<(), QuestionValidationError> {
        validate_for_update(self, &patch)?;

        let mut updated = self.clone();
        if let Some(text) = patch.text.filter(|value| !value.is_empty()) {
            updated.text = text.trim().to_string();
        }
        if let Some(points) = patch.points.filter(|value| *value != 0) {
            updated.points = points;
        }

        match &mut updated.body {
            QuestionBody::Single {
                options,
                correct_answers,
            }
            | QuestionBody::Multiple {
                options,
                correct_answers,
            } => {
                if let Some(value) = patch.options {
                    *options = value;
                }
                if let Some(value) = patch.correct_answers {
                    *correct_answers = value;
                }
            }
            QuestionBody::Text {
                correct_answer_text,
            } => {
                if let Some(value) = patch.correct_answer_text.filter(|value| !value.is_empty()) {
                    *correct_answer_text = value;
                }
            }
        }

        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

/// Create payload for one question.
///
/// Mirrors the loosely-typed request body: choice fields and text fields are
/// all optional here and only checked against the declared type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestion {
    #[serde(rename = "type", default)]
    pub kind: QuestionType,
    #[serde(default)]
    pub text: String,
    pub options: Option<Vec<String>>,
    pub correct_answers: Option<Vec<String>>,
    pub correct_answer_text: Option<String>,
    pub points: Option<u32>,
}

impl NewQuestion {
    /// Validates this payload and builds a question owned by `test_id`.
    ///
    /// # Contract
    /// - Generates a fresh question ID.
    /// - `points` of `None` or `0` becomes `DEFAULT_POINTS`.
    /// - Only the fields relevant to `kind` are kept.
    pub fn into_question(self, test_id: TestId) -> Result<Question, QuestionValidationError> {
        validate_for_create(&self)?;

        let body = match self.kind {
            QuestionType::Single => QuestionBody::Single {
                options: self.options.unwrap_or_default(),
                correct_answers: self.correct_answers.unwrap_or_default(),
            },
            QuestionType::Multiple => QuestionBody::Multiple {
                options: self.options.unwrap_or_default(),
                correct_answers: self.correct_answers.unwrap_or_default(),
            },
            QuestionType::Text => QuestionBody::Text {
                correct_answer_text: self.correct_answer_text.unwrap_or_default(),
            },
        };

        let question = Question {
            id: Uuid::new_v4(),
            test_id,
            text: self.text.trim().to_string(),
            points: self
                .points
                .filter(|value| *value != 0)
                .unwrap_or(DEFAULT_POINTS),
            body,
        };
        question.validate()?;
        Ok(question)
    }
}

/// Partial update payload for one question.
///
/// `kind` may only repeat the current type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPatch {
    #[serde(rename = "type")]
    pub kind: Option<QuestionType>,
    pub text: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_answers: Option<Vec<String>>,
    pub correct_answer_text: Option<String>,
    pub points: Option<u32>,
}

/// Validation failure for question create/update payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionValidationError {
    /// A structural rule for the question type is violated.
    InvalidQuestionShape(&'static str),
    /// An attempt was made to change a field that is fixed after creation.
    ImmutableField(&'static str),
}

impl Display for QuestionValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuestionShape(message) => f.write_str(message),
            Self::ImmutableField(field) => write!(
                f,
                "Cannot change question {field}. Please delete and create a new question instead."
            ),
        }
    }
}

impl Error for QuestionValidationError {}

/// Checks a create payload against the rules for its declared type.
///
/// Pure; does not touch storage.
pub fn validate_for_create(payload: &NewQuestion) -> Result<(), QuestionValidationError> {
    check_shape(
        payload.kind,
        payload.options.as_deref(),
        payload.correct_answers.as_deref(),
        payload.correct_answer_text.as_deref(),
    )?;
    check_text(&payload.text)
}

/// Checks an update payload against an existing question.
///
/// Only supplied fields are checked. Text length rules are enforced by
/// `Question::validate` after the patch is applied.
pub fn validate_for_update(
    existing: &Question,
    patch: &QuestionPatch,
) -> Result<(), QuestionValidationError> {
    let kind = existing.kind();
    if patch.kind.is_some_and(|requested| requested != kind) {
        return Err(QuestionValidationError::ImmutableField("type"));
    }

    if kind.is_choice() && patch.options.as_ref().is_some_and(|v| v.len() < 2) {
        return Err(QuestionValidationError::InvalidQuestionShape(
            MSG_TOO_FEW_OPTIONS,
        ));
    }

    match kind {
        QuestionType::Single if patch.correct_answers.as_ref().is_some_and(|v| v.len() != 1) => {
            Err(QuestionValidationError::InvalidQuestionShape(
                MSG_SINGLE_CORRECT,
            ))
        }
        QuestionType::Multiple if patch.correct_answers.as_ref().is_some_and(Vec::is_empty) => {
            Err(QuestionValidationError::InvalidQuestionShape(
                MSG_MULTIPLE_CORRECT,
            ))
        }
        QuestionType::Text
            if patch
                .correct_answer_text
                .as_deref()
                .is_some_and(|v| v.trim().is_empty()) =>
        {
            Err(QuestionValidationError::InvalidQuestionShape(
                MSG_TEXT_CORRECT,
            ))
        }
        _ => Ok(()),
    }
}

fn check_shape(
    kind: QuestionType,
    options: Option<&[String]>,
    correct_answers: Option<&[String]>,
    correct_answer_text: Option<&str>,
) -> Result<(), QuestionValidationError> {
    if kind.is_choice() && options.map_or(0, <[String]>::len) < 2 {
        return Err(QuestionValidationError::InvalidQuestionShape(
            MSG_TOO_FEW_OPTIONS,
        ));
    }

    let correct_count = correct_answers.map_or(0, <[String]>::len);
    match kind {
        QuestionType::Single if correct_count != 1 => Err(
            QuestionValidationError::InvalidQuestionShape(MSG_SINGLE_CORRECT),
        ),
        QuestionType::Multiple if correct_count < 1 => Err(
            QuestionValidationError::InvalidQuestionShape(MSG_MULTIPLE_CORRECT),
        ),
        QuestionType::Text if correct_answer_text.map_or(true, |v| v.trim().is_empty()) => Err(
            QuestionValidationError::InvalidQuestionShape(MSG_TEXT_CORRECT),
        ),
        _ => Ok(()),
    }
}

fn check_text(text: &str) -> Result<(), QuestionValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(QuestionValidationError::InvalidQuestionShape(
            MSG_TEXT_REQUIRED,
        ));
    }
    if trimmed.chars().count() > QUESTION_TEXT_MAX_CHARS {
        return Err(QuestionValidationError::InvalidQuestionShape(
            MSG_TEXT_TOO_LONG,
        ));
    }
    Ok(())
}
