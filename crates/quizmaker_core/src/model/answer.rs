//! Submitted answers and their boundary coercion.
//!
//! # Responsibility
//! - Represent one submitted value as a scalar or a collection of strings.
//! - Turn an arbitrary JSON payload into an answer sheet, rejecting shapes
//!   that are not a mapping of question id to string/string-array.
//!
//! # Invariants
//! - Answer sheet keys are kept verbatim; lookup uses the hyphenated
//!   lowercase form of `QuestionId`.

use crate::model::question::QuestionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One submitted answer value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Scalar(String),
    Collection(Vec<String>),
}

impl Answer {
    /// Returns the scalar value, or `None` for collections.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::Collection(_) => None,
        }
    }

    /// Coerces this answer to a sequence; a scalar becomes one element.
    pub fn to_collection(&self) -> Vec<&str> {
        match self {
            Self::Scalar(value) => vec![value.as_str()],
            Self::Collection(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for Answer {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<String> for Answer {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<String>> for Answer {
    fn from(value: Vec<String>) -> Self {
        Self::Collection(value)
    }
}

impl From<Vec<&str>> for Answer {
    fn from(value: Vec<&str>) -> Self {
        Self::Collection(value.into_iter().map(str::to_string).collect())
    }
}

/// Submitted answers keyed by question id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSheet {
    answers: HashMap<String, Answer>,
}

impl AnswerSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an answer for `question_id`, replacing any previous one.
    pub fn insert(&mut self, question_id: QuestionId, answer: impl Into<Answer>) {
        self.answers.insert(question_id.to_string(), answer.into());
    }

    /// Builder form of [`AnswerSheet::insert`].
    pub fn with(mut self, question_id: QuestionId, answer: impl Into<Answer>) -> Self {
        self.insert(question_id, answer);
        self
    }

    /// Returns the answer submitted for `question_id`, if any.
    pub fn get(&self, question_id: QuestionId) -> Option<&Answer> {
        self.answers.get(&question_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Builds an answer sheet from a JSON payload.
    ///
    /// # Errors
    /// - `NotAMapping` when `payload` is not a JSON object.
    /// - `InvalidValue` when a value is neither a string nor an array of
    ///   strings (including `null`).
    pub fn from_json(payload: &Value) -> Result<Self, MalformedAnswerPayload> {
        let Value::Object(entries) = payload else {
            return Err(MalformedAnswerPayload::NotAMapping);
        };

        let mut answers = HashMap::with_capacity(entries.len());
        for (key, value) in entries {
            let answer = Answer::deserialize(value).map_err(|_| {
                MalformedAnswerPayload::InvalidValue {
                    question_key: key.clone(),
                    found: json_kind(value),
                }
            })?;
            answers.insert(key.clone(), answer);
        }

        Ok(Self { answers })
    }

    /// Parses a JSON document and builds an answer sheet from it.
    pub fn from_json_str(payload: &str) -> Result<Self, MalformedAnswerPayload> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|err| MalformedAnswerPayload::InvalidJson(err.to_string()))?;
        Self::from_json(&value)
    }
}

/// Scoring input that cannot be read as question-id -> answer mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedAnswerPayload {
    /// Payload is not valid JSON.
    InvalidJson(String),
    /// Payload is valid JSON but not an object.
    NotAMapping,
    /// One value is neither a string nor an array of strings. `found`
    /// names the JSON kind that was submitted instead.
    InvalidValue {
        question_key: String,
        found: &'static str,
    },
}

impl Display for MalformedAnswerPayload {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidJson(message) => write!(f, "answers are not valid JSON: {message}"),
            Self::NotAMapping => write!(f, "Answers must be provided as an object"),
            Self::InvalidValue {
                question_key,
                found,
            } => write!(
                f,
                "answer for question `{question_key}` must be a string or an array of strings, got {found}"
            ),
        }
    }
}

impl Error for MalformedAnswerPayload {}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array with non-string items",
        Value::Object(_) => "object",
    }
}
