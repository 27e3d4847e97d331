//! Test (question collection) domain model.
//!
//! # Responsibility
//! - Define the aggregate root that owns an ordered list of questions.
//! - Validate title/description limits and normalize tags.
//!
//! # Invariants
//! - `question_ids` only references questions whose `test_id` is this test.
//! - Title is 1..=100 chars and description 1..=500 chars after trimming.
//! - Tags are trimmed, non-blank and unique.

use crate::model::question::QuestionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one test.
pub type TestId = Uuid;

/// Maximum title length, counted in chars.
pub const TITLE_MAX_CHARS: usize = 100;
/// Maximum description length, counted in chars.
pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// Persisted test aggregate with its ordered question references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Test {
    pub id: TestId,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    /// Serialized as `questions` to match external schema naming.
    #[serde(rename = "questions")]
    pub question_ids: Vec<QuestionId>,
    /// Creation timestamp in epoch milliseconds.
    pub created_at: i64,
    /// Update timestamp in epoch milliseconds.
    pub updated_at: i64,
}

/// List projection of a test; omits the question list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    pub id: TestId,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Test> for TestSummary {
    fn from(value: Test) -> Self {
        Self {
            id: value.id,
            title: value.title,
            description: value.description,
            tags: value.tags,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// Create payload for one test. Tests always start without questions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewTest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewTest {
    /// Returns a trimmed/normalized copy after validating limits.
    pub fn normalized(&self) -> Result<Self, TestValidationError> {
        let normalized = Self {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            tags: normalize_tags(&self.tags),
        };
        validate_title_and_description(&normalized.title, &normalized.description)?;
        Ok(normalized)
    }
}

/// Partial update payload for one test.
///
/// Empty `title`/`description` values are treated as not supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TestPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl Test {
    /// Validates title/description limits.
    pub fn validate(&self) -> Result<(), TestValidationError> {
        validate_title_and_description(&self.title, &self.description)
    }

    /// Applies `patch` and re-validates. On error the test is left unchanged.
    pub fn apply_update(&mut self, patch: TestPatch) -> Result<(), TestValidationError> {
        let mut updated = self.clone();
        if let Some(title) = patch.title.filter(|value| !value.is_empty()) {
            updated.title = title.trim().to_string();
        }
        if let Some(description) = patch.description.filter(|value| !value.is_empty()) {
            updated.description = description.trim().to_string();
        }
        if let Some(tags) = patch.tags {
            updated.tags = normalize_tags(&tags);
        }

        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

/// Validation failure for test create/update payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestValidationError {
    TitleRequired,
    TitleTooLong { max_chars: usize },
    DescriptionRequired,
    DescriptionTooLong { max_chars: usize },
}

impl Display for TestValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TitleRequired => write!(f, "Test title is required"),
            Self::TitleTooLong { max_chars } => {
                write!(f, "Test title cannot be more than {max_chars} characters")
            }
            Self::DescriptionRequired => write!(f, "Test description is required"),
            Self::DescriptionTooLong { max_chars } => write!(
                f,
                "Test description cannot be more than {max_chars} characters"
            ),
        }
    }
}

impl Error for TestValidationError {}

/// Normalizes one tag value. Returns `None` for blank input.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Normalizes and deduplicates tag values. Output is sorted.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .filter_map(|tag| normalize_tag(tag))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn validate_title_and_description(
    title: &str,
    description: &str,
) -> Result<(), TestValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(TestValidationError::TitleRequired);
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(TestValidationError::TitleTooLong {
            max_chars: TITLE_MAX_CHARS,
        });
    }

    let description = description.trim();
    if description.is_empty() {
        return Err(TestValidationError::DescriptionRequired);
    }
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(TestValidationError::DescriptionTooLong {
            max_chars: DESCRIPTION_MAX_CHARS,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_test() -> Test {
        Test {
            id: Uuid::new_v4(),
            title: "Geography".to_string(),
            description: "Capitals of Europe".to_string(),
            tags: vec!["geo".to_string()],
            question_ids: Vec::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn new_test_trims_and_dedupes_tags() {
        let payload = NewTest {
            title: "  Geography ".to_string(),
            description: "Capitals".to_string(),
            tags: vec![" geo ".to_string(), "geo".to_string(), "  ".to_string()],
        };
        let normalized = payload.normalized().unwrap();
        assert_eq!(normalized.title, "Geography");
        assert_eq!(normalized.tags, vec!["geo".to_string()]);
    }

    #[test]
    fn blank_title_is_rejected() {
        let payload = NewTest {
            title: "   ".to_string(),
            description: "Capitals".to_string(),
            tags: Vec::new(),
        };
        assert_eq!(
            payload.normalized(),
            Err(TestValidationError::TitleRequired)
        );
    }

    #[test]
    fn overlong_description_is_rejected() {
        let payload = NewTest {
            title: "Geography".to_string(),
            description: "d".repeat(DESCRIPTION_MAX_CHARS + 1),
            tags: Vec::new(),
        };
        assert!(matches!(
            payload.normalized(),
            Err(TestValidationError::DescriptionTooLong { .. })
        ));
    }

    #[test]
    fn patch_skips_empty_strings_and_replaces_tags() {
        let mut test = sample_test();
        test.apply_update(TestPatch {
            title: Some(String::new()),
            description: None,
            tags: Some(vec!["europe".to_string()]),
        })
        .unwrap();
        assert_eq!(test.title, "Geography");
        assert_eq!(test.tags, vec!["europe".to_string()]);
    }

    #[test]
    fn failed_patch_leaves_test_unchanged() {
        let mut test = sample_test();
        let before = test.clone();
        let err = test
            .apply_update(TestPatch {
                title: Some("t".repeat(TITLE_MAX_CHARS + 1)),
                ..TestPatch::default()
            })
            .unwrap_err();
        assert!(matches!(err, TestValidationError::TitleTooLong { .. }));
        assert_eq!(test, before);
    }
}
