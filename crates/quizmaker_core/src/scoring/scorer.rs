//! Answer scoring against a test's answer key.
//!
//! # Responsibility
//! - Decide per-question correctness for a submitted answer sheet.
//! - Aggregate points, counts and a rounded percentage.
//!
//! # Invariants
//! - Each question is graded independently; evaluation order does not
//!   affect the report.
//! - Correctness is binary per question, no partial credit.
//! - `percentage_score` is in `0..=100` and is `0` when no points exist.

use crate::model::answer::{Answer, AnswerSheet, MalformedAnswerPayload};
use crate::model::question::{Question, QuestionBody, QuestionId};
use log::debug;
use serde::Serialize;
use serde_json::Value;

/// Grading outcome of one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_id: QuestionId,
    pub correct: bool,
    pub points_awarded: u32,
    pub points_possible: u32,
}

/// Aggregate summary over all graded questions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSummary {
    pub total_points: u64,
    pub earned_points: u64,
    pub percentage_score: u32,
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub total_questions: usize,
}

impl ScoreSummary {
    fn accumulate(mut self, result: &QuestionResult) -> Self {
        self.total_points += u64::from(result.points_possible);
        self.earned_points += u64::from(result.points_awarded);
        self.total_questions += 1;
        if result.correct {
            self.correct_count += 1;
        } else {
            self.incorrect_count += 1;
        }
        self
    }
}

/// Full scoring report: per-question results in question order plus summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreReport {
    pub results: Vec<QuestionResult>,
    pub summary: ScoreSummary,
}

/// Scores `answers` against the ordered `questions` of one test.
pub fn score(questions: &[Question], answers: &AnswerSheet) -> ScoreReport {
    let results = questions
        .iter()
        .map(|question| grade_question(question, answers.get(question.id)))
        .collect::<Vec<_>>();

    let mut summary = results
        .iter()
        .fold(ScoreSummary::default(), ScoreSummary::accumulate);
    summary.percentage_score = percentage(summary.earned_points, summary.total_points);

    debug!(
        "event=score module=scoring status=ok questions={} answers={} earned={} total={} percentage={}",
        summary.total_questions,
        answers.len(),
        summary.earned_points,
        summary.total_points,
        summary.percentage_score
    );

    ScoreReport { results, summary }
}

/// Parses a raw JSON answer payload and scores it.
///
/// # Errors
/// - Returns `MalformedAnswerPayload` when `payload` is not an object of
///   string or string-array values.
pub fn score_json(
    questions: &[Question],
    payload: &Value,
) -> Result<ScoreReport, MalformedAnswerPayload> {
    let answers = AnswerSheet::from_json(payload)?;
    Ok(score(questions, &answers))
}

/// Grades one question. A missing answer is always incorrect.
pub fn grade_question(question: &Question, answer: Option<&Answer>) -> QuestionResult {
    let correct = answer.is_some_and(|answer| is_correct(&question.body, answer));
    QuestionResult {
        question_id: question.id,
        correct,
        points_awarded: if correct { question.points } else { 0 },
        points_possible: question.points,
    }
}

/// Returns whether `answer` matches the answer key in `body`.
///
/// - single: scalar equal to the sole correct answer.
/// - multiple: same length as the key and containing every key entry;
///   a scalar counts as a one-element submission.
/// - text: scalar equal to the key after trimming and lowercasing.
pub fn is_correct(body: &QuestionBody, answer: &Answer) -> bool {
    match body {
        QuestionBody::Single {
            correct_answers, ..
        } => match (answer.as_scalar(), correct_answers.first()) {
            (Some(submitted), Some(expected)) => submitted == expected.as_str(),
            _ => false,
        },
        QuestionBody::Multiple {
            correct_answers, ..
        } => {
            let submitted = answer.to_collection();
            submitted.len() == correct_answers.len()
                && correct_answers
                    .iter()
                    .all(|expected| submitted.contains(&expected.as_str()))
        }
        QuestionBody::Text {
            correct_answer_text,
        } => answer
            .as_scalar()
            .is_some_and(|submitted| fold_text(submitted) == fold_text(correct_answer_text)),
    }
}

/// Rounds `earned / total * 100` half-up; `0` when `total` is `0`.
pub fn percentage(earned: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((earned * 200 + total) / (total * 2)) as u32
}

fn fold_text(value: &str) -> String {
    value.trim().to_lowercase()
}
