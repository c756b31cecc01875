//! Core data model types for lessonquiz.
//!
//! These are the types every other crate exchanges: quiz versions and their
//! questions, submitted answers, attempts, and grade results. Wire names are
//! camelCase to match the lesson API.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::traits::Submission;

/// One selectable option of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: String,
    pub text: String,
}

/// The type-specific part of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum QuestionKind {
    /// Multiple choice with exactly one correct option.
    #[serde(rename_all = "camelCase")]
    Mcq {
        options: Vec<AnswerOption>,
        correct_option_id: String,
    },
    /// Free-text answer compared against a canonical text, if one is configured.
    #[serde(rename_all = "camelCase")]
    Short {
        #[serde(default)]
        correct_answer_text: Option<String>,
    },
}

/// A single assessment question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub prompt: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    /// Points awarded for a correct answer. Always greater than zero.
    pub points: u32,
    /// Presentation order within the quiz.
    pub order: i32,
}

impl Question {
    pub fn question_type(&self) -> QuestionType {
        match self.kind {
            QuestionKind::Mcq { .. } => QuestionType::Mcq,
            QuestionKind::Short { .. } => QuestionType::Short,
        }
    }

    /// Options for an MCQ question, empty for SHORT.
    pub fn options(&self) -> &[AnswerOption] {
        match &self.kind {
            QuestionKind::Mcq { options, .. } => options,
            QuestionKind::Short { .. } => &[],
        }
    }

    /// Look up an option's display text by id.
    pub fn option_text(&self, option_id: &str) -> Option<&str> {
        self.options()
            .iter()
            .find(|o| o.id == option_id)
            .map(|o| o.text.as_str())
    }
}

/// Question type discriminant, used in errors and summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuestionType {
    Mcq,
    Short,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::Mcq => write!(f, "mcq"),
            QuestionType::Short => write!(f, "short"),
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mcq" | "choice" | "multiple_choice" => Ok(QuestionType::Mcq),
            "short" | "text" | "short_answer" => Ok(QuestionType::Short),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// Attempt and scoring policy for a lesson's quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizConfig {
    /// Time limit in seconds. `None` or `Some(0)` means untimed.
    #[serde(default)]
    pub time_limit_seconds: Option<u64>,
    /// Minimum percentage (0..=100) required to pass.
    pub passing_score_percent: u8,
    /// Maximum number of attempts per user. 0 means unlimited.
    #[serde(default)]
    pub max_attempts: u32,
}

impl QuizConfig {
    /// The effective time limit, if the quiz is timed.
    pub fn time_limit(&self) -> Option<std::time::Duration> {
        match self.time_limit_seconds {
            Some(secs) if secs > 0 => Some(std::time::Duration::from_secs(secs)),
            _ => None,
        }
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            time_limit_seconds: None,
            passing_score_percent: 70,
            max_attempts: 0,
        }
    }
}

/// One immutable, versioned question set for a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizVersion {
    pub lesson_id: String,
    pub version: u32,
    #[serde(default)]
    pub title: String,
    /// Questions sorted by `order`.
    pub questions: Vec<Question>,
    pub config: QuizConfig,
}

impl QuizVersion {
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.questions.iter().position(|q| q.id == id)
    }

    /// Sum of all question points, saturating at `u32::MAX`.
    pub fn total_points(&self) -> u32 {
        self.checked_total_points().unwrap_or(u32::MAX)
    }

    /// Sum of all question points, or `None` if it does not fit in a `u32`.
    pub fn checked_total_points(&self) -> Option<u32> {
        self.questions
            .iter()
            .try_fold(0u32, |total, q| total.checked_add(q.points))
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// A submitted answer, tagged by question type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum AnswerValue {
    #[serde(rename_all = "camelCase")]
    Mcq { option_id: String },
    Short { text: String },
}

impl AnswerValue {
    pub fn mcq(option_id: impl Into<String>) -> Self {
        AnswerValue::Mcq {
            option_id: option_id.into(),
        }
    }

    pub fn short(text: impl Into<String>) -> Self {
        AnswerValue::Short { text: text.into() }
    }

    pub fn question_type(&self) -> QuestionType {
        match self {
            AnswerValue::Mcq { .. } => QuestionType::Mcq,
            AnswerValue::Short { .. } => QuestionType::Short,
        }
    }

    /// Empty option ids and blank text count as unanswered.
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Mcq { option_id } => option_id.trim().is_empty(),
            AnswerValue::Short { text } => text.trim().is_empty(),
        }
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerValue::Mcq { option_id } => write!(f, "{option_id}"),
            AnswerValue::Short { text } => write!(f, "{text}"),
        }
    }
}

/// One entry of a submission payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEntry {
    pub question_id: String,
    pub answer: AnswerValue,
}

impl AnswerEntry {
    pub fn new(question_id: impl Into<String>, answer: AnswerValue) -> Self {
        Self {
            question_id: question_id.into(),
            answer,
        }
    }
}

/// Grading outcome for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_id: String,
    pub correct: bool,
    /// What the user submitted, `None` when unanswered.
    pub user_answer: Option<AnswerValue>,
    /// Correct option id (MCQ) or canonical text (SHORT), when known.
    pub correct_answer: Option<String>,
    pub earned_points: u32,
    pub points: u32,
    /// Set for SHORT questions without a canonical answer.
    #[serde(default)]
    pub manual_review: bool,
}

/// The scored, per-question-annotated output of grading one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeResult {
    pub score: u32,
    pub total_points: u32,
    pub percentage: u32,
    pub passed: bool,
    pub results: Vec<QuestionResult>,
}

impl GradeResult {
    pub fn answered_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.user_answer.as_ref().is_some_and(|a| !a.is_empty()))
            .count()
    }

    pub fn pending_review(&self) -> impl Iterator<Item = &QuestionResult> {
        self.results.iter().filter(|r| r.manual_review)
    }
}

/// One user's run through a quiz version.
///
/// `score`, `total_points`, `percentage` and `passed` are copied from the
/// grade when the attempt is submitted and stay zero/false until then.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: Uuid,
    pub lesson_id: String,
    pub user_id: String,
    /// The quiz version this attempt is graded against.
    pub quiz_version: u32,
    pub attempt_number: u32,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub answers: BTreeMap<String, AnswerValue>,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub total_points: u32,
    #[serde(default)]
    pub percentage: u32,
    #[serde(default)]
    pub passed: bool,
    #[serde(default)]
    pub grade: Option<GradeResult>,
}

impl Attempt {
    pub fn new(
        lesson_id: impl Into<String>,
        user_id: impl Into<String>,
        quiz_version: u32,
        attempt_number: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            lesson_id: lesson_id.into(),
            user_id: user_id.into(),
            quiz_version,
            attempt_number,
            started_at: Utc::now(),
            submitted_at: None,
            answers: BTreeMap::new(),
            score: 0,
            total_points: 0,
            percentage: 0,
            passed: false,
            grade: None,
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }

    /// Freeze the attempt with its final answers and grade.
    pub fn record_submission(&mut self, submission: Submission) {
        let Submission {
            answers,
            grade,
            submitted_at,
        } = submission;
        self.submitted_at = Some(submitted_at);
        self.answers = answers;
        self.score = grade.score;
        self.total_points = grade.total_points;
        self.percentage = grade.percentage;
        self.passed = grade.passed;
        self.grade = Some(grade);
    }
}
