//! Attempt reports with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{AnswerEntry, Attempt, GradeResult, QuizVersion};

/// A graded attempt, as written by `lessonquiz grade` and `lessonquiz take`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptReport {
    /// Unique report identifier.
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub quiz: QuizSummary,
    /// Present when the report came from a stored attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt: Option<AttemptSummary>,
    /// Submitted answers in quiz order.
    pub answers: Vec<AnswerEntry>,
    pub grade: GradeResult,
}

/// Summary of a quiz version (without the answer key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    pub lesson_id: String,
    pub version: u32,
    pub title: String,
    pub question_count: usize,
    pub passing_score_percent: u8,
}

impl From<&QuizVersion> for QuizSummary {
    fn from(quiz: &QuizVersion) -> Self {
        Self {
            lesson_id: quiz.lesson_id.clone(),
            version: quiz.version,
            title: quiz.title.clone(),
            question_count: quiz.len(),
            passing_score_percent: quiz.config.passing_score_percent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummary {
    pub id: Uuid,
    pub user_id: String,
    pub attempt_number: u32,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl From<&Attempt> for AttemptSummary {
    fn from(attempt: &Attempt) -> Self {
        Self {
            id: attempt.id,
            user_id: attempt.user_id.clone(),
            attempt_number: attempt.attempt_number,
            started_at: attempt.started_at,
            submitted_at: attempt.submitted_at,
        }
    }
}

impl AttemptReport {
    pub fn new(quiz: &QuizVersion, answers: Vec<AnswerEntry>, grade: GradeResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            quiz: quiz.into(),
            attempt: None,
            answers,
            grade,
        }
    }

    pub fn with_attempt(mut self, attempt: &Attempt) -> Self {
        self.attempt = Some(attempt.into());
        self
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        serde_json::from_str(&content).context("failed to parse report JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerValue, Question, QuestionKind, QuizConfig};

    fn quiz() -> QuizVersion {
        QuizVersion {
            lesson_id: "geo".into(),
            version: 3,
            title: "Capitals".into(),
            questions: vec![Question {
                id: "q1".into(),
                prompt: "Capital of France?".into(),
                kind: QuestionKind::Short {
                    correct_answer_text: Some("Paris".into()),
                },
                points: 2,
                order: 1,
            }],
            config: QuizConfig::default(),
        }
    }

    #[test]
    fn json_roundtrip_preserves_attempt() {
        let quiz = quiz();
        let answers = vec![AnswerEntry::new("q1", AnswerValue::short("paris"))];
        let grade = crate::grading::grade(&quiz, &answers).unwrap();
        let attempt = Attempt::new("geo", "ana", 3, 2);
        let report = AttemptReport::new(&quiz, answers, grade).with_attempt(&attempt);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/report.json");
        report.save_json(&path).unwrap();

        let loaded = AttemptReport::load_json(&path).unwrap();
        assert_eq!(loaded, report);
        assert_eq!(loaded.quiz.version, 3);
        assert_eq!(loaded.attempt.unwrap().attempt_number, 2);
        assert_eq!(loaded.grade.percentage, 100);
    }

    #[test]
    fn summary_omits_answer_key() {
        let report = AttemptReport::new(&quiz(), vec![], crate::grading::grade(&quiz(), &[]).unwrap());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("attempt").is_none());
        assert_eq!(json["quiz"]["questionCount"], 1);
        assert!(json["quiz"].get("questions").is_none());
    }

    #[test]
    fn load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        let err = AttemptReport::load_json(&path).unwrap_err();
        assert!(err.to_string().contains("parse report"));
    }
}
