//! Boundary traits for the quiz core.
//!
//! The question bank and the attempt store are owned by the surrounding
//! lesson platform; the grade transport is how a session reaches whatever
//! grades it (an in-process [`QuizService`](crate::service::QuizService) or
//! the HTTP client in `lessonquiz-client`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{BankError, StoreError, SubmitError};
use crate::model::{AnswerEntry, AnswerValue, Attempt, GradeResult, QuizVersion};

// ---------------------------------------------------------------------------
// Question bank
// ---------------------------------------------------------------------------

/// Read-only source of versioned quizzes.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// Fetch a lesson's quiz. `None` selects the latest version.
    async fn quiz(&self, lesson_id: &str, version: Option<u32>) -> Result<QuizVersion, BankError>;
}

// ---------------------------------------------------------------------------
// Attempt store
// ---------------------------------------------------------------------------

/// Persistence and policy owner for attempts.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Resume the user's in-progress attempt for the lesson, or create the
    /// next one if the quota allows. `max_attempts == 0` means unlimited.
    async fn create_attempt(
        &self,
        user_id: &str,
        lesson_id: &str,
        quiz_version: u32,
        max_attempts: u32,
    ) -> Result<Attempt, StoreError>;

    /// Number of attempts (in progress or submitted) for a user and lesson.
    async fn count_attempts(&self, user_id: &str, lesson_id: &str) -> Result<u32, StoreError>;

    async fn get_attempt(&self, attempt_id: Uuid) -> Result<Option<Attempt>, StoreError>;

    /// Atomically set `submitted_at` if it is unset. The first caller wins
    /// and stores its grade; later callers get the stored grade back.
    async fn mark_submitted(
        &self,
        attempt_id: Uuid,
        submission: Submission,
    ) -> Result<MarkOutcome, StoreError>;
}

/// Final answers and grade recorded by [`AttemptStore::mark_submitted`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub answers: BTreeMap<String, AnswerValue>,
    pub grade: GradeResult,
    pub submitted_at: DateTime<Utc>,
}

/// Result of the submitted-at check-and-set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkOutcome {
    /// This call froze the attempt.
    Recorded(Attempt),
    /// Another submission won; carries its grade.
    AlreadySubmitted(GradeResult),
}

// ---------------------------------------------------------------------------
// Grade transport
// ---------------------------------------------------------------------------

/// A submission as it travels from a session to the grading side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub lesson_id: String,
    /// Idempotency key.
    pub attempt_id: Uuid,
    pub answers: Vec<AnswerEntry>,
}

/// Carries one submission to whatever grades it.
#[async_trait]
pub trait GradeTransport: Send + Sync {
    /// Human-readable transport name (e.g. "http").
    fn name(&self) -> &str;

    async fn submit(&self, request: &SubmitRequest) -> Result<GradeResult, SubmitError>;
}
