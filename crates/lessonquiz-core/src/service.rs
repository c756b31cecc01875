//! Grading side of a submission.
//!
//! [`QuizService`] starts attempts and grades submissions: it looks up the
//! quiz version an attempt was started on, recomputes the score from the
//! submitted answers, and records the result through the store's
//! first-submission-wins check-and-set. Attempt quotas belong to the store.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::{PolicyViolation, SubmitError};
use crate::grading;
use crate::model::{AnswerEntry, Attempt, GradeResult, QuizVersion};
use crate::traits::{AttemptStore, GradeTransport, MarkOutcome, QuestionBank, Submission, SubmitRequest};

/// An attempt together with the quiz version it is bound to.
#[derive(Debug, Clone)]
pub struct StartedAttempt {
    pub attempt: Attempt,
    pub quiz: QuizVersion,
}

/// Starts and grades attempts against a question bank and an attempt store.
#[derive(Clone)]
pub struct QuizService {
    bank: Arc<dyn QuestionBank>,
    store: Arc<dyn AttemptStore>,
}

impl QuizService {
    pub fn new(bank: Arc<dyn QuestionBank>, store: Arc<dyn AttemptStore>) -> Self {
        Self { bank, store }
    }

    pub fn store(&self) -> &Arc<dyn AttemptStore> {
        &self.store
    }

    /// Start (or resume) the user's attempt at a lesson's latest quiz.
    pub async fn start_attempt(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> Result<StartedAttempt, SubmitError> {
        let latest = self.bank.quiz(lesson_id, None).await?;
        let attempt = self
            .store
            .create_attempt(user_id, lesson_id, latest.version, latest.config.max_attempts)
            .await?;

        // A resumed attempt stays on the version it started with.
        let quiz = if attempt.quiz_version == latest.version {
            latest
        } else {
            self.bank.quiz(lesson_id, Some(attempt.quiz_version)).await?
        };

        Ok(StartedAttempt { attempt, quiz })
    }

    /// Grade and record a submission.
    ///
    /// Resubmitting a graded attempt returns `AlreadySubmitted` with the
    /// original grade before the new answers are even looked at.
    pub async fn submit(
        &self,
        user_id: &str,
        lesson_id: &str,
        attempt_id: Uuid,
        answers: &[AnswerEntry],
    ) -> Result<GradeResult, SubmitError> {
        let attempt = self
            .store
            .get_attempt(attempt_id)
            .await?
            .ok_or(SubmitError::AttemptNotFound(attempt_id))?;

        if attempt.user_id != user_id || attempt.lesson_id != lesson_id {
            return Err(PolicyViolation::NotAttemptOwner(attempt_id).into());
        }

        if let Some(grade) = attempt.grade.filter(|_| attempt.submitted_at.is_some()) {
            tracing::info!(%attempt_id, "attempt already graded, returning original result");
            return Err(SubmitError::AlreadySubmitted(Box::new(grade)));
        }

        let quiz = self.bank.quiz(lesson_id, Some(attempt.quiz_version)).await?;
        let grade = grading::grade(&quiz, answers)?;

        let answers: BTreeMap<String, _> = answers
            .iter()
            .map(|entry| (entry.question_id.clone(), entry.answer.clone()))
            .collect();

        let outcome = self
            .store
            .mark_submitted(
                attempt_id,
                Submission {
                    answers,
                    grade,
                    submitted_at: Utc::now(),
                },
            )
            .await?;

        match outcome {
            MarkOutcome::Recorded(attempt) => {
                let grade = attempt
                    .grade
                    .ok_or_else(|| SubmitError::Server {
                        status: 500,
                        message: format!("attempt {attempt_id} was recorded without a grade"),
                    })?;
                tracing::info!(
                    %attempt_id,
                    user_id,
                    lesson_id,
                    attempt_number = attempt.attempt_number,
                    score = grade.score,
                    total = grade.total_points,
                    passed = grade.passed,
                    "attempt graded"
                );
                Ok(grade)
            }
            MarkOutcome::AlreadySubmitted(original) => {
                tracing::info!(%attempt_id, "lost submission race, returning original result");
                Err(SubmitError::AlreadySubmitted(Box::new(original)))
            }
        }
    }
}

/// Grade transport that calls a [`QuizService`] in process, acting as one user.
#[derive(Clone)]
pub struct LocalTransport {
    service: QuizService,
    user_id: String,
}

impl LocalTransport {
    pub fn new(service: QuizService, user_id: impl Into<String>) -> Self {
        Self {
            service,
            user_id: user_id.into(),
        }
    }
}

#[async_trait]
impl GradeTransport for LocalTransport {
    fn name(&self) -> &str {
        "local"
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<GradeResult, SubmitError> {
        self.service
            .submit(
                &self.user_id,
                &request.lesson_id,
                request.attempt_id,
                &request.answers,
            )
            .await
    }
}
