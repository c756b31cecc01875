//! Quiz session state machine.
//!
//! [`SessionState`] is the single owned record of one attempt in progress.
//! Every change goes through a reducer-style transition (`load`, `answer`,
//! `navigate`, `tick`, `submit_start`, `submit_success`, `submit_fail`)
//! that takes the current monotonic time as an argument, which keeps the
//! machine deterministic and testable without a runtime.
//!
//! ```text
//! Loading -> InProgress -> Submitting -> Completed
//!                ^             |
//!                +-- failure --+--> Expired (deadline passed) -> Submitting
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::SubmitError;
use crate::model::{AnswerEntry, AnswerValue, GradeResult, Question, QuestionType, QuizVersion};
use crate::timer::Deadline;
use crate::traits::SubmitRequest;

/// Lifecycle phase of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Loading,
    InProgress,
    Submitting { trigger: SubmitTrigger },
    Completed { grade: GradeResult },
    /// Time ran out and the automatic submission has not succeeded yet.
    Expired,
}

impl SessionPhase {
    fn name(&self) -> &'static str {
        match self {
            SessionPhase::Loading => "loading",
            SessionPhase::InProgress => "in progress",
            SessionPhase::Submitting { .. } => "submitting",
            SessionPhase::Completed { .. } => "completed",
            SessionPhase::Expired => "expired",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What started a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    Timeout,
}

/// Outcome of a timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Untimed quiz, or the session is not in progress.
    Idle,
    Running { remaining: Duration },
    /// The deadline passed; the session moved to `Submitting`.
    Expired,
}

/// Errors from session transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("cannot {action} while the session is {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: &'static str,
    },

    #[error("question index {index} is out of range (quiz has {len} questions)")]
    OutOfBounds { index: usize, len: usize },

    #[error("already at the first question")]
    AtFirstQuestion,

    #[error("unknown question id: {0}")]
    UnknownQuestion(String),

    #[error("question {question_id} expects a {expected} answer")]
    AnswerTypeMismatch {
        question_id: String,
        expected: QuestionType,
    },

    #[error("only {answered} of {total} questions answered; confirm to submit anyway")]
    ConfirmationRequired { answered: usize, total: usize },

    #[error("a submission is already in flight")]
    SubmitInFlight,

    #[error("submission failed: {0}")]
    Submit(#[from] SubmitError),
}

/// Local state of one attempt.
#[derive(Debug, Clone)]
pub struct SessionState {
    phase: SessionPhase,
    quiz: Option<QuizVersion>,
    attempt_id: Option<Uuid>,
    answers: BTreeMap<String, AnswerValue>,
    current: usize,
    deadline: Option<Deadline>,
    last_error: Option<SubmitError>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Loading,
            quiz: None,
            attempt_id: None,
            answers: BTreeMap::new(),
            current: 0,
            deadline: None,
            last_error: None,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn quiz(&self) -> Option<&QuizVersion> {
        self.quiz.as_ref()
    }

    pub fn attempt_id(&self) -> Option<Uuid> {
        self.attempt_id
    }

    pub fn answers(&self) -> &BTreeMap<String, AnswerValue> {
        &self.answers
    }

    pub fn answer_for(&self, question_id: &str) -> Option<&AnswerValue> {
        self.answers.get(question_id)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.quiz.as_ref().and_then(|q| q.questions.get(self.current))
    }

    pub fn deadline(&self) -> Option<Deadline> {
        self.deadline
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.remaining(now))
    }

    pub fn last_error(&self) -> Option<&SubmitError> {
        self.last_error.as_ref()
    }

    pub fn grade(&self) -> Option<&GradeResult> {
        match &self.phase {
            SessionPhase::Completed { grade } => Some(grade),
            _ => None,
        }
    }

    pub fn total_questions(&self) -> usize {
        self.quiz.as_ref().map(QuizVersion::len).unwrap_or(0)
    }

    /// Distinct questions holding a non-empty answer.
    pub fn answered_count(&self) -> usize {
        self.answers.values().filter(|a| !a.is_empty()).count()
    }

    pub fn is_answered(&self, question_id: &str) -> bool {
        self.answers.get(question_id).is_some_and(|a| !a.is_empty())
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// `Loading -> InProgress` once the quiz and the attempt are known.
    ///
    /// `started_at` is the monotonic instant the attempt began; a resumed
    /// attempt passes an instant in the past so its deadline is unchanged.
    pub fn load(
        &mut self,
        quiz: QuizVersion,
        attempt_id: Uuid,
        started_at: Instant,
    ) -> Result<(), SessionError> {
        self.expect_phase("load", |p| matches!(p, SessionPhase::Loading))?;

        self.deadline = quiz
            .config
            .time_limit()
            .map(|limit| Deadline::new(started_at, limit));
        self.quiz = Some(quiz);
        self.attempt_id = Some(attempt_id);
        self.answers.clear();
        self.current = 0;
        self.phase = SessionPhase::InProgress;
        tracing::debug!(%attempt_id, timed = self.deadline.is_some(), "session loaded");
        Ok(())
    }

    /// Record an answer, replacing any earlier answer to the same question.
    pub fn answer(
        &mut self,
        question_id: &str,
        value: AnswerValue,
    ) -> Result<(), SessionError> {
        self.expect_phase("answer", |p| matches!(p, SessionPhase::InProgress))?;

        let question = self
            .quiz
            .as_ref()
            .and_then(|q| q.question(question_id))
            .ok_or_else(|| SessionError::UnknownQuestion(question_id.to_string()))?;

        if question.question_type() != value.question_type() {
            return Err(SessionError::AnswerTypeMismatch {
                question_id: question_id.to_string(),
                expected: question.question_type(),
            });
        }

        self.answers.insert(question_id.to_string(), value);
        Ok(())
    }

    /// Remove a recorded answer.
    pub fn clear_answer(&mut self, question_id: &str) -> Result<(), SessionError> {
        self.expect_phase("clear an answer", |p| matches!(p, SessionPhase::InProgress))?;
        self.answers.remove(question_id);
        Ok(())
    }

    /// Move to question `index`; valid range is `[0, N-1]`, no wraparound.
    pub fn navigate(&mut self, index: usize) -> Result<(), SessionError> {
        self.expect_phase("navigate", |p| matches!(p, SessionPhase::InProgress))?;

        let len = self.total_questions();
        if index >= len {
            return Err(SessionError::OutOfBounds { index, len });
        }
        self.current = index;
        Ok(())
    }

    pub fn next(&mut self) -> Result<(), SessionError> {
        self.navigate(self.current + 1)
    }

    pub fn previous(&mut self) -> Result<(), SessionError> {
        match self.current.checked_sub(1) {
            Some(index) => self.navigate(index),
            None => {
                self.expect_phase("navigate", |p| matches!(p, SessionPhase::InProgress))?;
                Err(SessionError::AtFirstQuestion)
            }
        }
    }

    /// Recompute remaining time from the deadline. When it reaches zero the
    /// session moves to `Submitting` without asking for confirmation.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if self.phase != SessionPhase::InProgress {
            return TickOutcome::Idle;
        }
        let Some(deadline) = self.deadline else {
            return TickOutcome::Idle;
        };

        let remaining = deadline.remaining(now);
        if remaining.is_zero() {
            tracing::info!(
                attempt = ?self.attempt_id,
                answered = self.answered_count(),
                "time limit reached, submitting"
            );
            self.phase = SessionPhase::Submitting {
                trigger: SubmitTrigger::Timeout,
            };
            TickOutcome::Expired
        } else {
            TickOutcome::Running { remaining }
        }
    }

    /// Enter `Submitting` and return the request to send.
    ///
    /// From `InProgress` a partial answer set needs `confirmed`. From
    /// `Expired` (a failed automatic submission) no confirmation is needed.
    /// A submission already in flight is rejected.
    pub fn submit_start(&mut self, confirmed: bool) -> Result<SubmitRequest, SessionError> {
        match &self.phase {
            SessionPhase::InProgress => {
                let answered = self.answered_count();
                let total = self.total_questions();
                if answered < total && !confirmed {
                    return Err(SessionError::ConfirmationRequired { answered, total });
                }
                self.phase = SessionPhase::Submitting {
                    trigger: SubmitTrigger::Manual,
                };
            }
            SessionPhase::Expired => {
                self.phase = SessionPhase::Submitting {
                    trigger: SubmitTrigger::Timeout,
                };
            }
            SessionPhase::Submitting { .. } => return Err(SessionError::SubmitInFlight),
            other => {
                return Err(SessionError::InvalidTransition {
                    action: "submit",
                    phase: other.name(),
                })
            }
        }

        self.last_error = None;
        self.pending_request().ok_or(SessionError::InvalidTransition {
            action: "submit",
            phase: "loading",
        })
    }

    /// The request for the current answers while a submission is in flight.
    ///
    /// A timer-triggered transition to `Submitting` goes through
    /// [`tick`](Self::tick), after which callers fetch the request here.
    pub fn pending_request(&self) -> Option<SubmitRequest> {
        if !matches!(self.phase, SessionPhase::Submitting { .. }) {
            return None;
        }
        let quiz = self.quiz.as_ref()?;
        let attempt_id = self.attempt_id?;

        // Quiz order, blank answers dropped.
        let answers = quiz
            .questions
            .iter()
            .filter_map(|q| {
                self.answers
                    .get(&q.id)
                    .filter(|a| !a.is_empty())
                    .map(|a| AnswerEntry::new(q.id.clone(), a.clone()))
            })
            .collect();

        Some(SubmitRequest {
            lesson_id: quiz.lesson_id.clone(),
            attempt_id,
            answers,
        })
    }

    /// `Submitting -> Completed`.
    pub fn submit_success(&mut self, grade: GradeResult) -> Result<(), SessionError> {
        self.expect_phase("complete", |p| matches!(p, SessionPhase::Submitting { .. }))?;
        tracing::info!(
            attempt = ?self.attempt_id,
            score = grade.score,
            percentage = grade.percentage,
            passed = grade.passed,
            "submission graded"
        );
        self.phase = SessionPhase::Completed { grade };
        self.last_error = None;
        Ok(())
    }

    /// `Submitting -> InProgress`, or `Expired` when time is up. Answers are
    /// kept either way.
    pub fn submit_fail(&mut self, error: SubmitError, now: Instant) -> Result<(), SessionError> {
        let trigger = match &self.phase {
            SessionPhase::Submitting { trigger } => *trigger,
            other => {
                return Err(SessionError::InvalidTransition {
                    action: "fail a submission",
                    phase: other.name(),
                })
            }
        };

        let out_of_time = trigger == SubmitTrigger::Timeout
            || self.deadline.is_some_and(|d| d.is_expired(now));

        tracing::warn!(attempt = ?self.attempt_id, error = %error, out_of_time, "submission failed");
        self.phase = if out_of_time {
            SessionPhase::Expired
        } else {
            SessionPhase::InProgress
        };
        self.last_error = Some(error);
        Ok(())
    }

    fn expect_phase(
        &self,
        action: &'static str,
        allowed: impl Fn(&SessionPhase) -> bool,
    ) -> Result<(), SessionError> {
        if allowed(&self.phase) {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                action,
                phase: self.phase.name(),
            })
        }
    }
}
