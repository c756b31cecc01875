//! Error types for quiz grading, submission, and attempt policy.
//!
//! Defined in `lessonquiz-core` so the session controller and the submission
//! coordinator can classify failures for retry decisions without string
//! matching, whichever transport produced them.

use thiserror::Error;
use uuid::Uuid;

use crate::model::{GradeResult, QuestionType};

/// A submission payload that cannot be graded. No partial grading occurs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown question id: {0}")]
    UnknownQuestion(String),

    #[error("duplicate answer for question {0}")]
    DuplicateQuestion(String),

    #[error("question {question_id} expects a {expected} answer")]
    AnswerTypeMismatch {
        question_id: String,
        expected: QuestionType,
    },

    #[error("option {option_id} is not an option of question {question_id}")]
    UnknownOption {
        question_id: String,
        option_id: String,
    },

    #[error("malformed submission: {0}")]
    Malformed(String),
}

/// A request refused by attempt policy. Never retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    #[error("attempt limit reached ({used} of {max_attempts} used)")]
    QuotaExceeded { max_attempts: u32, used: u32 },

    #[error("attempt {0} does not belong to this user and lesson")]
    NotAttemptOwner(Uuid),

    /// Refused by a remote grading service, with its message.
    #[error("{0}")]
    Refused(String),
}

/// Errors surfaced by a submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("invalid submission: {0}")]
    Validation(#[from] ValidationError),

    #[error("policy violation: {0}")]
    Policy(#[from] PolicyViolation),

    /// The attempt was graded before; carries the original result.
    #[error("attempt already submitted")]
    AlreadySubmitted(Box<GradeResult>),

    #[error("attempt not found: {0}")]
    AttemptNotFound(Uuid),

    #[error("lesson quiz not found: {0}")]
    QuizNotFound(String),

    /// Transport-level failure (connection refused, reset, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The server failed to process the request.
    #[error("server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },
}

impl SubmitError {
    /// Transient failures that may be retried automatically with the same attempt id.
    pub fn is_transient(&self) -> bool {
        matches!(self, SubmitError::Network(_))
    }

    /// Failures after which the user may retry manually with answers intact.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmitError::Network(_) | SubmitError::Server { .. })
    }

    /// The original grade carried by an `AlreadySubmitted` signal.
    pub fn original_grade(&self) -> Option<&GradeResult> {
        match self {
            SubmitError::AlreadySubmitted(grade) => Some(grade),
            _ => None,
        }
    }
}

/// Errors from an attempt store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    #[error("attempt not found: {0}")]
    NotFound(Uuid),

    #[error("attempt store unavailable: {0}")]
    Backend(String),
}

impl From<StoreError> for SubmitError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Policy(p) => SubmitError::Policy(p),
            StoreError::NotFound(id) => SubmitError::AttemptNotFound(id),
            StoreError::Backend(message) => SubmitError::Server {
                status: 503,
                message,
            },
        }
    }
}

/// Errors from a question bank.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BankError {
    #[error("no quiz for lesson {0}")]
    LessonNotFound(String),

    #[error("lesson {lesson_id} has no quiz version {version}")]
    VersionNotFound { lesson_id: String, version: u32 },

    #[error("question bank unavailable: {0}")]
    Unavailable(String),
}

impl From<BankError> for SubmitError {
    fn from(err: BankError) -> Self {
        match err {
            BankError::LessonNotFound(lesson) => SubmitError::QuizNotFound(lesson),
            BankError::VersionNotFound { lesson_id, version } => {
                SubmitError::QuizNotFound(format!("{lesson_id}@v{version}"))
            }
            BankError::Unavailable(message) => SubmitError::Server {
                status: 503,
                message,
            },
        }
    }
}
