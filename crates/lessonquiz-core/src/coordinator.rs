//! Submission coordinator.
//!
//! Sends one attempt's final answers through a [`GradeTransport`], retrying a
//! transient network failure a bounded number of times with the same
//! attempt id. Exactly-once grading is the grading side's job; resending the
//! same attempt id is always safe.

use std::sync::Arc;
use std::time::Duration;

use crate::error::SubmitError;
use crate::model::GradeResult;
use crate::traits::{GradeTransport, SubmitRequest};

/// Upper bound on automatic retries of one submission.
pub const MAX_AUTO_RETRIES: u32 = 1;

/// Configuration for the submission coordinator.
#[derive(Debug, Clone)]
pub struct SubmitConfig {
    /// Automatic retries after a transient failure, capped at
    /// [`MAX_AUTO_RETRIES`].
    pub auto_retries: u32,
    /// Delay before each automatic retry.
    pub retry_delay: Duration,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            auto_retries: 1,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Packages and sends submissions.
#[derive(Clone)]
pub struct SubmissionCoordinator {
    transport: Arc<dyn GradeTransport>,
    config: SubmitConfig,
}

impl SubmitConfig {
    /// Retries actually performed for this configuration.
    pub fn effective_retries(&self) -> u32 {
        self.auto_retries.min(MAX_AUTO_RETRIES)
    }
}

impl SubmissionCoordinator {
    pub fn new(transport: Arc<dyn GradeTransport>, config: SubmitConfig) -> Self {
        if config.auto_retries > MAX_AUTO_RETRIES {
            tracing::warn!(
                requested = config.auto_retries,
                max = MAX_AUTO_RETRIES,
                "capping automatic submission retries"
            );
        }
        Self { transport, config }
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Submit an attempt's answers.
    ///
    /// Returns `SubmitError::AlreadySubmitted` with the original grade when
    /// the attempt was graded before. Only `SubmitError::Network` failures
    /// are retried automatically; everything else is surfaced at once.
    pub async fn submit(&self, request: &SubmitRequest) -> Result<GradeResult, SubmitError> {
        let mut last_error = None;

        for retry in 0..=self.config.effective_retries() {
            if retry > 0 {
                tracing::warn!(
                    attempt = %request.attempt_id,
                    retry,
                    "retrying submission after transient failure"
                );
                tokio::time::sleep(self.config.retry_delay).await;
            }

            match self.transport.submit(request).await {
                Ok(grade) => {
                    tracing::info!(
                        attempt = %request.attempt_id,
                        transport = self.transport.name(),
                        score = grade.score,
                        total = grade.total_points,
                        "submission accepted"
                    );
                    return Ok(grade);
                }
                Err(e) if e.is_transient() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| SubmitError::Network("submission not attempted".into())))
    }
}
