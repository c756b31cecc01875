//! Mock transport for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use lessonquiz_core::error::SubmitError;
use lessonquiz_core::model::GradeResult;
use lessonquiz_core::traits::{GradeTransport, SubmitRequest};

/// A mock grade transport for exercising sessions and the coordinator
/// without a server.
///
/// Replays scripted outcomes in order; the last outcome repeats once the
/// script runs out.
pub struct MockTransport {
    outcomes: Mutex<VecDeque<Result<GradeResult, SubmitError>>>,
    call_count: AtomicU32,
    last_request: Mutex<Option<SubmitRequest>>,
}

impl MockTransport {
    pub fn new(outcomes: impl IntoIterator<Item = Result<GradeResult, SubmitError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// A mock that always accepts with the same grade.
    pub fn with_fixed_grade(grade: GradeResult) -> Self {
        Self::new([Ok(grade)])
    }

    /// Number of submissions received.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<SubmitRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl GradeTransport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<GradeResult, SubmitError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        let mut outcomes = self.outcomes.lock().unwrap_or_else(|e| e.into_inner());
        if outcomes.len() > 1 {
            outcomes
                .pop_front()
                .unwrap_or_else(|| Err(SubmitError::Network("mock script exhausted".into())))
        } else {
            outcomes
                .front()
                .cloned()
                .unwrap_or_else(|| Err(SubmitError::Network("mock script is empty".into())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn request() -> SubmitRequest {
        SubmitRequest {
            lesson_id: "geo".into(),
            attempt_id: Uuid::nil(),
            answers: vec![],
        }
    }

    fn grade() -> GradeResult {
        GradeResult {
            score: 0,
            total_points: 2,
            percentage: 0,
            passed: false,
            results: vec![],
        }
    }

    #[tokio::test]
    async fn fixed_grade() {
        let transport = MockTransport::with_fixed_grade(grade());
        assert_eq!(transport.submit(&request()).await, Ok(grade()));
        assert_eq!(transport.submit(&request()).await, Ok(grade()));
        assert_eq!(transport.call_count(), 2);
        assert_eq!(transport.last_request(), Some(request()));
    }

    #[tokio::test]
    async fn script_replays_in_order() {
        let transport = MockTransport::new([
            Err(SubmitError::Network("reset".into())),
            Ok(grade()),
        ]);
        assert!(transport.submit(&request()).await.is_err());
        assert_eq!(transport.submit(&request()).await, Ok(grade()));
        assert_eq!(transport.submit(&request()).await, Ok(grade()));
    }

    #[tokio::test]
    async fn empty_script_fails() {
        let transport = MockTransport::new([]);
        assert!(transport.submit(&request()).await.unwrap_err().is_transient());
    }
}
