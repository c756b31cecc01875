//! Drives a [`SessionState`] with a live countdown and a submission
//! coordinator.
//!
//! The controller owns the timer task and its event channel, so a caller
//! (the interactive `take` command, for one) only has to `select!` between
//! user input and [`SessionController::next_timer_event`]. Expiry submits
//! the current answers without asking.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::coordinator::SubmissionCoordinator;
use crate::error::SubmitError;
use crate::model::{AnswerValue, Attempt, GradeResult, QuizVersion};
use crate::session::{SessionError, SessionPhase, SessionState, TickOutcome};
use crate::timer::{QuizTimer, TimerEvent};
use crate::traits::SubmitRequest;

const EVENT_BUFFER: usize = 16;

pub struct SessionController {
    state: SessionState,
    timer: QuizTimer,
    events_tx: mpsc::Sender<TimerEvent>,
    events_rx: mpsc::Receiver<TimerEvent>,
    coordinator: SubmissionCoordinator,
}

impl SessionController {
    pub fn new(coordinator: SubmissionCoordinator) -> Self {
        Self::with_timer(coordinator, QuizTimer::new())
    }

    pub fn with_timer(coordinator: SubmissionCoordinator, timer: QuizTimer) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        Self {
            state: SessionState::new(),
            timer,
            events_tx,
            events_rx,
            coordinator,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.state.remaining(Instant::now())
    }

    /// Load the attempt and arm the countdown if the quiz is timed.
    ///
    /// Time already spent on a resumed attempt counts against the limit.
    pub fn start(&mut self, quiz: QuizVersion, attempt: &Attempt) -> Result<(), SessionError> {
        let spent = (Utc::now() - attempt.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        let now = Instant::now();
        let started_at = now.checked_sub(spent).unwrap_or(now);

        self.state.load(quiz, attempt.id, started_at)?;
        self.arm_timer();
        Ok(())
    }

    pub fn answer(&mut self, question_id: &str, value: AnswerValue) -> Result<(), SessionError> {
        self.state.answer(question_id, value)
    }

    pub fn clear_answer(&mut self, question_id: &str) -> Result<(), SessionError> {
        self.state.clear_answer(question_id)
    }

    pub fn navigate(&mut self, index: usize) -> Result<(), SessionError> {
        self.state.navigate(index)
    }

    pub fn next(&mut self) -> Result<(), SessionError> {
        self.state.next()
    }

    pub fn previous(&mut self) -> Result<(), SessionError> {
        self.state.previous()
    }

    /// Wait for the next countdown event. Pends forever on an untimed quiz,
    /// which makes it safe to use as a `select!` branch.
    pub async fn next_timer_event(&mut self) -> Option<TimerEvent> {
        self.events_rx.recv().await
    }

    /// Apply a countdown event. On expiry this performs the automatic
    /// submission before returning.
    pub async fn handle_timer_event(&mut self, event: TimerEvent) -> Result<TickOutcome, SessionError> {
        if let TimerEvent::Expired = event {
            tracing::debug!("countdown reported expiry");
        }

        // Stale events after a submission land here as `Idle`.
        let outcome = self.state.tick(Instant::now());
        if outcome == TickOutcome::Expired {
            if let Some(request) = self.state.pending_request() {
                // A failed automatic submission leaves the session `Expired`
                // with answers intact; the caller sees that through the state.
                if let Err(e) = self.send(request).await {
                    tracing::warn!(error = %e, "automatic submission failed");
                }
            }
        }
        Ok(outcome)
    }

    /// Submit the current answers. A partial answer set needs `confirmed`.
    pub async fn submit(&mut self, confirmed: bool) -> Result<GradeResult, SessionError> {
        let request = self.state.submit_start(confirmed)?;
        self.send(request).await
    }

    async fn send(&mut self, request: SubmitRequest) -> Result<GradeResult, SessionError> {
        self.timer.cancel();

        match self.coordinator.submit(&request).await {
            Ok(grade) => {
                self.state.submit_success(grade.clone())?;
                Ok(grade)
            }
            Err(SubmitError::AlreadySubmitted(original)) => {
                tracing::info!(attempt = %request.attempt_id, "attempt was already graded");
                self.state.submit_success((*original).clone())?;
                Ok(*original)
            }
            Err(e) => {
                self.state.submit_fail(e.clone(), Instant::now())?;
                if *self.state.phase() == SessionPhase::InProgress {
                    self.arm_timer();
                }
                Err(SessionError::Submit(e))
            }
        }
    }

    fn arm_timer(&mut self) {
        if let Some(deadline) = self.state.deadline() {
            self.timer.arm(deadline, self.events_tx.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::InMemoryQuestionBank;
    use crate::coordinator::SubmitConfig;
    use crate::model::{AnswerOption, Question, QuestionKind, QuizConfig};
    use crate::service::{LocalTransport, QuizService, StartedAttempt};
    use crate::store::InMemoryAttemptStore;
    use crate::traits::GradeTransport;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn quiz(time_limit: Option<u64>) -> QuizVersion {
        QuizVersion {
            lesson_id: "geo".into(),
            version: 1,
            title: "Capitals".into(),
            questions: vec![
                Question {
                    id: "q1".into(),
                    prompt: "Capital of Spain?".into(),
                    kind: QuestionKind::Mcq {
                        options: vec![
                            AnswerOption {
                                id: "a".into(),
                                text: "Madrid".into(),
                            },
                            AnswerOption {
                                id: "b".into(),
                                text: "Lisbon".into(),
                            },
                        ],
                        correct_option_id: "a".into(),
                    },
                    points: 1,
                    order: 1,
                },
                Question {
                    id: "q2".into(),
                    prompt: "Capital of France?".into(),
                    kind: QuestionKind::Short {
                        correct_answer_text: Some("Paris".into()),
                    },
                    points: 1,
                    order: 2,
                },
            ],
            config: QuizConfig {
                time_limit_seconds: time_limit,
                passing_score_percent: 50,
                max_attempts: 0,
            },
        }
    }

    async fn local(time_limit: Option<u64>) -> (SessionController, StartedAttempt, QuizService) {
        let bank = InMemoryQuestionBank::new().with_quiz(quiz(time_limit));
        let service = QuizService::new(Arc::new(bank), Arc::new(InMemoryAttemptStore::new()));
        let started = service.start_attempt("ana", "geo").await.unwrap();
        let transport = Arc::new(LocalTransport::new(service.clone(), "ana"));
        let controller =
            SessionController::new(SubmissionCoordinator::new(transport, SubmitConfig::default()));
        (controller, started, service)
    }

    struct Offline {
        calls: AtomicU32,
    }

    #[async_trait]
    impl GradeTransport for Offline {
        fn name(&self) -> &str {
            "offline"
        }

        async fn submit(&self, _: &SubmitRequest) -> Result<GradeResult, SubmitError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Err(SubmitError::Network("connection refused".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_submits_current_answers() {
        let (mut controller, started, service) = local(Some(3)).await;
        let begin = Instant::now();
        controller.start(started.quiz, &started.attempt).unwrap();
        controller.answer("q1", AnswerValue::mcq("a")).unwrap();

        while let Some(event) = controller.next_timer_event().await {
            if controller.handle_timer_event(event).await.unwrap() == TickOutcome::Expired {
                break;
            }
        }

        assert_eq!(begin.elapsed(), Duration::from_secs(3));
        let grade = controller.state().grade().cloned().unwrap();
        assert_eq!((grade.score, grade.total_points), (1, 2));

        let stored = service
            .store()
            .get_attempt(started.attempt.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_submitted());
    }

    #[tokio::test(start_paused = true)]
    async fn partial_submit_needs_confirmation() {
        let (mut controller, started, _) = local(None).await;
        controller.start(started.quiz, &started.attempt).unwrap();
        controller.answer("q2", AnswerValue::short(" paris ")).unwrap();

        let err = controller.submit(false).await.unwrap_err();
        assert_eq!(
            err,
            SessionError::ConfirmationRequired {
                answered: 1,
                total: 2
            }
        );
        assert_eq!(*controller.state().phase(), SessionPhase::InProgress);

        let grade = controller.submit(true).await.unwrap();
        assert_eq!(grade.score, 1);
        assert!(grade.passed);
    }

    #[tokio::test(start_paused = true)]
    async fn already_graded_attempt_completes_with_original() {
        let (mut controller, started, service) = local(None).await;
        let original = service
            .submit("ana", "geo", started.attempt.id, &[])
            .await
            .unwrap();

        controller.start(started.quiz, &started.attempt).unwrap();
        controller.answer("q1", AnswerValue::mcq("a")).unwrap();
        controller.answer("q2", AnswerValue::short("Paris")).unwrap();

        let grade = controller.submit(false).await.unwrap();
        assert_eq!(grade, original);
        assert_eq!(controller.state().grade(), Some(&original));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_submit_keeps_answers_and_timer() {
        let transport = Arc::new(Offline {
            calls: AtomicU32::new(0),
        });
        let mut controller = SessionController::new(SubmissionCoordinator::new(
            transport.clone(),
            SubmitConfig::default(),
        ));
        let attempt = Attempt::new("geo", "ana", 1, 1);
        controller.start(quiz(Some(60)), &attempt).unwrap();
        controller.answer("q1", AnswerValue::mcq("b")).unwrap();

        let err = controller.submit(true).await.unwrap_err();
        assert!(matches!(err, SessionError::Submit(SubmitError::Network(_))));
        assert_eq!(transport.calls.load(Ordering::Relaxed), 2);
        assert_eq!(*controller.state().phase(), SessionPhase::InProgress);
        assert_eq!(
            controller.state().answer_for("q1"),
            Some(&AnswerValue::mcq("b"))
        );

        // The countdown keeps running after the failure.
        let event = controller.next_timer_event().await.unwrap();
        assert!(matches!(event, TimerEvent::Tick { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_auto_submit_leaves_session_expired() {
        let transport = Arc::new(Offline {
            calls: AtomicU32::new(0),
        });
        let mut controller = SessionController::new(SubmissionCoordinator::new(
            transport,
            SubmitConfig::default(),
        ));
        let attempt = Attempt::new("geo", "ana", 1, 1);
        controller.start(quiz(Some(1)), &attempt).unwrap();
        controller.answer("q1", AnswerValue::mcq("a")).unwrap();

        let event = controller.next_timer_event().await.unwrap();
        assert_eq!(event, TimerEvent::Expired);
        let outcome = controller.handle_timer_event(event).await.unwrap();
        assert_eq!(outcome, TickOutcome::Expired);
        assert_eq!(*controller.state().phase(), SessionPhase::Expired);
        assert!(controller.state().last_error().is_some());

        // Answers are frozen but kept for a retry.
        assert!(controller.answer("q2", AnswerValue::short("x")).is_err());
        assert!(controller.state().is_answered("q1"));
    }
}
