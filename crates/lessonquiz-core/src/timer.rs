//! Monotonic quiz deadline and the countdown task that reports on it.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Default spacing between countdown ticks.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// A fixed point in monotonic time by which an attempt must be submitted.
///
/// Remaining time is always derived from the start instant, never from
/// accumulated decrements, so suspended or late ticks do not drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    started_at: Instant,
    limit: Duration,
}

impl Deadline {
    pub fn new(started_at: Instant, limit: Duration) -> Self {
        Self { started_at, limit }
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn ends_at(&self) -> Instant {
        self.started_at + self.limit
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.limit.saturating_sub(self.elapsed(now))
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.remaining(now).is_zero()
    }
}

/// Events emitted by a running [`QuizTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick { remaining: Duration },
    Expired,
}

/// Countdown task for one attempt.
///
/// At most one countdown is armed at a time: arming aborts the previous
/// task, and dropping the timer cancels it.
#[derive(Debug)]
pub struct QuizTimer {
    interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl QuizTimer {
    pub fn new() -> Self {
        Self::with_interval(TICK_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            handle: None,
        }
    }

    /// Start counting down toward `deadline`, sending events on `events`.
    pub fn arm(&mut self, deadline: Deadline, events: mpsc::Sender<TimerEvent>) {
        self.cancel();

        let interval = self.interval;
        self.handle = Some(tokio::spawn(async move {
            loop {
                let remaining = deadline.remaining(Instant::now());
                if remaining.is_zero() {
                    let _ = events.send(TimerEvent::Expired).await;
                    break;
                }
                tokio::time::sleep(remaining.min(interval)).await;

                let remaining = deadline.remaining(Instant::now());
                let event = if remaining.is_zero() {
                    TimerEvent::Expired
                } else {
                    TimerEvent::Tick { remaining }
                };
                if events.send(event).await.is_err() || event == TimerEvent::Expired {
                    break;
                }
            }
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Default for QuizTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for QuizTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_arithmetic() {
        let start = Instant::now();
        let deadline = Deadline::new(start, Duration::from_secs(10));
        assert_eq!(deadline.remaining(start), Duration::from_secs(10));
        assert_eq!(
            deadline.remaining(start + Duration::from_millis(2500)),
            Duration::from_millis(7500)
        );
        assert!(deadline.is_expired(start + Duration::from_secs(10)));
        assert_eq!(deadline.remaining(start + Duration::from_secs(60)), Duration::ZERO);
        assert_eq!(deadline.ends_at(), start + Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_then_expires_at_deadline() {
        let (tx, mut rx) = mpsc::channel(16);
        let start = Instant::now();
        let mut timer = QuizTimer::new();
        timer.arm(Deadline::new(start, Duration::from_secs(3)), tx);

        let mut ticks = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                TimerEvent::Tick { remaining } => ticks.push(remaining.as_secs()),
                TimerEvent::Expired => break,
            }
        }
        assert_eq!(ticks, [2, 1]);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_previous_countdown() {
        let (tx, mut rx) = mpsc::channel(16);
        let start = Instant::now();
        let mut timer = QuizTimer::new();
        timer.arm(Deadline::new(start, Duration::from_secs(100)), tx.clone());
        timer.arm(Deadline::new(start, Duration::from_secs(2)), tx);

        let mut expired = 0;
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_secs(5), rx.recv()).await
        {
            if event == TimerEvent::Expired {
                expired += 1;
            }
        }
        assert_eq!(expired, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_events() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut timer = QuizTimer::new();
        timer.arm(Deadline::new(Instant::now(), Duration::from_secs(5)), tx);
        assert!(timer.is_armed());
        timer.cancel();
        assert!(!timer.is_armed());
        assert_eq!(rx.recv().await, None);
    }
}
