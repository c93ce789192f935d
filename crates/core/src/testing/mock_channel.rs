//! Mock notification channel for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::notification::{Notification, NotificationChannel, NotificationError};

/// Mock implementation of the NotificationChannel trait.
///
/// Provides controllable behavior for testing:
/// - Record delivered notifications for assertions
/// - Fail the first N attempts, or every attempt
/// - Record when each attempt happened
/// - Simulate slow sends and track how many overlap
///
/// # Example
///
/// ```rust,ignore
/// use mediadrop_core::testing::MockChannel;
///
/// let channel = MockChannel::new("telegram").fail_first(2);
/// let service = NotificationService::with_channels(policy, vec![Box::new(channel.clone())]);
///
/// service.notify("done", None).await?;
/// assert_eq!(channel.attempts(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct MockChannel {
    name: String,
    /// Notifications that were delivered.
    sent: Arc<RwLock<Vec<Notification>>>,
    /// Instant of every send attempt, successful or not.
    attempt_times: Arc<RwLock<Vec<Instant>>>,
    /// Failures still to inject before succeeding.
    remaining_failures: Arc<AtomicU32>,
    /// Fail every attempt.
    always_fail: Arc<AtomicBool>,
    attempts: Arc<AtomicU32>,
    /// How long each send takes.
    delay: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockChannel {
    /// Create a new mock channel that always succeeds.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sent: Arc::new(RwLock::new(Vec::new())),
            attempt_times: Arc::new(RwLock::new(Vec::new())),
            remaining_failures: Arc::new(AtomicU32::new(0)),
            always_fail: Arc::new(AtomicBool::new(false)),
            attempts: Arc::new(AtomicU32::new(0)),
            delay: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make every send take `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the first `count` attempts.
    pub fn fail_first(self, count: u32) -> Self {
        self.remaining_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Fail every attempt.
    pub fn always_fail(self) -> Self {
        self.always_fail.store(true, Ordering::SeqCst);
        self
    }

    /// Number of send attempts so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Highest number of sends observed running at the same time.
    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Notifications delivered successfully.
    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.read().await.clone()
    }

    /// Instants of every attempt, in order.
    pub async fn attempt_times(&self) -> Vec<Instant> {
        self.attempt_times.read().await.clone()
    }

    /// Clear recorded state.
    pub async fn reset(&self) {
        self.sent.write().await.clear();
        self.attempt_times.write().await.clear();
        self.attempts.store(0, Ordering::SeqCst);
        self.max_in_flight.store(0, Ordering::SeqCst);
    }

    fn should_fail(&self) -> bool {
        if self.always_fail.load(Ordering::SeqCst) {
            return true;
        }
        self.remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl NotificationChannel for MockChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.attempt_times.write().await.push(Instant::now());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.should_fail() {
            return Err(NotificationError::send(
                &self.name,
                format!("mock failure on attempt {}", attempt),
            ));
        }

        self.sent.write().await.push(notification.clone());
        Ok(())
    }
}
