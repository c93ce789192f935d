//! Notification service fanning messages out to every enabled channel.

use futures::future::join_all;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::Settings;
use crate::metrics;
use crate::secrets::SecretProvider;

use super::email::EmailChannel;
use super::error::{ChannelFailure, NotificationError};
use super::retry::{retry_with_backoff, RetryPolicy};
use super::telegram::TelegramChannel;
use super::traits::NotificationChannel;
use super::types::{ChannelOutcome, DeliveryReport, Notification};

/// Delivers notifications to the configured channels.
///
/// Each channel is retried independently according to the retry policy, so
/// a failing channel never causes a duplicate delivery on a healthy one.
/// Concurrent `notify` calls are serialized.
pub struct NotificationService {
    channels: Mutex<Vec<Box<dyn NotificationChannel>>>,
    channel_names: Vec<String>,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl NotificationService {
    /// Build the channels enabled in `settings`.
    ///
    /// Fails with [`NotificationError::Setup`] when an enabled channel is
    /// missing credentials or addresses. No network traffic happens here.
    pub fn new(
        settings: &Settings,
        provider: &dyn SecretProvider,
    ) -> Result<Self, NotificationError> {
        let mut channels: Vec<Box<dyn NotificationChannel>> = Vec::new();

        if settings.telegram.enabled {
            channels.push(Box::new(TelegramChannel::new(&settings.telegram, provider)?));
        }
        if settings.email.enabled {
            channels.push(Box::new(EmailChannel::new(&settings.email, provider)?));
        }

        let service = Self::with_channels(RetryPolicy::from(settings.retry()), channels);
        info!(channels = ?service.channel_names, "Notification service configured");
        Ok(service)
    }

    /// Build the enabled channels and check that each one is reachable.
    pub async fn connect(
        settings: &Settings,
        provider: &dyn SecretProvider,
    ) -> Result<Self, NotificationError> {
        let service = Self::new(settings, provider)?;
        service.validate().await?;
        Ok(service)
    }

    /// Create a service over explicit channels.
    pub fn with_channels(policy: RetryPolicy, channels: Vec<Box<dyn NotificationChannel>>) -> Self {
        let channel_names = channels.iter().map(|c| c.name().to_string()).collect();
        Self {
            channels: Mutex::new(channels),
            channel_names,
            policy,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop waiting between retries once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    pub fn is_enabled(&self) -> bool {
        !self.channel_names.is_empty()
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Validate every channel, stopping at the first failure.
    pub async fn validate(&self) -> Result<(), NotificationError> {
        let channels = self.channels.lock().await;
        for channel in channels.iter() {
            channel.validate().await?;
            debug!(channel = channel.name(), "Notification channel validated");
        }
        Ok(())
    }

    /// Send `message` to every channel, appending `error` when given.
    pub async fn notify(
        &self,
        message: &str,
        error: Option<&(dyn std::error::Error + Send + Sync + '_)>,
    ) -> Result<DeliveryReport, NotificationError> {
        let mut notification = Notification::new(message);
        if let Some(error) = error {
            notification = notification.with_error(error);
        }
        self.send(&notification).await
    }

    /// Send a prepared notification to every channel.
    ///
    /// Succeeds only if every channel delivered within its attempts. With no
    /// channels enabled this is a no-op.
    pub async fn send(
        &self,
        notification: &Notification,
    ) -> Result<DeliveryReport, NotificationError> {
        let channels = self.channels.lock().await;
        if channels.is_empty() {
            debug!("No notification channels enabled, skipping");
            return Ok(DeliveryReport::default());
        }

        let deliveries = channels
            .iter()
            .map(|channel| self.deliver(channel.as_ref(), notification));
        let results = join_all(deliveries).await;

        let mut report = DeliveryReport::default();
        let mut failures = Vec::new();
        for (outcome, failure) in results {
            report.outcomes.push(outcome);
            failures.extend(failure);
        }

        if failures.is_empty() {
            info!(
                channels = report.outcomes.len(),
                is_error = notification.is_error(),
                "Notification delivered"
            );
            Ok(report)
        } else {
            Err(NotificationError::Delivery { failures })
        }
    }

    async fn deliver(
        &self,
        channel: &dyn NotificationChannel,
        notification: &Notification,
    ) -> (ChannelOutcome, Option<ChannelFailure>) {
        let name = channel.name().to_string();

        let outcome = retry_with_backoff(&self.policy, &name, &self.cancel, |attempt| {
            if attempt > 1 {
                metrics::NOTIFICATION_RETRIES
                    .with_label_values(&[name.as_str()])
                    .inc();
            }
            channel.send(notification)
        })
        .await;

        match outcome.result {
            Ok(()) => {
                metrics::NOTIFICATIONS_TOTAL
                    .with_label_values(&[name.as_str(), "delivered"])
                    .inc();
                (
                    ChannelOutcome {
                        channel: name,
                        attempts: outcome.attempts,
                        delays: outcome.delays,
                        error: None,
                    },
                    None,
                )
            }
            Err(e) => {
                metrics::NOTIFICATIONS_TOTAL
                    .with_label_values(&[name.as_str(), "failed"])
                    .inc();
                error!(
                    channel = %name,
                    attempts = outcome.attempts,
                    error = %e,
                    "Notification delivery failed"
                );
                (
                    ChannelOutcome {
                        channel: name.clone(),
                        attempts: outcome.attempts,
                        delays: outcome.delays,
                        error: Some(e.to_string()),
                    },
                    Some(ChannelFailure {
                        service: name,
                        attempts: outcome.attempts,
                        error: e,
                    }),
                )
            }
        }
    }
}
