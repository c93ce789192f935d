//! Error types for the notification module.

use thiserror::Error;

/// Errors that can occur while configuring or using notification channels.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// A channel could not be configured (missing credentials, bad address,
    /// failed authentication).
    #[error("Failed to configure {service}: {reason}")]
    Setup { service: String, reason: String },

    /// A single send attempt failed.
    #[error("Failed to send via {service}: {reason}")]
    Send { service: String, reason: String },

    /// One or more channels exhausted their retry attempts.
    #[error("Notification delivery failed: {}", describe_failures(.failures))]
    Delivery { failures: Vec<ChannelFailure> },
}

impl NotificationError {
    /// Creates a new setup error.
    pub fn setup(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Setup {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new send error.
    pub fn send(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Send {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// Name of the channel this error is about; `None` for aggregated
    /// delivery errors.
    pub fn service(&self) -> Option<&str> {
        match self {
            Self::Setup { service, .. } | Self::Send { service, .. } => Some(service),
            Self::Delivery { .. } => None,
        }
    }

    /// Per-channel failures carried by a delivery error; empty for other variants.
    pub fn failures(&self) -> &[ChannelFailure] {
        match self {
            Self::Delivery { failures } => failures,
            _ => &[],
        }
    }
}

/// A channel that gave up after exhausting its attempts.
#[derive(Debug)]
pub struct ChannelFailure {
    /// Channel name (e.g., "telegram", "email").
    pub service: String,
    /// Attempts made, including the first one.
    pub attempts: u32,
    /// Error of the last attempt.
    pub error: NotificationError,
}

fn describe_failures(failures: &[ChannelFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} after {} attempt(s): {}", f.service, f.attempts, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}
