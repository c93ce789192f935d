//! Trait definitions for the notification module.

use async_trait::async_trait;

use super::error::NotificationError;
use super::types::Notification;

/// A destination for status and error messages.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Returns the name of this channel (e.g., "telegram", "email").
    fn name(&self) -> &str;

    /// Sends one notification. A single attempt; retries are handled by the
    /// service.
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;

    /// Validates that the channel is properly configured and reachable.
    async fn validate(&self) -> Result<(), NotificationError> {
        Ok(())
    }
}
