//! Notification module for upload status and error messages.
//!
//! This module provides the `NotificationService` which delivers a message
//! to every enabled channel:
//! - Telegram: bot message to a single chat
//! - Email: plain-text mail over SMTP with STARTTLS
//!
//! Each channel is retried on its own with exponential backoff, bounded by
//! the `[retry]` configuration section.
//!
//! # Example
//!
//! ```ignore
//! use mediadrop_core::notification::NotificationService;
//! use mediadrop_core::secrets::EnvSecretProvider;
//!
//! let notifier = NotificationService::new(&settings, &EnvSecretProvider::new())?;
//! notifier.notify("Batch finished", None).await?;
//! ```

mod email;
mod error;
mod retry;
mod service;
mod telegram;
mod traits;
mod types;

pub use email::{EmailChannel, DEFAULT_SMTP_PORT};
pub use error::{ChannelFailure, NotificationError};
pub use retry::{retry_with_backoff, RetryOutcome, RetryPolicy};
pub use service::NotificationService;
pub use telegram::TelegramChannel;
pub use traits::NotificationChannel;
pub use types::{ChannelOutcome, DeliveryReport, Notification};
