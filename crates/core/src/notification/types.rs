//! Types for the notification module.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A status or error message sent to every enabled channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Main message text.
    pub message: String,
    /// Error detail appended to the message, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Notification {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
        }
    }

    /// Attaches the display text of `error`.
    pub fn with_error(mut self, error: &(dyn std::error::Error + '_)) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Attaches a plain error detail.
    pub fn with_error_text(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Subject line for channels that have one.
    pub fn subject(&self) -> &'static str {
        if self.is_error() {
            "Upload error"
        } else {
            "Upload status"
        }
    }

    /// Message followed by the error detail on its own line.
    pub fn body(&self) -> String {
        match &self.error {
            Some(error) => format!("{}\n{}", self.message, error),
            None => self.message.clone(),
        }
    }
}

/// Delivery outcome of one channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelOutcome {
    /// Channel name.
    pub channel: String,
    /// Attempts made, including the first one.
    pub attempts: u32,
    /// Backoff delays waited between attempts.
    #[serde(with = "millis")]
    pub delays: Vec<Duration>,
    /// Last error, if the channel gave up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChannelOutcome {
    pub fn delivered(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-channel outcomes of one `notify` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub outcomes: Vec<ChannelOutcome>,
}

impl DeliveryReport {
    /// Whether every channel delivered. True for an empty report.
    pub fn all_delivered(&self) -> bool {
        self.outcomes.iter().all(ChannelOutcome::delivered)
    }

    /// Outcome for the channel called `name`.
    pub fn outcome(&self, name: &str) -> Option<&ChannelOutcome> {
        self.outcomes.iter().find(|o| o.channel == name)
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(delays: &[Duration], s: S) -> Result<S::Ok, S::Error> {
        delays
            .iter()
            .map(|d| d.as_millis() as u64)
            .collect::<Vec<_>>()
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Duration>, D::Error> {
        let millis = Vec::<u64>::deserialize(d)?;
        Ok(millis.into_iter().map(Duration::from_millis).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_notification() {
        let n = Notification::new("3 files processed");
        assert!(!n.is_error());
        assert_eq!(n.subject(), "Upload status");
        assert_eq!(n.body(), "3 files processed");
    }

    #[test]
    fn test_error_notification() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let n = Notification::new("Upload failed").with_error(&io);
        assert!(n.is_error());
        assert_eq!(n.subject(), "Upload error");
        assert_eq!(n.body(), "Upload failed\ndisk full");
    }

    #[test]
    fn test_report_serializes_delays_as_millis() {
        let report = DeliveryReport {
            outcomes: vec![ChannelOutcome {
                channel: "telegram".to_string(),
                attempts: 2,
                delays: vec![Duration::from_millis(250)],
                error: None,
            }],
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"delays\":[250]"));
        assert!(report.all_delivered());
        assert_eq!(report.outcome("telegram").unwrap().attempts, 2);
        assert!(report.outcome("email").is_none());
    }
}
