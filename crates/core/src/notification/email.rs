//! SMTP email channel.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use crate::config::EmailConfig;
use crate::secrets::{self, SecretProvider};

use super::error::NotificationError;
use super::traits::NotificationChannel;
use super::types::Notification;

const SERVICE: &str = "email";

/// Default SMTP submission port (STARTTLS).
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Sends notifications as plain-text email over a STARTTLS connection.
///
/// The transport keeps a connection pool, so the authenticated session is
/// reused across sends.
pub struct EmailChannel {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailChannel {
    /// Create a new email channel.
    ///
    /// The password comes from `config.smtp_password` or, failing that, from
    /// the secret provider under [`secrets::SMTP_PASSWORD`]. No connection is
    /// opened until the first send or [`NotificationChannel::validate`].
    pub fn new(
        config: &EmailConfig,
        provider: &dyn SecretProvider,
    ) -> Result<Self, NotificationError> {
        let host = required(config.smtp_server.as_deref(), "smtp_server")?;
        let from = parse_mailbox(required(config.from.as_deref(), "from")?)?;
        let to = parse_recipients(required(config.to.as_deref(), "to")?)?;
        let port = config.smtp_port.unwrap_or(DEFAULT_SMTP_PORT);

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| NotificationError::setup(SERVICE, e.to_string()))?
            .port(port);

        if let Some(user) = config.smtp_user.as_deref().filter(|u| !u.is_empty()) {
            let password = secrets::resolve_secret(
                config.smtp_password.as_deref(),
                provider,
                secrets::SMTP_PASSWORD,
            )
            .ok_or_else(|| {
                NotificationError::setup(SERVICE, "smtp_user is set but no password is configured")
            })?;
            builder = builder.credentials(Credentials::new(user.to_string(), password));
        }

        info!(
            host = %host,
            port = port,
            recipients = to.len(),
            "Email channel initialized (SMTP with STARTTLS)"
        );

        Ok(Self {
            mailer: builder.build(),
            from,
            to,
        })
    }

    fn build_message(&self, notification: &Notification) -> Result<Message, NotificationError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(notification.subject());
        for mailbox in &self.to {
            builder = builder.to(mailbox.clone());
        }
        builder
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body())
            .map_err(|e| NotificationError::send(SERVICE, e.to_string()))
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, NotificationError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| NotificationError::setup(SERVICE, format!("{} is not configured", field)))
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotificationError> {
    address
        .trim()
        .parse()
        .map_err(|e| {
            NotificationError::setup(SERVICE, format!("invalid address '{}': {}", address, e))
        })
}

/// Parses a comma-separated recipient list.
fn parse_recipients(list: &str) -> Result<Vec<Mailbox>, NotificationError> {
    let recipients = list
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(parse_mailbox)
        .collect::<Result<Vec<_>, _>>()?;

    if recipients.is_empty() {
        return Err(NotificationError::setup(SERVICE, "no valid recipient addresses"));
    }
    Ok(recipients)
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        let message = self.build_message(notification)?;

        debug!(subject = notification.subject(), recipients = self.to.len(), "Sending email");

        self.mailer
            .send(message)
            .await
            .map_err(|e| NotificationError::send(SERVICE, e.to_string()))?;
        Ok(())
    }

    async fn validate(&self) -> Result<(), NotificationError> {
        match self.mailer.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(NotificationError::setup(
                SERVICE,
                "SMTP server refused the connection",
            )),
            Err(e) => Err(NotificationError::setup(SERVICE, e.to_string())),
        }
    }
}
