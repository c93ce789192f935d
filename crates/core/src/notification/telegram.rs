//! Telegram Bot API channel.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::TelegramConfig;
use crate::secrets::{self, SecretProvider};

use super::error::NotificationError;
use super::traits::NotificationChannel;
use super::types::Notification;

const SERVICE: &str = "telegram";

/// Sends notifications as bot messages to a single chat.
pub struct TelegramChannel {
    client: Client,
    api_url: String,
    token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct BotResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramChannel {
    /// Create a new Telegram channel.
    ///
    /// The bot token comes from `config.token` or, failing that, from the
    /// secret provider under [`secrets::TELEGRAM_TOKEN`].
    pub fn new(
        config: &TelegramConfig,
        provider: &dyn SecretProvider,
    ) -> Result<Self, NotificationError> {
        let token = secrets::resolve_secret(
            config.token.as_deref(),
            provider,
            secrets::TELEGRAM_TOKEN,
        )
        .ok_or_else(|| NotificationError::setup(SERVICE, "bot token is not configured"))?;

        let chat_id = config
            .chat_id
            .clone()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| NotificationError::setup(SERVICE, "chat_id is not configured"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotificationError::setup(SERVICE, e.to_string()))?;

        info!(api_url = %config.api_url, chat_id = %chat_id, "Telegram channel initialized");

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token,
            chat_id,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    async fn check_response(
        &self,
        response: reqwest::Response,
    ) -> Result<(), NotificationError> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        // The token is part of the URL, so only the body is reported.
        if !status.is_success() {
            let reason = serde_json::from_str::<BotResponse>(&body)
                .ok()
                .and_then(|r| r.description)
                .unwrap_or(body);
            return Err(NotificationError::send(
                SERVICE,
                format!("HTTP {}: {}", status.as_u16(), reason),
            ));
        }

        match serde_json::from_str::<BotResponse>(&body) {
            Ok(r) if r.ok => Ok(()),
            Ok(r) => Err(NotificationError::send(
                SERVICE,
                r.description.unwrap_or_else(|| "request rejected".to_string()),
            )),
            Err(e) => Err(NotificationError::send(
                SERVICE,
                format!("invalid response: {}", e),
            )),
        }
    }
}

fn transport_error(error: reqwest::Error) -> String {
    // reqwest includes the request URL, which contains the bot token.
    error.without_url().to_string()
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        let text = notification.body();
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text: &text,
        };

        debug!(chat_id = %self.chat_id, "Sending Telegram message");

        let response = self
            .client
            .post(self.endpoint("sendMessage"))
            .json(&request)
            .send()
            .await
            .map_err(|e| NotificationError::send(SERVICE, transport_error(e)))?;

        self.check_response(response).await
    }

    async fn validate(&self) -> Result<(), NotificationError> {
        let response = self
            .client
            .get(self.endpoint("getMe"))
            .send()
            .await
            .map_err(|e| NotificationError::setup(SERVICE, transport_error(e)))?;

        self.check_response(response).await.map_err(|e| match e {
            NotificationError::Send { reason, .. } => NotificationError::setup(SERVICE, reason),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::StaticSecretProvider;

    fn config() -> TelegramConfig {
        TelegramConfig {
            enabled: true,
            chat_id: Some("-100123".to_string()),
            api_url: "http://127.0.0.1:1/".to_string(),
            timeout_secs: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_token_from_secret_provider() {
        let provider = StaticSecretProvider::new().with_secret(secrets::TELEGRAM_TOKEN, "abc:123");
        let channel = TelegramChannel::new(&config(), &provider).unwrap();
        assert_eq!(channel.name(), "telegram");
        assert_eq!(
            channel.endpoint("sendMessage"),
            "http://127.0.0.1:1/botabc:123/sendMessage"
        );
    }

    #[test]
    fn test_missing_token_is_setup_error() {
        let err = TelegramChannel::new(&config(), &StaticSecretProvider::new())
            .err()
            .unwrap();
        assert!(matches!(err, NotificationError::Setup { .. }));
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn test_missing_chat_id_is_setup_error() {
        let mut config = config();
        config.token = Some("abc:123".to_string());
        config.chat_id = None;
        let err = TelegramChannel::new(&config, &StaticSecretProvider::new())
            .err()
            .unwrap();
        assert!(err.to_string().contains("chat_id"));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_send_error_without_token() {
        let mut config = config();
        config.token = Some("secret-token".to_string());
        let channel = TelegramChannel::new(&config, &StaticSecretProvider::new()).unwrap();

        let err = channel
            .send(&Notification::new("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::Send { .. }));
        assert!(!err.to_string().contains("secret-token"));
    }
}
