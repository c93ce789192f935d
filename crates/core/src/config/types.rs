use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub general: GeneralConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

/// General runtime settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Maximum number of files transformed at the same time.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Directory scanned for media. Created on startup if missing.
    pub upload_dir: PathBuf,
    /// Default log filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_workers() -> usize {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Media acceptance policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaConfig {
    #[serde(default = "default_image_formats")]
    pub allowed_image_formats: Vec<String>,
    #[serde(default = "default_video_formats")]
    pub allowed_video_formats: Vec<String>,
    /// Maximum video size in bytes.
    #[serde(default = "default_max_video_size")]
    pub max_video_size: u64,
    /// Maximum video duration in seconds.
    #[serde(default = "default_max_video_duration")]
    pub max_video_duration_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            allowed_image_formats: default_image_formats(),
            allowed_video_formats: default_video_formats(),
            max_video_size: default_max_video_size(),
            max_video_duration_secs: default_max_video_duration(),
        }
    }
}

fn default_image_formats() -> Vec<String> {
    vec![".jpg".to_string(), ".png".to_string()]
}

fn default_video_formats() -> Vec<String> {
    vec![".mp4".to_string(), ".mov".to_string()]
}

fn default_max_video_size() -> u64 {
    100 * 1024 * 1024 // 100 MiB
}

fn default_max_video_duration() -> u64 {
    60
}

/// Retry policy for notification delivery.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Total attempts per channel, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Lower bound for the delay between attempts in milliseconds.
    #[serde(default = "default_min_delay")]
    pub min_delay_ms: u64,

    /// Upper bound for the delay between attempts in milliseconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Exponential backoff multiplier.
    #[serde(default = "default_backoff_multiplier")]
    pub multiplier: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_min_delay() -> u64 {
    4_000
}

fn default_max_delay() -> u64 {
    10_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            min_delay_ms: default_min_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_backoff_multiplier(),
        }
    }
}

/// Telegram bot channel configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Bot token. Falls back to the `telegram_token` secret when unset.
    #[serde(default)]
    pub token: Option<String>,
    /// Target chat. Numeric ids may be given unquoted.
    #[serde(default, deserialize_with = "string_or_number")]
    pub chat_id: Option<String>,
    /// Bot API base URL (e.g., "https://api.telegram.org")
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token: None,
            chat_id: None,
            api_url: default_telegram_api_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// SMTP email channel configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub smtp_server: Option<String>,
    #[serde(default)]
    pub smtp_port: Option<u16>,
    #[serde(default)]
    pub smtp_user: Option<String>,
    /// SMTP password. Falls back to the `smtp_password` secret when unset.
    #[serde(default, deserialize_with = "string_or_number")]
    pub smtp_password: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

/// Accepts a string or an integer, since environment values that look
/// numeric arrive as numbers.
fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
    }

    Ok(Option::<Raw>::deserialize(d)?.map(|raw| match raw {
        Raw::Str(s) => s,
        Raw::Int(i) => i.to_string(),
    }))
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub general: GeneralConfig,
    pub media: MediaConfig,
    pub retry: RetryConfig,
    pub telegram: SanitizedTelegramConfig,
    pub email: SanitizedEmailConfig,
}

/// Sanitized Telegram config (token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTelegramConfig {
    pub enabled: bool,
    pub token_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    pub api_url: String,
}

/// Sanitized email config (password hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedEmailConfig {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_user: Option<String>,
    pub password_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            general: config.general.clone(),
            media: config.media.clone(),
            retry: config.retry.clone(),
            telegram: SanitizedTelegramConfig {
                enabled: config.telegram.enabled,
                token_configured: config
                    .telegram
                    .token
                    .as_ref()
                    .is_some_and(|t| !t.is_empty()),
                chat_id: config.telegram.chat_id.clone(),
                api_url: config.telegram.api_url.clone(),
            },
            email: SanitizedEmailConfig {
                enabled: config.email.enabled,
                smtp_server: config.email.smtp_server.clone(),
                smtp_port: config.email.smtp_port,
                smtp_user: config.email.smtp_user.clone(),
                password_configured: config
                    .email
                    .smtp_password
                    .as_ref()
                    .is_some_and(|p| !p.is_empty()),
                from: config.email.from.clone(),
                to: config.email.to.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_config() {
        let toml = r#"
[general]
upload_dir = "/srv/uploads"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.general.max_workers, 4);
        assert_eq!(config.general.upload_dir.to_str().unwrap(), "/srv/uploads");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.media.allowed_image_formats, vec![".jpg", ".png"]);
        assert_eq!(config.media.allowed_video_formats, vec![".mp4", ".mov"]);
        assert_eq!(config.media.max_video_size, 100 * 1024 * 1024);
        assert_eq!(config.media.max_video_duration_secs, 60);
        assert!(!config.telegram.enabled);
        assert!(!config.email.enabled);
    }

    #[test]
    fn test_deserialize_missing_upload_dir_fails() {
        let toml = r#"
[general]
max_workers = 2
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_retry_defaults() {
        let retry = RetryConfig::default();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.min_delay_ms, 4_000);
        assert_eq!(retry.max_delay_ms, 10_000);
        assert_eq!(retry.multiplier, 2.0);
    }

    #[test]
    fn test_deserialize_channels() {
        let toml = r#"
[general]
upload_dir = "/srv/uploads"

[telegram]
enabled = true
chat_id = "12345"

[email]
enabled = true
smtp_server = "smtp.example.com"
smtp_user = "bot@example.com"
from = "bot@example.com"
to = "ops@example.com"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.telegram.enabled);
        assert_eq!(config.telegram.chat_id.as_deref(), Some("12345"));
        assert_eq!(config.telegram.api_url, "https://api.telegram.org");
        assert!(config.telegram.token.is_none());
        assert_eq!(
            config.email.smtp_server.as_deref(),
            Some("smtp.example.com")
        );
        assert!(config.email.smtp_port.is_none());
    }

    #[test]
    fn test_numeric_chat_id() {
        let toml = r#"
[general]
upload_dir = "/srv/uploads"

[telegram]
chat_id = -100777
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.telegram.chat_id.as_deref(), Some("-100777"));
    }

    #[test]
    fn test_sanitized_config_hides_secrets() {
        let toml = r#"
[general]
upload_dir = "/srv/uploads"

[telegram]
enabled = true
token = "123:secret-token"
chat_id = "42"

[email]
enabled = true
smtp_server = "smtp.example.com"
smtp_password = "hunter2"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.telegram.token_configured);
        assert!(sanitized.email.password_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-token"));
        assert!(!json.contains("hunter2"));
        assert!(json.contains("\"chat_id\":\"42\""));
    }
}
