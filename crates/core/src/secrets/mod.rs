//! Secret lookup for channel credentials.
//!
//! Credentials can be set directly in the configuration (which itself is read
//! from the environment) or resolved through a [`SecretProvider`] injected at
//! service construction. Configuration values win over the provider.

use std::collections::HashMap;

/// Secret key for the Telegram bot token.
pub const TELEGRAM_TOKEN: &str = "telegram_token";

/// Secret key for the SMTP password.
pub const SMTP_PASSWORD: &str = "smtp_password";

/// Source of named secrets.
pub trait SecretProvider: Send + Sync {
    /// Returns the secret stored under `key`, if any.
    fn secret(&self, key: &str) -> Option<String>;
}

/// Reads secrets from `MEDIADROP_SECRET_<KEY>` environment variables.
#[derive(Debug, Clone)]
pub struct EnvSecretProvider {
    prefix: String,
}

impl Default for EnvSecretProvider {
    fn default() -> Self {
        Self::with_prefix("MEDIADROP_SECRET_")
    }
}

impl EnvSecretProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn var_name(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.to_uppercase())
    }
}

impl SecretProvider for EnvSecretProvider {
    fn secret(&self, key: &str) -> Option<String> {
        std::env::var(self.var_name(key))
            .ok()
            .filter(|v| !v.is_empty())
    }
}

/// In-memory secrets, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticSecretProvider {
    secrets: HashMap<String, String>,
}

impl StaticSecretProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(key.into(), value.into());
        self
    }
}

impl SecretProvider for StaticSecretProvider {
    fn secret(&self, key: &str) -> Option<String> {
        self.secrets.get(key).cloned()
    }
}

/// Returns the configured value when present and non-empty, otherwise asks the provider.
pub fn resolve_secret(
    configured: Option<&str>,
    provider: &dyn SecretProvider,
    key: &str,
) -> Option<String> {
    configured
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| provider.secret(key))
}
