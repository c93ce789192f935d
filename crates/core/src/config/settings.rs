//! Validated, immutable settings shared by the processor and the notifier.

use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::types::{Config, RetryConfig};
use super::validate::validate_config;
use super::ConfigError;

/// Configuration that passed validation.
///
/// Cloning is cheap; every clone shares the same frozen [`Config`]. The raw
/// fields stay readable through `Deref`, but nothing can mutate them.
#[derive(Debug, Clone)]
pub struct Settings {
    inner: Arc<Config>,
}

impl Settings {
    /// Validates `config`, normalizes extension lists and makes sure the
    /// upload directory exists (creating it with its parents if needed).
    pub fn new(mut config: Config) -> Result<Self, ConfigError> {
        validate_config(&config)?;

        config.media.allowed_image_formats =
            normalize_extensions(&config.media.allowed_image_formats);
        config.media.allowed_video_formats =
            normalize_extensions(&config.media.allowed_video_formats);

        ensure_upload_dir(&config.general.upload_dir)?;

        Ok(Self {
            inner: Arc::new(config),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner
    }

    pub fn max_workers(&self) -> usize {
        self.inner.general.max_workers
    }

    pub fn upload_dir(&self) -> &Path {
        &self.inner.general.upload_dir
    }

    pub fn log_level(&self) -> &str {
        &self.inner.general.log_level
    }

    pub fn max_video_size(&self) -> u64 {
        self.inner.media.max_video_size
    }

    pub fn max_video_duration(&self) -> Duration {
        Duration::from_secs(self.inner.media.max_video_duration_secs)
    }

    pub fn retry(&self) -> &RetryConfig {
        &self.inner.retry
    }

    /// Whether `extension` (with or without the leading dot, any case) is an
    /// accepted image format.
    pub fn is_image_extension(&self, extension: &str) -> bool {
        contains_extension(&self.inner.media.allowed_image_formats, extension)
    }

    /// Whether `extension` (with or without the leading dot, any case) is an
    /// accepted video format.
    pub fn is_video_extension(&self, extension: &str) -> bool {
        contains_extension(&self.inner.media.allowed_video_formats, extension)
    }
}

impl Deref for Settings {
    type Target = Config;

    fn deref(&self) -> &Config {
        &self.inner
    }
}

impl TryFrom<Config> for Settings {
    type Error = ConfigError;

    fn try_from(config: Config) -> Result<Self, Self::Error> {
        Self::new(config)
    }
}

/// Lowercases, adds the leading dot and drops duplicates, keeping first-seen order.
fn normalize_extensions(formats: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(formats.len());
    for format in formats {
        let ext = normalize_extension(format);
        if !normalized.contains(&ext) {
            normalized.push(ext);
        }
    }
    normalized
}

fn normalize_extension(ext: &str) -> String {
    format!(".{}", ext.trim().trim_start_matches('.').to_lowercase())
}

fn contains_extension(formats: &[String], extension: &str) -> bool {
    let ext = normalize_extension(extension);
    formats.iter().any(|f| *f == ext)
}

fn ensure_upload_dir(path: &Path) -> Result<(), ConfigError> {
    let upload_dir_error = |reason: String| ConfigError::UploadDir {
        path: path.to_path_buf(),
        reason,
    };

    if path.exists() {
        if !path.is_dir() {
            return Err(upload_dir_error("path exists but is not a directory".to_string()));
        }
    } else {
        std::fs::create_dir_all(path).map_err(|e| upload_dir_error(e.to_string()))?;
        info!(path = %path.display(), "Created upload directory");
    }

    ensure_writable(path).map_err(|e| upload_dir_error(format!("not writable: {}", e)))
}

/// Fails unless a file can be created (and removed again) inside `dir`.
fn ensure_writable(dir: &Path) -> std::io::Result<()> {
    if std::fs::metadata(dir)?.permissions().readonly() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "directory is read-only",
        ));
    }
    tempfile::Builder::new()
        .prefix(".mediadrop-")
        .tempfile_in(dir)?
        .close()
}
