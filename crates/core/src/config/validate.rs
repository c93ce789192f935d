use super::{types::Config, ConfigError};

/// Upper bound for `general.max_workers`. The worker semaphore rejects
/// permit counts above `Semaphore::MAX_PERMITS`.
pub const MAX_WORKERS: usize = 4096;

/// Validate configuration
/// Currently validates:
/// - Worker concurrency is between 1 and [`MAX_WORKERS`]
/// - Retry bounds are consistent
/// - Enabled notification channels have their non-secret fields
/// - Media extensions are non-empty
///
/// Filesystem checks on the upload directory happen in [`super::Settings::new`].
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.general.max_workers < 1 {
        return Err(ConfigError::invalid(
            "general.max_workers",
            "must be greater than 0",
        ));
    }
    if config.general.max_workers > MAX_WORKERS {
        return Err(ConfigError::invalid(
            "general.max_workers",
            format!(
                "{} exceeds the limit of {}",
                config.general.max_workers, MAX_WORKERS
            ),
        ));
    }

    if config.general.upload_dir.as_os_str().is_empty() {
        return Err(ConfigError::invalid("general.upload_dir", "cannot be empty"));
    }

    let retry = &config.retry;
    if retry.max_attempts < 1 {
        return Err(ConfigError::invalid(
            "retry.max_attempts",
            "must be greater than 0",
        ));
    }
    if retry.min_delay_ms > retry.max_delay_ms {
        return Err(ConfigError::invalid(
            "retry.min_delay_ms",
            format!(
                "{} exceeds retry.max_delay_ms ({})",
                retry.min_delay_ms, retry.max_delay_ms
            ),
        ));
    }
    if !retry.multiplier.is_finite() || retry.multiplier < 1.0 {
        return Err(ConfigError::invalid(
            "retry.multiplier",
            format!("must be a finite number >= 1.0, got {}", retry.multiplier),
        ));
    }

    for (field, formats) in [
        ("media.allowed_image_formats", &config.media.allowed_image_formats),
        ("media.allowed_video_formats", &config.media.allowed_video_formats),
    ] {
        if formats.iter().any(|f| f.trim().trim_start_matches('.').is_empty()) {
            return Err(ConfigError::invalid(field, "contains an empty extension"));
        }
    }

    if config.telegram.enabled && is_blank(&config.telegram.chat_id) {
        return Err(ConfigError::invalid(
            "telegram.chat_id",
            "required when telegram is enabled",
        ));
    }

    if config.email.enabled {
        for (field, value) in [
            ("email.smtp_server", &config.email.smtp_server),
            ("email.from", &config.email.from),
            ("email.to", &config.email.to),
        ] {
            if is_blank(value) {
                return Err(ConfigError::invalid(field, "required when email is enabled"));
            }
        }
    }

    Ok(())
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}
