mod metrics;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mediadrop_core::{
    load_config, notification::Notification, BatchResult, EnvSecretProvider, MediaProcessor,
    NotificationService, SanitizedConfig, Settings,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Optional path of a TOML configuration file.
const CONFIG_ENV: &str = "MEDIADROP_CONFIG";

/// Optional path where the Prometheus text exposition is written on exit.
const METRICS_FILE_ENV: &str = "MEDIADROP_METRICS_FILE";

/// Set to "json" for JSON log lines.
const LOG_FORMAT_ENV: &str = "MEDIADROP_LOG_FORMAT";

/// Exit code when the run completed but some files failed.
const EXIT_PARTIAL_FAILURE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            init_tracing("info");
            error!("Fatal error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(settings.log_level());

    match run(settings).await {
        Ok(batch) if batch.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(EXIT_PARTIAL_FAILURE),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_settings() -> Result<Settings> {
    let config_path = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);

    let config = load_config(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("Failed to load config from {:?}", path),
        None => "Failed to load config from environment".to_string(),
    })?;

    Settings::new(config).context("Configuration validation failed")
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run(settings: Settings) -> Result<BatchResult> {
    info!(version = VERSION, "Starting mediadrop");
    info!(
        config = %serde_json::to_string(&SanitizedConfig::from(settings.config()))
            .unwrap_or_default(),
        "Configuration loaded"
    );

    let cancel = CancellationToken::new();

    let notifier = NotificationService::connect(&settings, &EnvSecretProvider::new())
        .await
        .context("Failed to set up notification channels")?
        .with_cancellation(cancel.clone());
    if !notifier.is_enabled() {
        info!("No notification channels enabled");
    }

    let processor = MediaProcessor::new(settings.clone()).with_cancellation(cancel.clone());

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Shutdown signal received, cancelling pending files");
        shutdown.cancel();
    });

    let batch = match processor
        .process_directory_detailed(settings.upload_dir())
        .await
    {
        Ok(batch) => batch,
        Err(e) => {
            if let Err(notify_err) = notifier.notify("Upload processing failed", Some(&e)).await {
                error!(error = %notify_err, "Failed to send error notification");
            }
            write_metrics();
            return Err(e).context("Failed to process upload directory");
        }
    };

    if let Err(e) = notifier.send(&batch_notification(&batch)).await {
        error!(error = %e, "Failed to send summary notification");
    }

    write_metrics();
    Ok(batch)
}

/// Builds the summary notification for a finished batch.
fn batch_notification(batch: &BatchResult) -> Notification {
    let summary = batch_summary(batch);
    if batch.is_success() {
        Notification::new(summary)
    } else {
        Notification::new(summary).with_error_text(failure_details(batch))
    }
}

fn batch_summary(batch: &BatchResult) -> String {
    format!(
        "Processed {} of {} files in {} ({} rejected, {} failed, {} ms)",
        batch.processed.len(),
        batch.candidates,
        batch.directory.display(),
        batch.rejected,
        batch.failures.len(),
        batch.duration_ms
    )
}

fn failure_details(batch: &BatchResult) -> String {
    batch
        .failures
        .iter()
        .map(|f| format!("{}: {}", f.path.display(), f.error))
        .collect::<Vec<_>>()
        .join("\n")
}

fn write_metrics() {
    let Ok(path) = std::env::var(METRICS_FILE_ENV) else {
        return;
    };
    match metrics::write_textfile(Path::new(&path)) {
        Ok(()) => info!(path = %path, "Metrics written"),
        Err(e) => warn!(path = %path, error = %e, "Failed to write metrics"),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mediadrop_core::media::FileFailure;
    use mediadrop_core::{ProcessingError, TransformError};
    use uuid::Uuid;

    fn batch(failures: Vec<FileFailure>) -> BatchResult {
        BatchResult {
            batch_id: Uuid::new_v4(),
            directory: PathBuf::from("/uploads"),
            started_at: Utc::now(),
            duration_ms: 12,
            candidates: 3,
            rejected: 1,
            processed: vec![PathBuf::from("/uploads/a.jpg"), PathBuf::from("/uploads/b.mp4")],
            failures,
        }
    }

    #[test]
    fn test_successful_batch_notification() {
        let n = batch_notification(&batch(Vec::new()));
        assert!(!n.is_error());
        assert_eq!(
            n.message,
            "Processed 2 of 3 files in /uploads (1 rejected, 0 failed, 12 ms)"
        );
    }

    #[test]
    fn test_failed_batch_notification_lists_failures() {
        let failures = vec![FileFailure {
            path: PathBuf::from("/uploads/c.png"),
            error: ProcessingError::File {
                path: PathBuf::from("/uploads/c.png"),
                source: TransformError::failed("corrupt"),
            },
        }];
        let n = batch_notification(&batch(failures));

        assert!(n.is_error());
        assert_eq!(n.subject(), "Upload error");
        let detail = n.error.unwrap();
        assert!(detail.starts_with("/uploads/c.png: "));
        assert!(detail.contains("corrupt"));
    }
}
