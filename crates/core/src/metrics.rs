//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Media processing (scans, transformations, rejections)
//! - Notification delivery (sends, retries)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

// =============================================================================
// Media Processing Metrics
// =============================================================================

/// Directory batches processed.
pub static BATCHES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("mediadrop_batches_total", "Total directory batches processed").unwrap()
});

/// Files processed total by result.
pub static FILES_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediadrop_files_processed_total", "Total files processed"),
        &["result"], // "success", "failed", "cancelled"
    )
    .unwrap()
});

/// Files rejected during validation by reason.
pub static FILES_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediadrop_files_rejected_total",
            "Total files rejected by media policy",
        ),
        // missing, not_a_file, unsupported_format, video_too_large, video_too_long
        &["reason"],
    )
    .unwrap()
});

/// Per-file transformation duration in seconds.
pub static TRANSFORM_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mediadrop_transform_duration_seconds",
            "Duration of per-file transformations",
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0]),
        &["kind"], // "image", "video"
    )
    .unwrap()
});

// =============================================================================
// Notification Metrics
// =============================================================================

/// Notification deliveries by channel and final result.
pub static NOTIFICATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediadrop_notifications_total", "Total notification deliveries"),
        &["channel", "result"], // result: "delivered", "failed"
    )
    .unwrap()
});

/// Notification retry attempts by channel.
pub static NOTIFICATION_RETRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediadrop_notification_retries_total",
            "Total notification retry attempts",
        ),
        &["channel"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Processing
        Box::new(BATCHES_TOTAL.clone()),
        Box::new(FILES_PROCESSED.clone()),
        Box::new(FILES_REJECTED.clone()),
        Box::new(TRANSFORM_DURATION.clone()),
        // Notifications
        Box::new(NOTIFICATIONS_TOTAL.clone()),
        Box::new(NOTIFICATION_RETRIES.clone()),
    ]
}

/// Registers every core metric in `registry`.
pub fn register_all(registry: &Registry) -> prometheus::Result<()> {
    for metric in all_metrics() {
        registry.register(metric)?;
    }
    Ok(())
}
