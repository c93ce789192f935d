//! Types for the media module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use super::error::ProcessingError;

/// Kind of an accepted media file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file that passed the media policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// Path to the file.
    pub path: PathBuf,
    /// Image or video.
    pub kind: MediaKind,
    /// Size in bytes at classification time.
    pub size_bytes: u64,
    /// Video duration, when a probe reported one.
    pub duration: Option<Duration>,
}

/// Why a file was not accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// The file does not exist.
    Missing,
    /// The path exists but is not a regular file.
    NotAFile,
    /// The extension is not in any allowed list.
    UnsupportedFormat { extension: Option<String> },
    /// The video is larger than the configured maximum.
    VideoTooLarge { size_bytes: u64, max_bytes: u64 },
    /// The video is longer than the configured maximum.
    VideoTooLong { duration_secs: f64, max_secs: u64 },
}

impl RejectReason {
    /// Short label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::NotAFile => "not_a_file",
            Self::UnsupportedFormat { .. } => "unsupported_format",
            Self::VideoTooLarge { .. } => "video_too_large",
            Self::VideoTooLong { .. } => "video_too_long",
        }
    }
}

/// Outcome of classifying a single path.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Accepted(MediaFile),
    Rejected { path: PathBuf, reason: RejectReason },
}

impl Classification {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    pub fn into_accepted(self) -> Option<MediaFile> {
        match self {
            Self::Accepted(file) => Some(file),
            Self::Rejected { .. } => None,
        }
    }
}

/// A file that failed during a batch, with the error that stopped it.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: ProcessingError,
}

/// Result of processing one directory.
///
/// Successes and failures are both kept so the caller decides how to treat a
/// partially successful batch.
#[derive(Debug)]
pub struct BatchResult {
    /// Unique id of this batch, used in logs.
    pub batch_id: Uuid,
    /// Directory that was scanned.
    pub directory: PathBuf,
    /// When the batch started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Files that passed validation and were dispatched.
    pub candidates: usize,
    /// Files that were skipped by the media policy.
    pub rejected: usize,
    /// Output paths of successful files, in completion order.
    pub processed: Vec<PathBuf>,
    /// Every file that failed.
    pub failures: Vec<FileFailure>,
}

impl BatchResult {
    /// Whether every dispatched file succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Collapses the batch into the all-or-nothing form: the processed paths,
    /// or a [`ProcessingError::Batch`] listing every failure.
    pub fn into_result(self) -> Result<Vec<PathBuf>, ProcessingError> {
        if self.failures.is_empty() {
            Ok(self.processed)
        } else {
            Err(ProcessingError::Batch {
                directory: self.directory,
                total: self.candidates,
                failures: self.failures,
            })
        }
    }
}

/// Status of the worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Number of files being transformed right now.
    pub active_jobs: usize,
    /// Maximum concurrent transformations.
    pub max_concurrent: usize,
    /// Number of files waiting for a worker.
    pub queued_jobs: usize,
    /// Total files processed since startup.
    pub total_processed: u64,
    /// Total files failed since startup.
    pub total_failed: u64,
}
