//! Error types for the media module.

use std::path::PathBuf;
use thiserror::Error;

use super::types::FileFailure;

/// Errors raised by a [`super::Transformer`] for a single file.
#[derive(Debug, Error)]
pub enum TransformError {
    /// I/O error while reading or writing the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transformer cannot handle this file.
    #[error("Unsupported media: {reason}")]
    Unsupported { reason: String },

    /// The transformation ran and failed.
    #[error("Transformation failed: {reason}")]
    Failed { reason: String },

    /// Any other error from a custom transformer.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TransformError {
    /// Creates a new transformation failed error.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Creates a new unsupported media error.
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::Unsupported {
            reason: reason.into(),
        }
    }
}

/// Errors that can occur while scanning or processing media.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The directory could not be enumerated.
    #[error("Failed to scan {path}: {reason}")]
    Scan { path: PathBuf, reason: String },

    /// The transformer failed for one file.
    #[error("Failed to process {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: TransformError,
    },

    /// The worker running a file stopped without producing a result.
    #[error("Worker for {path} stopped unexpectedly: {reason}")]
    Worker { path: PathBuf, reason: String },

    /// Processing was cancelled before the file was started.
    #[error("Processing of {path} was cancelled")]
    Cancelled { path: PathBuf },

    /// One or more files of a batch failed.
    #[error(
        "{} of {} files failed in {}",
        .failures.len(),
        .total,
        .directory.display()
    )]
    Batch {
        directory: PathBuf,
        total: usize,
        failures: Vec<FileFailure>,
    },
}

impl ProcessingError {
    /// Path of the file (or directory, for scan and batch errors) this error is about.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Scan { path, .. }
            | Self::File { path, .. }
            | Self::Worker { path, .. }
            | Self::Cancelled { path } => path,
            Self::Batch { directory, .. } => directory,
        }
    }

    /// Per-file failures carried by a batch error; empty for other variants.
    pub fn failures(&self) -> &[FileFailure] {
        match self {
            Self::Batch { failures, .. } => failures,
            _ => &[],
        }
    }

    /// Whether this error represents a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
