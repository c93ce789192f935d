//! Media processor implementation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::metrics;

use super::error::ProcessingError;
use super::source::{DurationProbe, FsSource, MediaSource, NoDurationProbe};
use super::transform::{PassthroughTransformer, Transformer};
use super::types::{
    BatchResult, Classification, FileFailure, MediaFile, MediaKind, PoolStatus, RejectReason,
};

/// Tracks statistics for the worker pool.
#[derive(Default)]
struct PoolStats {
    active: AtomicU64,
    queued: AtomicU64,
    total_processed: AtomicU64,
    total_failed: AtomicU64,
}

impl PoolStats {
    fn to_status(&self, max_concurrent: usize) -> PoolStatus {
        PoolStatus {
            active_jobs: self.active.load(Ordering::Relaxed) as usize,
            max_concurrent,
            queued_jobs: self.queued.load(Ordering::Relaxed) as usize,
            total_processed: self.total_processed.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
        }
    }
}

/// Applies the media policy to paths.
#[derive(Clone)]
struct Classifier {
    settings: Settings,
    source: Arc<dyn MediaSource>,
    probe: Arc<dyn DurationProbe>,
}

/// Accepted files of a scan plus the number of rejected ones.
struct ScanReport {
    accepted: Vec<MediaFile>,
    rejected: usize,
}

impl Classifier {
    fn classify(&self, path: &Path) -> Classification {
        let reject = |reason: RejectReason| Classification::Rejected {
            path: path.to_path_buf(),
            reason,
        };

        let Some(meta) = self.source.metadata(path) else {
            return reject(RejectReason::Missing);
        };
        if !meta.is_file {
            return reject(RejectReason::NotAFile);
        }

        let extension = path.extension().and_then(|e| e.to_str());
        let kind = match extension {
            Some(ext) if self.settings.is_image_extension(ext) => MediaKind::Image,
            Some(ext) if self.settings.is_video_extension(ext) => MediaKind::Video,
            _ => {
                return reject(RejectReason::UnsupportedFormat {
                    extension: extension.map(str::to_string),
                })
            }
        };

        if kind == MediaKind::Image {
            return Classification::Accepted(MediaFile {
                path: path.to_path_buf(),
                kind,
                size_bytes: meta.size_bytes,
                duration: None,
            });
        }

        let max_bytes = self.settings.max_video_size();
        if meta.size_bytes > max_bytes {
            warn!(
                path = %path.display(),
                size_bytes = meta.size_bytes,
                max_bytes,
                "Video too large"
            );
            return reject(RejectReason::VideoTooLarge {
                size_bytes: meta.size_bytes,
                max_bytes,
            });
        }

        let duration = self.probe.video_duration(path);
        let max_duration = self.settings.max_video_duration();
        if let Some(duration) = duration.filter(|d| *d > max_duration) {
            warn!(
                path = %path.display(),
                duration_secs = duration.as_secs_f64(),
                max_secs = max_duration.as_secs(),
                "Video too long"
            );
            return reject(RejectReason::VideoTooLong {
                duration_secs: duration.as_secs_f64(),
                max_secs: max_duration.as_secs(),
            });
        }

        Classification::Accepted(MediaFile {
            path: path.to_path_buf(),
            kind,
            size_bytes: meta.size_bytes,
            duration,
        })
    }

    fn scan(&self, directory: &Path) -> Result<ScanReport, ProcessingError> {
        let paths = self
            .source
            .list_files(directory)
            .map_err(|e| ProcessingError::Scan {
                path: directory.to_path_buf(),
                reason: e.to_string(),
            })?;

        let mut report = ScanReport {
            accepted: Vec::new(),
            rejected: 0,
        };
        for path in paths {
            match self.classify(&path) {
                Classification::Accepted(file) => report.accepted.push(file),
                Classification::Rejected { path, reason } => {
                    debug!(path = %path.display(), reason = reason.label(), "Skipping file");
                    metrics::FILES_REJECTED
                        .with_label_values(&[reason.label()])
                        .inc();
                    report.rejected += 1;
                }
            }
        }
        Ok(report)
    }
}

/// Runs the transformer for one file under a worker permit.
#[derive(Clone)]
struct Worker {
    transformer: Arc<dyn Transformer>,
    semaphore: Arc<Semaphore>,
    stats: Arc<PoolStats>,
    cancel: CancellationToken,
}

impl Worker {
    async fn process(&self, file: MediaFile) -> Result<PathBuf, ProcessingError> {
        let path = file.path.clone();
        let kind = file.kind;

        self.stats.queued.fetch_add(1, Ordering::Relaxed);
        let permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            permit = Arc::clone(&self.semaphore).acquire_owned() => Some(permit),
        };
        self.stats.queued.fetch_sub(1, Ordering::Relaxed);

        let permit = match permit {
            None => {
                metrics::FILES_PROCESSED
                    .with_label_values(&["cancelled"])
                    .inc();
                return Err(ProcessingError::Cancelled { path });
            }
            Some(Err(_)) => {
                self.stats.total_failed.fetch_add(1, Ordering::Relaxed);
                return Err(ProcessingError::Worker {
                    path,
                    reason: "worker pool closed".to_string(),
                });
            }
            Some(Ok(permit)) => permit,
        };

        self.stats.active.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();
        let transformer = Arc::clone(&self.transformer);

        // The permit moves into the blocking closure so the bound holds for as
        // long as the transformer actually runs.
        let joined = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            transformer.transform(&file)
        })
        .await;

        self.stats.active.fetch_sub(1, Ordering::Relaxed);
        metrics::TRANSFORM_DURATION
            .with_label_values(&[kind.as_str()])
            .observe(start.elapsed().as_secs_f64());

        match joined {
            Ok(Ok(output)) => {
                self.stats.total_processed.fetch_add(1, Ordering::Relaxed);
                metrics::FILES_PROCESSED.with_label_values(&["success"]).inc();
                debug!(path = %path.display(), output = %output.display(), "File processed");
                Ok(output)
            }
            Ok(Err(source)) => {
                self.stats.total_failed.fetch_add(1, Ordering::Relaxed);
                metrics::FILES_PROCESSED.with_label_values(&["failed"]).inc();
                warn!(path = %path.display(), error = %source, "File processing failed");
                Err(ProcessingError::File { path, source })
            }
            Err(join_error) => {
                self.stats.total_failed.fetch_add(1, Ordering::Relaxed);
                metrics::FILES_PROCESSED.with_label_values(&["failed"]).inc();
                error!(path = %path.display(), error = %join_error, "Worker stopped unexpectedly");
                Err(ProcessingError::Worker {
                    path,
                    reason: join_error.to_string(),
                })
            }
        }
    }
}

/// Scans directories for media and processes accepted files concurrently.
///
/// At most `max_workers` transformations run at the same time; the rest wait
/// for a permit. A batch always waits for every dispatched file, a failure
/// never cancels its siblings.
pub struct MediaProcessor {
    classifier: Classifier,
    worker: Worker,
    max_workers: usize,
}

impl MediaProcessor {
    /// Creates a processor backed by the local filesystem and the
    /// passthrough transformer.
    pub fn new(settings: Settings) -> Self {
        let max_workers = settings.max_workers();

        Self {
            classifier: Classifier {
                settings,
                source: Arc::new(FsSource::new()),
                probe: Arc::new(NoDurationProbe),
            },
            worker: Worker {
                transformer: Arc::new(PassthroughTransformer),
                semaphore: Arc::new(Semaphore::new(max_workers)),
                stats: Arc::new(PoolStats::default()),
                cancel: CancellationToken::new(),
            },
            max_workers,
        }
    }

    /// Replaces the directory source.
    pub fn with_source(mut self, source: impl MediaSource + 'static) -> Self {
        self.classifier.source = Arc::new(source);
        self
    }

    /// Replaces the per-file transformer.
    pub fn with_transformer(mut self, transformer: impl Transformer + 'static) -> Self {
        self.worker.transformer = Arc::new(transformer);
        self
    }

    /// Replaces the video duration probe.
    pub fn with_probe(mut self, probe: impl DurationProbe + 'static) -> Self {
        self.classifier.probe = Arc::new(probe);
        self
    }

    /// Uses `token` to cancel files that have not started yet.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.worker.cancel = token;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.classifier.settings
    }

    /// Token that cancels pending work when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.worker.cancel.clone()
    }

    /// Returns the current worker pool status.
    pub fn status(&self) -> PoolStatus {
        self.worker.stats.to_status(self.max_workers)
    }

    /// Classifies one path against the media policy. Never fails.
    pub fn classify(&self, path: &Path) -> Classification {
        self.classifier.classify(path)
    }

    /// Whether `path` exists and is an accepted image, or an accepted video
    /// within the size (and, when known, duration) limits.
    pub fn validate(&self, path: &Path) -> bool {
        self.classify(path).is_accepted()
    }

    /// Recursively lists the accepted media files below `directory`.
    pub async fn scan(&self, directory: &Path) -> Result<Vec<MediaFile>, ProcessingError> {
        Ok(self.scan_report(directory).await?.accepted)
    }

    async fn scan_report(&self, directory: &Path) -> Result<ScanReport, ProcessingError> {
        let classifier = self.classifier.clone();
        let dir = directory.to_path_buf();

        tokio::task::spawn_blocking(move || classifier.scan(&dir))
            .await
            .map_err(|e| ProcessingError::Scan {
                path: directory.to_path_buf(),
                reason: e.to_string(),
            })?
    }

    /// Processes every accepted file below `directory`, all-or-nothing.
    ///
    /// Returns the processed paths in completion order. If any file fails the
    /// whole call fails with [`ProcessingError::Batch`] listing every failure,
    /// and the successful files are not returned. Use
    /// [`Self::process_directory_detailed`] to keep partial successes.
    pub async fn process_directory(
        &self,
        directory: &Path,
    ) -> Result<Vec<PathBuf>, ProcessingError> {
        let batch = self.process_directory_detailed(directory).await?;
        if !batch.is_success() {
            error!(
                batch_id = %batch.batch_id,
                failed = batch.failures.len(),
                total = batch.candidates,
                "Errors while processing directory"
            );
        }
        batch.into_result()
    }

    /// Processes every accepted file below `directory` and reports both
    /// successes and failures.
    ///
    /// Only a failed scan is returned as an error. An empty or fully rejected
    /// directory yields an empty batch without touching the worker pool.
    pub async fn process_directory_detailed(
        &self,
        directory: &Path,
    ) -> Result<BatchResult, ProcessingError> {
        let batch_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();

        info!(batch_id = %batch_id, directory = %directory.display(), "Processing directory");
        metrics::BATCHES_TOTAL.inc();

        let report = self.scan_report(directory).await?;
        let candidates = report.accepted.len();

        if candidates == 0 {
            warn!(
                batch_id = %batch_id,
                directory = %directory.display(),
                rejected = report.rejected,
                "No valid media files found"
            );
            return Ok(BatchResult {
                batch_id,
                directory: directory.to_path_buf(),
                started_at,
                duration_ms: start.elapsed().as_millis() as u64,
                candidates: 0,
                rejected: report.rejected,
                processed: Vec::new(),
                failures: Vec::new(),
            });
        }

        debug!(batch_id = %batch_id, candidates, "Dispatching files to worker pool");

        let mut pending: FuturesUnordered<_> = report
            .accepted
            .into_iter()
            .map(|file| {
                let worker = self.worker.clone();
                let path = file.path.clone();
                let handle = tokio::spawn(async move { worker.process(file).await });
                async move { (path, handle.await) }
            })
            .collect();

        let mut processed = Vec::with_capacity(candidates);
        let mut failures = Vec::new();

        while let Some((path, joined)) = pending.next().await {
            let outcome = joined.unwrap_or_else(|e| {
                Err(ProcessingError::Worker {
                    path: path.clone(),
                    reason: e.to_string(),
                })
            });
            match outcome {
                Ok(output) => processed.push(output),
                Err(error) => failures.push(FileFailure { path, error }),
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            batch_id = %batch_id,
            processed = processed.len(),
            failed = failures.len(),
            rejected = report.rejected,
            duration_ms,
            "Directory processed"
        );

        Ok(BatchResult {
            batch_id,
            directory: directory.to_path_buf(),
            started_at,
            duration_ms,
            candidates,
            rejected: report.rejected,
            processed,
            failures,
        })
    }

    /// Runs the transformer on one accepted file inside the worker pool.
    ///
    /// Failures are wrapped with the file path.
    pub async fn process_file(&self, file: &MediaFile) -> Result<PathBuf, ProcessingError> {
        self.worker.process(file.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;
    use crate::testing::MockDurationProbe;
    use std::time::Duration;
    use tempfile::TempDir;

    fn settings(dir: &Path, max_video_size: u64) -> Settings {
        let mut config = load_config_from_str(&format!(
            r#"
[general]
upload_dir = '{}'
max_workers = 2
"#,
            dir.display()
        ))
        .unwrap();
        config.media.max_video_size = max_video_size;
        Settings::new(config).unwrap()
    }

    fn write(dir: &Path, name: &str, size: usize) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, vec![0u8; size]).unwrap();
        path
    }

    #[test]
    fn test_validate_images_ignore_size() {
        let temp = TempDir::new().unwrap();
        let processor = MediaProcessor::new(settings(temp.path(), 10));
        let big_image = write(temp.path(), "photo.JPG", 1000);
        assert!(processor.validate(&big_image));
    }

    #[test]
    fn test_validate_video_size_limit() {
        let temp = TempDir::new().unwrap();
        let processor = MediaProcessor::new(settings(temp.path(), 10));

        let at_limit = write(temp.path(), "ok.mp4", 10);
        let too_big = write(temp.path(), "big.mov", 11);
        assert!(processor.validate(&at_limit));
        assert!(!processor.validate(&too_big));
        assert!(matches!(
            processor.classify(&too_big),
            Classification::Rejected {
                reason: RejectReason::VideoTooLarge {
                    size_bytes: 11,
                    max_bytes: 10
                },
                ..
            }
        ));
    }

    #[test]
    fn test_validate_rejects_missing_and_unknown() {
        let temp = TempDir::new().unwrap();
        let processor = MediaProcessor::new(settings(temp.path(), 10));

        assert!(!processor.validate(&temp.path().join("ghost.jpg")));
        assert!(!processor.validate(&write(temp.path(), "notes.txt", 1)));
        assert!(!processor.validate(&write(temp.path(), "README", 1)));
        assert!(!processor.validate(temp.path()));
    }

    #[test]
    fn test_validate_duration_limit_with_probe() {
        let temp = TempDir::new().unwrap();
        let clip = write(temp.path(), "clip.mp4", 1);

        let long = MediaProcessor::new(settings(temp.path(), 10))
            .with_probe(MockDurationProbe::new().with_duration(&clip, Duration::from_secs(61)));
        assert!(!long.validate(&clip));

        let short = MediaProcessor::new(settings(temp.path(), 10))
            .with_probe(MockDurationProbe::new().with_duration(&clip, Duration::from_secs(60)));
        match short.classify(&clip) {
            Classification::Accepted(file) => {
                assert_eq!(file.kind, MediaKind::Video);
                assert_eq!(file.duration, Some(Duration::from_secs(60)));
            }
            other => panic!("expected accepted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_scan_missing_directory_fails() {
        let temp = TempDir::new().unwrap();
        let processor = MediaProcessor::new(settings(temp.path(), 10));
        let result = processor.scan(&temp.path().join("nope")).await;
        assert!(matches!(result, Err(ProcessingError::Scan { .. })));
    }

    #[tokio::test]
    async fn test_process_directory_passthrough() {
        let temp = TempDir::new().unwrap();
        let a = write(temp.path(), "a.png", 5);
        let b = write(temp.path(), "b.mp4", 5);
        write(temp.path(), "c.txt", 5);

        let processor = MediaProcessor::new(settings(temp.path(), 10));
        let mut processed = processor.process_directory(temp.path()).await.unwrap();
        processed.sort();
        assert_eq!(processed, vec![a, b]);

        let status = processor.status();
        assert_eq!(status.total_processed, 2);
        assert_eq!(status.active_jobs, 0);
        assert_eq!(status.max_concurrent, 2);
    }

    #[tokio::test]
    async fn test_process_file_wraps_errors_with_path() {
        let temp = TempDir::new().unwrap();
        let processor = MediaProcessor::new(settings(temp.path(), 10)).with_transformer(
            crate::media::FnTransformer::new("broken", |_: &MediaFile| {
                Err(crate::media::TransformError::failed("boom"))
            }),
        );
        let file = MediaFile {
            path: temp.path().join("x.jpg"),
            kind: MediaKind::Image,
            size_bytes: 1,
            duration: None,
        };

        let err = processor.process_file(&file).await.unwrap_err();
        assert_eq!(err.path(), file.path.as_path());
        assert!(err.to_string().contains("boom"));
        assert_eq!(processor.status().total_failed, 1);
    }
}
