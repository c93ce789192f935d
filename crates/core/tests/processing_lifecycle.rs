//! Media processing lifecycle integration tests.
//!
//! These tests drive the media processor with a virtual source and a mock
//! transformer:
//! - Worker pool concurrency bound
//! - Batch results (completeness, partial failure, empty directories)
//! - Cancellation of pending files
//! - Settings construction side effects

use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;

use mediadrop_core::{
    media::{Classification, RejectReason},
    testing::{fixtures, MockSource, MockTransformer},
    ConfigError, MediaProcessor, ProcessingError, Settings,
};

const MB: u64 = 1024 * 1024;

/// Test helper wiring a processor to a virtual upload directory.
struct TestHarness {
    processor: MediaProcessor,
    source: MockSource,
    transformer: MockTransformer,
    upload_dir: TempDir,
}

impl TestHarness {
    fn new(max_workers: usize) -> Self {
        Self::with_transformer(max_workers, MockTransformer::new())
    }

    fn with_transformer(max_workers: usize, transformer: MockTransformer) -> Self {
        let upload_dir = TempDir::new().expect("Failed to create upload dir");
        let settings = fixtures::settings(
            upload_dir.path(),
            &format!("max_workers = {}", max_workers),
        )
        .expect("Failed to build settings");

        let source = MockSource::new(upload_dir.path());
        let processor = MediaProcessor::new(settings)
            .with_source(source.clone())
            .with_transformer(transformer.clone());

        Self {
            processor,
            source,
            transformer,
            upload_dir,
        }
    }

    fn dir(&self) -> &Path {
        self.upload_dir.path()
    }

    fn add(&self, name: &str, size_bytes: u64) -> PathBuf {
        let path = self.dir().join(name);
        self.source.add_file(&path, size_bytes);
        path
    }
}

// =============================================================================
// Worker pool
// =============================================================================

#[tokio::test]
async fn test_concurrency_never_exceeds_max_workers() {
    let transformer = MockTransformer::new().with_delay(Duration::from_millis(30));
    let harness = TestHarness::with_transformer(2, transformer);
    for i in 0..8 {
        harness.add(&format!("photo_{i}.jpg"), 1024);
    }

    let processed = harness
        .processor
        .process_directory(harness.dir())
        .await
        .expect("batch should succeed");

    assert_eq!(processed.len(), 8);
    assert_eq!(harness.transformer.call_count(), 8);
    let peak = harness.transformer.max_concurrency();
    assert!(peak >= 1 && peak <= 2, "peak concurrency was {peak}");

    let status = harness.processor.status();
    assert_eq!(status.max_concurrent, 2);
    assert_eq!(status.active_jobs, 0);
    assert_eq!(status.queued_jobs, 0);
    assert_eq!(status.total_processed, 8);
}

#[tokio::test]
async fn test_results_are_permutation_of_inputs() {
    let harness = TestHarness::new(3);
    let mut expected: Vec<PathBuf> = (0..6)
        .map(|i| harness.add(&format!("nested/{i}/clip.mp4"), 5 * MB))
        .collect();
    harness.add("notes.txt", 10);
    harness.add("huge.mov", 500 * MB);

    let mut processed = harness
        .processor
        .process_directory(harness.dir())
        .await
        .expect("batch should succeed");

    processed.sort();
    expected.sort();
    assert_eq!(processed, expected);
}

// =============================================================================
// Batch failures
// =============================================================================

#[tokio::test]
async fn test_single_failure_fails_whole_batch() {
    let upload = TempDir::new().expect("Failed to create upload dir");
    let bad = upload.path().join("b.png");
    let transformer = MockTransformer::new().fail_on(&bad);

    let settings = fixtures::settings(upload.path(), "").expect("Failed to build settings");
    let source = MockSource::new(upload.path())
        .with_file(upload.path().join("a.jpg"), 1)
        .with_file(&bad, 1)
        .with_file(upload.path().join("c.mp4"), 1);
    let processor = MediaProcessor::new(settings)
        .with_source(source)
        .with_transformer(transformer.clone());

    let err = processor
        .process_directory(upload.path())
        .await
        .expect_err("batch should fail");

    match &err {
        ProcessingError::Batch { total, failures, .. } => {
            assert_eq!(*total, 3);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].path, bad);
            assert!(matches!(failures[0].error, ProcessingError::File { .. }));
        }
        other => panic!("expected batch error, got {other:?}"),
    }
    // Siblings still ran to completion.
    assert_eq!(transformer.call_count(), 3);
}

#[tokio::test]
async fn test_detailed_batch_keeps_partial_successes() {
    let upload = TempDir::new().expect("Failed to create upload dir");
    let bad = upload.path().join("bad.jpg");
    let good = upload.path().join("good.jpg");

    let settings = fixtures::settings(upload.path(), "").expect("Failed to build settings");
    let processor = MediaProcessor::new(settings)
        .with_source(
            MockSource::new(upload.path())
                .with_file(&bad, 1)
                .with_file(&good, 1)
                .with_file(upload.path().join("skip.gif"), 1),
        )
        .with_transformer(MockTransformer::new().fail_on(&bad));

    let batch = processor
        .process_directory_detailed(upload.path())
        .await
        .expect("scan should succeed");

    assert!(!batch.is_success());
    assert_eq!(batch.candidates, 2);
    assert_eq!(batch.rejected, 1);
    assert_eq!(batch.processed, vec![good]);
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(processor.status().total_failed, 1);
}

// =============================================================================
// Empty and missing directories
// =============================================================================

#[tokio::test]
async fn test_empty_directory_does_not_touch_pool() {
    let harness = TestHarness::new(4);

    let processed = harness
        .processor
        .process_directory(harness.dir())
        .await
        .expect("empty batch should succeed");

    assert!(processed.is_empty());
    assert_eq!(harness.transformer.call_count(), 0);
    assert_eq!(harness.processor.status().total_processed, 0);
}

#[tokio::test]
async fn test_only_rejected_files_yields_empty_batch() {
    let harness = TestHarness::new(4);
    harness.add("readme.md", 1);
    harness.add("movie.mp4", 200 * MB);

    let batch = harness
        .processor
        .process_directory_detailed(harness.dir())
        .await
        .expect("scan should succeed");

    assert!(batch.is_success());
    assert_eq!(batch.candidates, 0);
    assert_eq!(batch.rejected, 2);
    assert_eq!(harness.transformer.call_count(), 0);
}

#[tokio::test]
async fn test_missing_directory_is_scan_error() {
    let harness = TestHarness::new(1);
    let err = harness
        .processor
        .process_directory(&harness.dir().join("gone"))
        .await
        .expect_err("scan should fail");
    assert!(matches!(err, ProcessingError::Scan { .. }));
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_file_removed_after_listing_is_rejected() {
    let harness = TestHarness::new(1);
    let path = harness.add("a.jpg", 1);
    assert!(harness.processor.validate(&path));

    harness.source.remove_file(&path);
    assert!(matches!(
        harness.processor.classify(&path),
        Classification::Rejected {
            reason: RejectReason::Missing,
            ..
        }
    ));
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn test_cancelled_batch_skips_pending_files() {
    let harness = TestHarness::new(2);
    harness.add("a.jpg", 1);
    harness.add("b.jpg", 1);

    harness.processor.cancellation_token().cancel();

    let batch = harness
        .processor
        .process_directory_detailed(harness.dir())
        .await
        .expect("scan should succeed");

    assert_eq!(batch.failures.len(), 2);
    assert!(batch.failures.iter().all(|f| f.error.is_cancelled()));
    assert_eq!(harness.transformer.call_count(), 0);
}

// =============================================================================
// Settings
// =============================================================================

#[test]
fn test_zero_workers_is_config_error() {
    let upload = TempDir::new().expect("Failed to create upload dir");
    let err = fixtures::settings(upload.path(), "max_workers = 0")
        .expect_err("zero workers must be rejected");
    assert!(matches!(err, ConfigError::Invalid { .. }));
}

#[test]
fn test_oversized_worker_count_is_config_error() {
    let upload = TempDir::new().expect("Failed to create upload dir");
    let err = fixtures::settings(upload.path(), "max_workers = 9223372036854775807")
        .expect_err("worker count above the limit must be rejected");
    assert!(
        matches!(err, ConfigError::Invalid { ref field, .. } if field == "general.max_workers")
    );

    let settings = fixtures::settings(
        upload.path(),
        &format!("max_workers = {}", mediadrop_core::config::MAX_WORKERS),
    )
    .expect("worker count at the limit is accepted");
    let processor = MediaProcessor::new(settings);
    assert_eq!(
        processor.status().max_concurrent,
        mediadrop_core::config::MAX_WORKERS
    );
}

#[test]
fn test_upload_dir_is_created() {
    let root = TempDir::new().expect("Failed to create temp dir");
    let upload = root.path().join("incoming").join("today");
    assert!(!upload.exists());

    let settings: Settings = fixtures::settings(&upload, "").expect("Failed to build settings");

    assert!(upload.is_dir());
    assert_eq!(settings.upload_dir(), upload.as_path());
}
