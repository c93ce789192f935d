//! In-memory media source and duration probe for testing.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::media::{DurationProbe, FileMetadata, MediaSource};

/// Virtual filesystem implementing the MediaSource trait.
///
/// Files are listed in path order. A directory exists when it was added
/// explicitly or when any file lives below it.
///
/// # Example
///
/// ```rust,ignore
/// use mediadrop_core::testing::MockSource;
///
/// let source = MockSource::new("/uploads")
///     .with_file("/uploads/a.jpg", 1024)
///     .with_file("/uploads/clips/b.mp4", 50 * 1024 * 1024);
///
/// let processor = MediaProcessor::new(settings).with_source(source.clone());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockSource {
    files: Arc<RwLock<BTreeMap<PathBuf, u64>>>,
    dirs: Arc<RwLock<BTreeSet<PathBuf>>>,
}

impl MockSource {
    /// Create a source containing the empty directory `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::default().with_dir(root)
    }

    pub fn with_dir(self, dir: impl Into<PathBuf>) -> Self {
        if let Ok(mut dirs) = self.dirs.write() {
            dirs.insert(dir.into());
        }
        self
    }

    pub fn with_file(self, path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        self.add_file(path, size_bytes);
        self
    }

    /// Add or replace a file.
    pub fn add_file(&self, path: impl Into<PathBuf>, size_bytes: u64) {
        if let Ok(mut files) = self.files.write() {
            files.insert(path.into(), size_bytes);
        }
    }

    /// Remove a file, as if it was deleted after listing.
    pub fn remove_file(&self, path: &Path) {
        if let Ok(mut files) = self.files.write() {
            files.remove(path);
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        let explicit = self.dirs.read().map(|d| d.contains(path)).unwrap_or(false);
        explicit
            || self
                .files
                .read()
                .map(|f| f.keys().any(|p| p != path && p.starts_with(path)))
                .unwrap_or(false)
    }
}

impl MediaSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.is_dir(dir) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {}", dir.display()),
            ));
        }

        let files = self
            .files
            .read()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "mock source lock poisoned"))?;
        Ok(files
            .keys()
            .filter(|p| p.starts_with(dir))
            .cloned()
            .collect())
    }

    fn metadata(&self, path: &Path) -> Option<FileMetadata> {
        if let Some(size) = self.files.read().ok()?.get(path) {
            return Some(FileMetadata {
                is_file: true,
                size_bytes: *size,
            });
        }
        self.is_dir(path).then_some(FileMetadata {
            is_file: false,
            size_bytes: 0,
        })
    }
}

/// Duration probe answering from a fixed table.
#[derive(Debug, Clone, Default)]
pub struct MockDurationProbe {
    durations: Arc<RwLock<HashMap<PathBuf, Duration>>>,
}

impl MockDurationProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(self, path: impl Into<PathBuf>, duration: Duration) -> Self {
        if let Ok(mut durations) = self.durations.write() {
            durations.insert(path.into(), duration);
        }
        self
    }
}

impl DurationProbe for MockDurationProbe {
    fn video_duration(&self, path: &Path) -> Option<Duration> {
        self.durations.read().ok()?.get(path).copied()
    }
}
