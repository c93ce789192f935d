//! Filesystem capabilities consumed by the processor.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;
use walkdir::WalkDir;

/// Metadata the media policy needs about one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    pub is_file: bool,
    pub size_bytes: u64,
}

/// Enumerates candidate files and reports their metadata.
///
/// Implementations may be backed by a real or a virtual filesystem. Calls are
/// synchronous; the processor runs them on blocking threads.
pub trait MediaSource: Send + Sync {
    /// Returns the name of this source implementation.
    fn name(&self) -> &str;

    /// Recursively lists every file below `dir`.
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    /// Returns metadata for `path`, or `None` if it does not exist.
    fn metadata(&self, path: &Path) -> Option<FileMetadata>;
}

/// [`MediaSource`] backed by the local filesystem.
#[derive(Debug, Clone)]
pub struct FsSource {
    follow_links: bool,
}

impl Default for FsSource {
    fn default() -> Self {
        Self { follow_links: true }
    }
}

impl FsSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether symbolic links are followed while walking.
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }
}

impl MediaSource for FsSource {
    fn name(&self) -> &str {
        "fs"
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a directory", dir.display()),
            ));
        }

        let files = WalkDir::new(dir)
            .follow_links(self.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(error = %e, "Skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect();

        Ok(files)
    }

    fn metadata(&self, path: &Path) -> Option<FileMetadata> {
        std::fs::metadata(path).ok().map(|m| FileMetadata {
            is_file: m.is_file(),
            size_bytes: m.len(),
        })
    }
}

/// Reports video durations for the duration limit.
pub trait DurationProbe: Send + Sync {
    /// Returns the duration of the video at `path`, or `None` if unknown.
    fn video_duration(&self, path: &Path) -> Option<Duration>;
}

/// Probe that never knows the duration, so only the size limit applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDurationProbe;

impl DurationProbe for NoDurationProbe {
    fn video_duration(&self, _path: &Path) -> Option<Duration> {
        None
    }
}
