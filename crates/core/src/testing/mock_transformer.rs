//! Mock transformer for testing.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::media::{MediaFile, TransformError, Transformer};

/// Mock implementation of the Transformer trait.
///
/// Provides controllable behavior for testing:
/// - Record which files were transformed
/// - Fail specific paths
/// - Hold each transformation for a fixed time
/// - Track the highest number of concurrent transformations
///
/// Transformations run on blocking threads, so state is kept behind
/// std locks and atomics.
#[derive(Debug, Clone, Default)]
pub struct MockTransformer {
    calls: Arc<Mutex<Vec<PathBuf>>>,
    failing: Arc<Mutex<HashSet<PathBuf>>>,
    delay: Arc<Mutex<Duration>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockTransformer {
    /// Create a new mock transformer that returns every path unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold each transformation for `delay`.
    pub fn with_delay(self, delay: Duration) -> Self {
        if let Ok(mut d) = self.delay.lock() {
            *d = delay;
        }
        self
    }

    /// Fail transformations of `path`.
    pub fn fail_on(self, path: impl Into<PathBuf>) -> Self {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(path.into());
        }
        self
    }

    /// Paths transformed so far, in call order.
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    /// Highest number of transformations observed running at once.
    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn is_failing(&self, path: &Path) -> bool {
        self.failing
            .lock()
            .map(|f| f.contains(path))
            .unwrap_or(false)
    }
}

impl Transformer for MockTransformer {
    fn name(&self) -> &str {
        "mock"
    }

    fn transform(&self, file: &MediaFile) -> Result<PathBuf, TransformError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Ok(mut calls) = self.calls.lock() {
            calls.push(file.path.clone());
        }

        let delay = self.delay.lock().map(|d| *d).unwrap_or_default();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let result = if self.is_failing(&file.path) {
            Err(TransformError::failed(format!(
                "mock failure for {}",
                file.path.display()
            )))
        } else {
            Ok(file.path.clone())
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
