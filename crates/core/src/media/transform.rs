//! Per-file transformation hook.

use std::path::PathBuf;

use super::error::TransformError;
use super::types::MediaFile;

/// Hook invoked once per accepted file inside the worker pool.
///
/// Runs on a blocking thread, so implementations may do synchronous I/O or
/// CPU-bound work. The returned path is what the batch reports as processed.
pub trait Transformer: Send + Sync {
    /// Returns the name of this transformer implementation.
    fn name(&self) -> &str;

    /// Transforms `file` and returns the path of the result.
    fn transform(&self, file: &MediaFile) -> Result<PathBuf, TransformError>;
}

/// Returns every file unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTransformer;

impl Transformer for PassthroughTransformer {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn transform(&self, file: &MediaFile) -> Result<PathBuf, TransformError> {
        Ok(file.path.clone())
    }
}

/// Adapts a closure into a [`Transformer`].
pub struct FnTransformer<F> {
    name: String,
    func: F,
}

impl<F> FnTransformer<F>
where
    F: Fn(&MediaFile) -> Result<PathBuf, TransformError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Transformer for FnTransformer<F>
where
    F: Fn(&MediaFile) -> Result<PathBuf, TransformError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, file: &MediaFile) -> Result<PathBuf, TransformError> {
        (self.func)(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaKind;

    fn image(path: &str) -> MediaFile {
        MediaFile {
            path: PathBuf::from(path),
            kind: MediaKind::Image,
            size_bytes: 1,
            duration: None,
        }
    }

    #[test]
    fn test_passthrough_returns_input_path() {
        let file = image("/uploads/a.jpg");
        let out = PassthroughTransformer.transform(&file).unwrap();
        assert_eq!(out, file.path);
    }

    #[test]
    fn test_fn_transformer() {
        let transformer = FnTransformer::new("rename", |file: &MediaFile| {
            Ok(file.path.with_extension("webp"))
        });
        assert_eq!(transformer.name(), "rename");
        assert_eq!(
            transformer.transform(&image("/uploads/a.jpg")).unwrap(),
            PathBuf::from("/uploads/a.webp")
        );
    }
}
