//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the processor and
//! notification capability traits, so batches and deliveries can be tested
//! without real files, SMTP servers or the Telegram API.
//!
//! # Example
//!
//! ```rust,ignore
//! use mediadrop_core::testing::{MockChannel, MockSource, MockTransformer};
//!
//! let source = MockSource::new("/uploads").with_file("/uploads/a.jpg", 1024);
//! let transformer = MockTransformer::new().fail_on("/uploads/a.jpg");
//! let channel = MockChannel::new("telegram").fail_first(2);
//!
//! let processor = MediaProcessor::new(settings)
//!     .with_source(source)
//!     .with_transformer(transformer.clone());
//! ```

mod mock_channel;
mod mock_source;
mod mock_transformer;

pub use mock_channel::MockChannel;
pub use mock_source::{MockDurationProbe, MockSource};
pub use mock_transformer::MockTransformer;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::config::{load_config_from_str, ConfigError, Settings};
    use crate::media::{MediaFile, MediaKind};

    /// Settings rooted at `upload_dir` with defaults everywhere else.
    ///
    /// `extra` is appended to the TOML document, so it may add sections or
    /// follow `[general]` keys.
    pub fn settings(upload_dir: &Path, extra: &str) -> Result<Settings, ConfigError> {
        let toml = format!(
            "[general]\nupload_dir = '{}'\n{}",
            upload_dir.display(),
            extra
        );
        Settings::new(load_config_from_str(&toml)?)
    }

    /// An accepted image of `size_bytes`.
    pub fn image(path: impl AsRef<Path>, size_bytes: u64) -> MediaFile {
        MediaFile {
            path: path.as_ref().to_path_buf(),
            kind: MediaKind::Image,
            size_bytes,
            duration: None,
        }
    }

    /// An accepted video of `size_bytes`.
    pub fn video(path: impl AsRef<Path>, size_bytes: u64) -> MediaFile {
        MediaFile {
            path: path.as_ref().to_path_buf(),
            kind: MediaKind::Video,
            size_bytes,
            duration: None,
        }
    }
}
