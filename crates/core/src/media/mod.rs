//! Media module for scanning and processing upload candidates.
//!
//! This module provides the `MediaProcessor` which coordinates:
//! - Scanning: recursive enumeration through a [`MediaSource`]
//! - Validation: format, size and duration policy from [`crate::Settings`]
//! - Processing: running a [`Transformer`] on every accepted file
//!
//! The processor uses a semaphore to bound concurrent transformations and
//! offloads each transformation to a blocking worker thread.
//!
//! # Example
//!
//! ```ignore
//! use mediadrop_core::media::MediaProcessor;
//!
//! let processor = MediaProcessor::new(settings.clone());
//!
//! // All-or-nothing
//! let processed = processor.process_directory(settings.upload_dir()).await?;
//!
//! // Or keep partial successes
//! let batch = processor.process_directory_detailed(settings.upload_dir()).await?;
//! for failure in &batch.failures {
//!     eprintln!("{}: {}", failure.path.display(), failure.error);
//! }
//! ```

mod error;
mod processor;
mod source;
mod transform;
mod types;

pub use error::{ProcessingError, TransformError};
pub use processor::MediaProcessor;
pub use source::{DurationProbe, FileMetadata, FsSource, MediaSource, NoDurationProbe};
pub use transform::{FnTransformer, PassthroughTransformer, Transformer};
pub use types::{
    BatchResult, Classification, FileFailure, MediaFile, MediaKind, PoolStatus, RejectReason,
};
