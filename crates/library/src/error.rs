//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Everything in here is fatal for a run. Conditions that only exclude a
//! single album or track from processing are not errors; they are reported
//! through [`SkipReason`](crate::SkipReason) and logged.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a failure.
///
/// ### Operational Errors
/// - [`ErrorKind::Io`]
/// - [`ErrorKind::MissingOutput`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Digest`]
/// - [`ErrorKind::Cache`]
/// - [`ErrorKind::Transcode`] - the encoder failed (raised through the transcode cache).
/// - [`ErrorKind::Tag`]
/// - [`ErrorKind::Artwork`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Hashing a source, cover or output file failed.
    #[display("could not compute file digest")]
    Digest,
    /// Loading or persisting the cache store failed.
    #[display("cache store failure")]
    Cache,
    /// No transcoded artifact could be produced for a source.
    #[display("transcoding failed")]
    Transcode,
    /// The tagger failed to produce an output file.
    #[display("tagging failed")]
    Tag,
    /// The album's cover art could not be prepared.
    #[display("cover art preparation failed")]
    Artwork,
    /// A directory listing or file operation failed.
    #[display("I/O error: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// The tagger reported success but left nothing at the output path.
    #[display("output missing after tagging: {}", _0.display())]
    MissingOutput(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
