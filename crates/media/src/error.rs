//! Media Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A media error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("ffmpeg not detected on your system")]
    FfmpegNotFound,
    /// ffmpeg ran and exited with a non-zero exit code.
    #[display("ffmpeg exited with code: {_0}")]
    FfmpegFailed(#[error(not(source))] i32),
    /// ffmpeg didn't exit on its own (killed by a signal, or crashed).
    #[display("ffmpeg was terminated before it finished")]
    FfmpegTerminated,
    /// The cover image could not be opened or decoded.
    #[display("could not decode image: {}", _0.display())]
    ImageDecode(#[error(not(source))] PathBuf),
    /// The image, or the requested size, has no pixels.
    #[display("image has zero width or height")]
    EmptyImage,
    #[display("could not encode image")]
    ImageEncode,
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io | Self::FfmpegTerminated)
    }
}
