//! Cache Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The cache file exists but could not be read.
    #[display("could not read cache: {}", _0.display())]
    Read(#[error(not(source))] PathBuf),
    /// Writing the cache file, or a cache directory entry, failed.
    #[display("could not write cache: {}", _0.display())]
    Write(#[error(not(source))] PathBuf),
    /// The encode operation failed for the given source; no artifact was stored.
    #[display("encoding failed: {}", _0.display())]
    Encode(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Read(_) | Self::Write(_))
    }
}
