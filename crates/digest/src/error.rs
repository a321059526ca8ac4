//! Digest Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A digest error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for digest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file exists but could not be read to the end.
    #[display("I/O error reading: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// Text that was supposed to be a hex digest isn't one.
    #[display("invalid digest: {_0:?}")]
    InvalidDigest(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
