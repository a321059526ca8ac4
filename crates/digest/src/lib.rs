//! Stable content digests.
//!
//! Everything the cache layer compares is a [`Digest`]: the BLAKE3 hash of a
//! file's bytes ([`file_digest`]), of an in-memory buffer ([`digest_bytes`]),
//! or of an ordered list of named metadata fields ([`RecordHasher`]).
//!
//! Digests are carried around as lowercase hex so they can be written to and
//! read back from plain-text cache files without any further encoding.

pub mod error;
mod file;
mod hex;
mod record;

pub use crate::file::{digest_bytes, file_digest};
pub use crate::hex::Digest;
pub use crate::record::RecordHasher;
