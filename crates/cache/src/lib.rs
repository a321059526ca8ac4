//! On-disk caches that let a run skip work done by a previous run.
//!
//! This crate provides the two caches kept under the library's cache
//! directory. Neither is the source of truth: deleting the cache directory
//! only costs the next run some re-encoding.
//!
//! # Architecture
//! - **[`CacheStore`]**: maps the digest of a track's metadata record (the
//!   cache key) to the digest of the output file it produced. Loaded once,
//!   mutated in memory, persisted once at the end of a run.
//! - **[`TranscodeCache`]**: a content-addressed directory of untagged encoded
//!   audio, keyed by the digest of the source recording. Identical recordings
//!   are only ever encoded once, whatever album or tags they end up under.
//!   Entries are never evicted.

pub mod error;
mod store;
mod transcode;

pub use crate::store::CacheStore;
pub use crate::transcode::{ARTIFACT_EXTENSION, Artifact, TranscodeCache};
pub use platter_digest::Digest;
