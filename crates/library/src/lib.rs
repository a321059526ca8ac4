//! The album pipeline.
//!
//! A library root holds one directory per album (`<year> <name>`), each with
//! an `in/` directory of `.WAV` recordings and an optional `art.png`. A
//! [`run`] turns every recording into a tagged `.m4a` in the album's `out/`
//! directory, doing as little work as the caches allow:
//!
//! - the [`CacheStore`](platter_cache::CacheStore) remembers which output a
//!   given [`TrackMetadata`] produced, so unchanged tracks are left alone;
//! - the [`TranscodeCache`] keeps untagged encodes by source digest, so a
//!   metadata-only change (renamed track, new cover art) never re-encodes.
//!
//! Afterwards `out/` is [`reconcile`]d: anything that no current source
//! produces is removed.

pub mod album;
pub mod error;
mod metadata;
mod process;
mod reconcile;
mod run;
mod skip;
mod track;

pub use crate::album::{Album, album_year};
pub use crate::metadata::TrackMetadata;
pub use crate::process::{AlbumReport, ExpectedOutputs, Outcome, TrackReport, process_album};
pub use crate::reconcile::reconcile;
pub use crate::run::{RunSummary, run};
pub use crate::skip::SkipReason;
pub use crate::track::{SOURCE_SUFFIX, SourceTrack};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use platter_cache::TranscodeCache;
use platter_media::{Encoder, ImageResizer, Tagger};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Name of the cache store file inside the cache directory.
pub const STORE_FILE: &str = "cache.dict";
pub const DEFAULT_ARTIST: &str = "Unknown Artist";
pub const DEFAULT_COVER_SIZE: u32 = 512;

/// The external tools a run shells out to.
#[derive(Clone, Copy)]
pub struct Toolchain<'a> {
    pub encoder: &'a dyn Encoder,
    pub tagger: &'a dyn Tagger,
    pub resizer: &'a dyn ImageResizer,
}

/// Settings shared by every album in a library root.
#[derive(Debug, Clone)]
pub struct Context {
    root: PathBuf,
    cache_dir: String,
    artist: String,
    cover_size: u32,
    reserved: BTreeSet<String>,
    transcodes: TranscodeCache,
}

impl Context {
    /// Opens the library at `root`, creating `<root>/<cache_dir>` if needed.
    ///
    /// `cache_dir` must be a single directory name; it is never treated as
    /// an album.
    pub fn open(root: impl Into<PathBuf>, cache_dir: impl Into<String>) -> Result<Self> {
        let root = root.into();
        let cache_dir = cache_dir.into();
        let transcodes = TranscodeCache::open(root.join(&cache_dir)).or_raise(|| ErrorKind::Cache)?;
        Ok(Self {
            reserved: BTreeSet::from([cache_dir.clone()]),
            root,
            cache_dir,
            artist: DEFAULT_ARTIST.to_string(),
            cover_size: DEFAULT_COVER_SIZE,
            transcodes,
        })
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    pub fn with_cover_size(mut self, cover_size: u32) -> Self {
        self.cover_size = cover_size;
        self
    }

    /// Additional directory names in the root that are never albums.
    pub fn with_ignored<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn cover_size(&self) -> u32 {
        self.cover_size
    }

    pub fn transcodes(&self) -> &TranscodeCache {
        &self.transcodes
    }

    pub fn store_path(&self) -> PathBuf {
        self.root.join(&self.cache_dir).join(STORE_FILE)
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::open(dir.path(), "__cache__").unwrap();
        assert!(dir.path().join("__cache__").is_dir());
        assert_eq!(ctx.store_path(), dir.path().join("__cache__").join("cache.dict"));
        assert_eq!(ctx.artist(), DEFAULT_ARTIST);
    }

    #[test]
    fn test_reserved_names() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::open(dir.path(), "__cache__").unwrap().with_ignored([".git"]);
        assert!(ctx.is_reserved("__cache__"));
        assert!(ctx.is_reserved(".git"));
        assert!(!ctx.is_reserved("2020 Demo"));
    }
}
