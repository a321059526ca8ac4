use crate::error::{ErrorKind, Result};
use exn::{Exn, ResultExt};
use platter_digest::{Digest, RecordHasher};
use std::error::Error as StdError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// File extension of every stored artifact. Encoders infer the container
/// format from it, so temporary files carry it too.
pub const ARTIFACT_EXTENSION: &str = "m4a";
/// Prefix of in-flight encodes; anything carrying it when the cache is opened
/// was left behind by an interrupted run.
const PARTIAL_PREFIX: &str = ".partial-";

/// Where an artifact returned by [`TranscodeCache::ensure_transcoded`] came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// Already present; the encoder was not called.
    Cached(PathBuf),
    /// Freshly encoded during this call.
    Encoded(PathBuf),
}
impl Artifact {
    pub fn path(&self) -> &Path {
        match self {
            Self::Cached(path) | Self::Encoded(path) => path,
        }
    }

    pub fn into_path(self) -> PathBuf {
        match self {
            Self::Cached(path) | Self::Encoded(path) => path,
        }
    }
}

/// Content-addressed store of untagged encoded audio.
///
/// Artifacts live at `<root>/<address>.m4a`, where the [`address`](Self::address)
/// digests the source bytes' digest together with the encoder's parameters.
/// An artifact that exists is therefore always the right one, and changing
/// the bitrate simply misses.
///
/// Nothing here is ever evicted; the directory grows with the number of
/// distinct recordings (and encode settings) ever seen. Two processes sharing
/// the same root can race each other; only one run at a time is supported.
#[derive(Debug, Clone)]
pub struct TranscodeCache {
    root: PathBuf,
}

impl TranscodeCache {
    /// Opens (creating if needed) the cache directory at `root`, removing
    /// partial encodes left behind by an interrupted run.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).or_raise(|| ErrorKind::Write(root.clone()))?;
        let cache = Self { root };
        cache.sweep_partials()?;
        Ok(cache)
    }

    /// Address of the artifact encoded from a source with digest `source`
    /// using an encoder configured with `parameters`.
    pub fn address(source: &Digest, parameters: &str) -> Digest {
        RecordHasher::new().field("source", source).field("parameters", parameters).finish()
    }

    fn sweep_partials(&self) -> Result<()> {
        for entry in fs::read_dir(&self.root).or_raise(|| ErrorKind::Read(self.root.clone()))? {
            let entry = entry.or_raise(|| ErrorKind::Read(self.root.clone()))?;
            if !entry.file_name().to_str().is_some_and(|name| name.starts_with(PARTIAL_PREFIX)) {
                continue;
            }
            let path = entry.path();
            match fs::remove_file(&path) {
                Ok(()) => tracing::warn!(path = %path.display(), "Removed partial encode from an interrupted run"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {},
                Err(e) => return Err(e).or_raise(|| ErrorKind::Write(path.clone())),
            }
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact_path(&self, digest: &Digest) -> PathBuf {
        self.root.join(format!("{digest}.{ARTIFACT_EXTENSION}"))
    }

    pub fn contains(&self, digest: &Digest) -> bool {
        self.artifact_path(digest).is_file()
    }

    /// Returns the artifact at address `digest`, calling `encode` only if
    /// there isn't one yet.
    ///
    /// `encode` receives the source path and a temporary destination inside
    /// the cache directory (already existing and empty, with the artifact
    /// extension). Once it returns successfully the temporary file is renamed
    /// onto the digest-addressed path. If it fails, the temporary file is
    /// removed and nothing is stored.
    #[instrument(skip(self, encode), fields(digest = %digest, source = %source.display()))]
    pub fn ensure_transcoded<F, E>(&self, digest: &Digest, source: &Path, encode: F) -> Result<Artifact>
    where
        F: FnOnce(&Path, &Path) -> std::result::Result<(), Exn<E>>,
        E: StdError + Send + Sync + 'static,
    {
        let target = self.artifact_path(digest);
        if target.is_file() {
            tracing::debug!("Reusing transcoded artifact");
            return Ok(Artifact::Cached(target));
        }
        let partial = tempfile::Builder::new()
            .prefix(PARTIAL_PREFIX)
            .suffix(&format!(".{ARTIFACT_EXTENSION}"))
            .tempfile_in(&self.root)
            .or_raise(|| ErrorKind::Write(self.root.clone()))?
            // Close our handle; the encoder opens the path itself.
            .into_temp_path();
        encode(source, &partial).or_raise(|| ErrorKind::Encode(source.to_path_buf()))?;
        partial.persist(&target).or_raise(|| ErrorKind::Write(target.clone()))?;
        tracing::debug!(artifact = %target.display(), "Stored transcoded artifact");
        Ok(Artifact::Encoded(target))
    }
}
