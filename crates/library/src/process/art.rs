use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use platter_digest::{Digest, file_digest};
use platter_media::{ImageResizer, TempFile};
use std::path::{Path, PathBuf};

/// An album's cover art: hashed up front (it is part of every cache key),
/// squared only when the first track actually needs rebuilding.
pub(crate) struct AlbumArt {
    path: PathBuf,
    digest: Option<Digest>,
    prepared: Option<TempFile>,
}

impl AlbumArt {
    pub(crate) fn load(path: PathBuf) -> Result<Self> {
        let digest = file_digest(&path).or_raise(|| ErrorKind::Digest)?;
        if digest.is_none() {
            tracing::debug!(path = %path.display(), "No cover art");
        }
        Ok(Self { path, digest, prepared: None })
    }

    pub(crate) fn digest(&self) -> Option<&Digest> {
        self.digest.as_ref()
    }

    /// The square cover to embed, or `None` if the album has no art.
    pub(crate) fn cover(&mut self, resizer: &dyn ImageResizer, length: u32) -> Result<Option<&Path>> {
        if self.digest.is_none() {
            return Ok(None);
        }
        if self.prepared.is_none() {
            let square = resizer.square(&self.path, length).or_raise(|| ErrorKind::Artwork)?;
            self.prepared = Some(square);
        }
        Ok(self.prepared.as_ref().map(TempFile::path))
    }
}
