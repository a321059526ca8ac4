use platter_digest::{Digest, RecordHasher};
use platter_media::Tags;

/// Everything that determines the bytes of an output file.
///
/// Two tracks with equal metadata produce identical outputs, which is what
/// lets [`cache_key`](Self::cache_key) stand in for the output itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub composer: String,
    pub year: u16,
    pub track: u32,
    /// Digest of the album's cover art, absent when the album has none.
    pub arthash: Option<Digest>,
    /// Edge length the cover is squared to. Only part of the key when there
    /// is cover art.
    pub cover_size: u32,
    /// Digest of the source recording.
    pub wavhash: Digest,
    /// The encoder's [`parameters`](platter_media::Encoder::parameters).
    pub encoding: String,
}

impl TrackMetadata {
    /// Digest of every field, in a fixed order. Changing the order (or adding
    /// a field) invalidates every existing cache entry.
    pub fn cache_key(&self) -> Digest {
        RecordHasher::new()
            .field("title", &self.title)
            .field("artist", &self.artist)
            .field("album", &self.album)
            .field("composer", &self.composer)
            .field("year", self.year)
            .field("track", self.track)
            .optional("arthash", self.arthash.as_ref())
            .optional("cover_size", self.arthash.as_ref().map(|_| self.cover_size))
            .field("wavhash", &self.wavhash)
            .field("encoding", &self.encoding)
            .finish()
    }

    pub fn tags(&self) -> Tags {
        Tags {
            title: self.title.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
            composer: self.composer.clone(),
            year: self.year,
            track: self.track,
        }
    }
}
