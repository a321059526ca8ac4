//! The expensive, external half of producing a track.
//!
//! Three capabilities are defined as traits so that callers can be tested
//! without any of the real tools installed:
//!
//! - [`Encoder`]: source recording → untagged encoded audio.
//! - [`Tagger`]: encoded audio + [`Tags`] (+ optional cover) → final file.
//! - [`ImageResizer`]: cover image → square cover ready for embedding.
//!
//! [`Ffmpeg`] implements the first two by shelling out to `ffmpeg`;
//! [`JpegSquare`] implements the last with the [`image`] crate. Every call
//! blocks until the work is done.

mod artwork;
pub mod error;
mod ffmpeg;
#[cfg(feature = "mock")]
mod mock;
mod tags;

pub use crate::artwork::{JpegSquare, SquareGeometry, square};
pub use crate::ffmpeg::Ffmpeg;
#[cfg(feature = "mock")]
pub use crate::mock::{MockEncoder, MockResizer, MockTagger, TagCall};
pub use crate::tags::Tags;
use crate::error::Result;
use std::path::Path;

pub type TempFile = tempfile::NamedTempFile;

/// Turns a source recording into untagged encoded audio.
pub trait Encoder {
    /// Encodes `source` into `target`, overwriting whatever is at `target`.
    fn encode(&self, source: &Path, target: &Path) -> Result<()>;

    /// Identifies the settings `encode` runs with. Encodes made with
    /// different parameters must never be mistaken for one another.
    fn parameters(&self) -> String;
}

/// Writes metadata (and optionally an attached cover picture) onto encoded
/// audio, producing the final output file.
pub trait Tagger {
    /// Reads `input`, writes the tagged copy to `output` (overwriting it).
    /// `input` itself is never modified.
    fn tag(&self, input: &Path, tags: &Tags, cover: Option<&Path>, output: &Path) -> Result<()>;
}

/// Prepares cover art for embedding.
pub trait ImageResizer {
    /// Produces a `length`×`length` copy of the image at `source` as a
    /// temporary file that lives as long as the returned handle.
    fn square(&self, source: &Path, length: u32) -> Result<TempFile>;
}
