mod album;
mod art;
mod track;

pub use self::album::{AlbumReport, ExpectedOutputs, process_album};
pub use self::track::{Outcome, TrackReport};
