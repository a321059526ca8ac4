use crate::SkipReason;
use std::path::{Path, PathBuf};

/// Source recordings live here, inside the album directory.
pub const SOURCE_DIR: &str = "in";
/// Tagged outputs are written here; anything else in it is removed.
pub const OUTPUT_DIR: &str = "out";
/// Optional cover art, embedded into every output when present.
pub const ART_FILE: &str = "art.png";

const YEARS: std::ops::RangeInclusive<u16> = 1900..=2200;

/// A directory in the library root whose name starts with a release year,
/// e.g. `2020 Demo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Album {
    name: String,
    year: u16,
    path: PathBuf,
}

impl Album {
    /// Interprets the directory at `path` as an album, based on its name alone.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, SkipReason> {
        let path = path.into();
        let name = path.file_name().and_then(|name| name.to_str()).ok_or(SkipReason::NotUtf8)?.to_string();
        let year = album_year(&name).ok_or(SkipReason::InvalidYear)?;
        Ok(Self { name, year, path })
    }

    /// The directory name, used verbatim as the album tag.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source_dir(&self) -> PathBuf {
        self.path.join(SOURCE_DIR)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.path.join(OUTPUT_DIR)
    }

    pub fn art_path(&self) -> PathBuf {
        self.path.join(ART_FILE)
    }
}

/// Year encoded in the first four characters of an album name, if they are
/// all ASCII digits and fall within the accepted range.
pub fn album_year(name: &str) -> Option<u16> {
    let prefix = name.get(..4)?;
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    prefix.parse().ok().filter(|year| YEARS.contains(year))
}
