/// Metadata written onto every output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tags {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub composer: String,
    pub year: u16,
    pub track: u32,
}

impl Tags {
    /// Tag names and values, in the order they are written.
    pub fn pairs(&self) -> [(&'static str, String); 6] {
        [
            ("title", self.title.clone()),
            ("artist", self.artist.clone()),
            ("album", self.album.clone()),
            ("composer", self.composer.clone()),
            ("year", self.year.to_string()),
            ("track", self.track.to_string()),
        ]
    }
}
