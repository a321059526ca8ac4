use crate::SkipReason;
use platter_cache::ARTIFACT_EXTENSION;
use std::str::FromStr;

/// Case-sensitive suffix every source recording must carry.
pub const SOURCE_SUFFIX: &str = ".WAV";

/// A source recording, parsed from a file name of the form
/// `<order> <title> - <composer>.WAV`.
///
/// The title ends at the first ` - `, so composers may contain the separator
/// but titles may not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTrack {
    pub order: u32,
    pub title: String,
    pub composer: String,
}

impl SourceTrack {
    /// File name of the tagged output, e.g. `01 Song - Composer.m4a`.
    pub fn output_name(&self) -> String {
        format!("{:02} {} - {}.{ARTIFACT_EXTENSION}", self.order, self.title, self.composer)
    }
}

impl FromStr for SourceTrack {
    type Err = SkipReason;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let stem = name.strip_suffix(SOURCE_SUFFIX).ok_or(SkipReason::NotWav)?;
        let (order, rest) = stem.split_once(' ').ok_or(SkipReason::InvalidName)?;
        let (title, composer) = rest.split_once(" - ").ok_or(SkipReason::InvalidName)?;
        let order = order.parse().map_err(|_| SkipReason::InvalidName)?;
        Ok(Self {
            order,
            title: title.to_string(),
            composer: composer.to_string(),
        })
    }
}
