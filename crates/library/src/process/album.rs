use crate::error::{ErrorKind, Result};
use crate::process::art::AlbumArt;
use crate::process::track::{Candidate, Outcome, TrackReport, process_track};
use crate::{Album, Context, SkipReason, SourceTrack, Toolchain};
use exn::ResultExt;
use platter_cache::CacheStore;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Output file names an album's sources produce. Everything else in `out/`
/// is stale.
pub type ExpectedOutputs = BTreeSet<String>;

/// The result of processing every source of an album.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumReport {
    pub expected: ExpectedOutputs,
    /// One entry per source directory entry, in file name order.
    pub tracks: Vec<TrackReport>,
}

impl AlbumReport {
    pub fn count(&self, predicate: impl Fn(&Outcome) -> bool) -> usize {
        self.tracks.iter().filter(|track| predicate(&track.outcome)).count()
    }
}

/// Processes every source in the album's `in/` directory, in file name order.
///
/// `out/` is created if needed but never cleaned here: pass the returned
/// [`AlbumReport::expected`] to [`reconcile`](crate::reconcile) for that.
/// Cache entries for rebuilt tracks are added to `store`, which the caller
/// is responsible for persisting.
#[instrument(skip_all, fields(album = %album.name()))]
pub fn process_album(ctx: &Context, tools: Toolchain<'_>, store: &mut CacheStore, album: &Album) -> Result<AlbumReport> {
    let output_dir = album.output_dir();
    fs::create_dir_all(&output_dir).or_raise(|| ErrorKind::Io(output_dir.clone()))?;
    let mut art = AlbumArt::load(album.art_path())?;
    let mut report = AlbumReport::default();
    for path in list_sources(&album.source_dir())? {
        let track = match candidate(&path, &report.expected) {
            Ok(candidate) => process_track(ctx, tools, store, album, &mut art, candidate)?,
            Err(reason) => TrackReport::skipped(lossy_name(&path), reason),
        };
        if let Some(output) = &track.output {
            report.expected.insert(output.clone());
        }
        report.tracks.push(track);
    }
    tracing::info!(
        hits = report.count(|o| matches!(o, Outcome::CacheHit)),
        rebuilt = report.count(|o| matches!(o, Outcome::StaleRebuild | Outcome::FreshRebuild)),
        skipped = report.count(Outcome::is_skipped),
        "Album processed"
    );
    Ok(report)
}

fn list_sources(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = fs::read_dir(dir)
        .or_raise(|| ErrorKind::Io(dir.to_path_buf()))?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .or_raise(|| ErrorKind::Io(dir.to_path_buf()))?;
    paths.sort();
    Ok(paths)
}

fn candidate(path: &Path, expected: &ExpectedOutputs) -> std::result::Result<Candidate, SkipReason> {
    let file_name = path.file_name().and_then(|name| name.to_str()).ok_or(SkipReason::NotUtf8)?;
    let track: SourceTrack = file_name.parse()?;
    if !path.is_file() {
        return Err(SkipReason::NotAFile);
    }
    // "1 Song - A.WAV" and "01 Song - A.WAV" would overwrite each other.
    if expected.contains(&track.output_name()) {
        return Err(SkipReason::DuplicateOutput);
    }
    Ok(Candidate {
        file_name: file_name.to_string(),
        path: path.to_path_buf(),
        track,
    })
}

fn lossy_name(path: &Path) -> String {
    path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default()
}
