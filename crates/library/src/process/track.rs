use crate::error::{ErrorKind, Result};
use crate::process::art::AlbumArt;
use crate::{Album, Context, SkipReason, SourceTrack, Toolchain, TrackMetadata};
use exn::{OptionExt, ResultExt};
use platter_cache::{ARTIFACT_EXTENSION, CacheStore, TranscodeCache};
use platter_digest::{Digest, file_digest};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// What happened to a single source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The cache key was known and the output on disk is the one it produced:
    /// nothing was touched.
    CacheHit,
    /// An output existed but was not the one the current metadata produces
    /// (or was modified behind our back); it was deleted and rebuilt.
    StaleRebuild,
    /// No output existed; it was built.
    FreshRebuild,
    /// The source was not processed and has no expected output.
    SkippedInvalid(SkipReason),
}

impl Outcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::SkippedInvalid(_))
    }
}

/// The result of processing a single entry of an album's source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackReport {
    /// Source file name (lossily converted if it isn't UTF-8).
    pub source: String,
    /// Output file name, for sources that weren't skipped.
    pub output: Option<String>,
    pub outcome: Outcome,
}

impl TrackReport {
    pub(crate) fn skipped(source: impl Into<String>, reason: SkipReason) -> Self {
        let source = source.into();
        tracing::info!(source = %source, %reason, "Skipping source");
        Self {
            source,
            output: None,
            outcome: Outcome::SkippedInvalid(reason),
        }
    }
}

/// A source whose file name parsed, about to be processed.
pub(crate) struct Candidate {
    pub(crate) file_name: String,
    pub(crate) path: PathBuf,
    pub(crate) track: SourceTrack,
}

/// Brings the output for one source up to date.
///
/// 1. **Cache hit**: the store knows this metadata's key and the file at the
///    output path still has the digest it recorded. Nothing else happens.
/// 2. **Rebuild**: whatever is at the output path is deleted, the untagged
///    encode is fetched from (or added to) the transcode cache, tagged into a
///    temporary file next to the output and renamed into place. The digest of
///    the result is recorded under the key.
#[instrument(skip_all, fields(source = %candidate.file_name))]
pub(crate) fn process_track(
    ctx: &Context,
    tools: Toolchain<'_>,
    store: &mut CacheStore,
    album: &Album,
    art: &mut AlbumArt,
    candidate: Candidate,
) -> Result<TrackReport> {
    let Candidate { file_name, path, track } = candidate;
    let Some(wavhash) = file_digest(&path).or_raise(|| ErrorKind::Digest)? else {
        return Ok(TrackReport::skipped(file_name, SkipReason::Vanished));
    };
    let metadata = TrackMetadata {
        artist: ctx.artist().to_string(),
        album: album.name().to_string(),
        year: album.year(),
        track: track.order,
        arthash: art.digest().cloned(),
        cover_size: ctx.cover_size(),
        wavhash,
        encoding: tools.encoder.parameters(),
        title: track.title.clone(),
        composer: track.composer.clone(),
    };
    let key = metadata.cache_key();
    let output_name = track.output_name();
    let output_dir = album.output_dir();
    let output_path = output_dir.join(&output_name);

    if is_cache_hit(store, &key, &output_path)? {
        tracing::info!(output = %output_name, "Found in cache");
        return Ok(TrackReport {
            source: file_name,
            output: Some(output_name),
            outcome: Outcome::CacheHit,
        });
    }
    let outcome = if remove_existing(&output_path)? {
        tracing::debug!(output = %output_name, "Output is stale; rebuilding");
        Outcome::StaleRebuild
    } else {
        Outcome::FreshRebuild
    };

    tracing::info!(output = %output_name, "Transcoding");
    let address = TranscodeCache::address(&metadata.wavhash, &metadata.encoding);
    let artifact = ctx
        .transcodes()
        .ensure_transcoded(&address, &path, |source: &Path, target: &Path| tools.encoder.encode(source, target))
        .or_raise(|| ErrorKind::Transcode)?;
    let cover = art.cover(tools.resizer, ctx.cover_size())?;
    let partial = tempfile::Builder::new()
        .prefix(".partial-")
        .suffix(&format!(".{ARTIFACT_EXTENSION}"))
        .tempfile_in(&output_dir)
        .or_raise(|| ErrorKind::Io(output_dir.clone()))?
        .into_temp_path();
    tools.tagger.tag(artifact.path(), &metadata.tags(), cover, &partial).or_raise(|| ErrorKind::Tag)?;
    partial.persist(&output_path).or_raise(|| ErrorKind::Io(output_path.clone()))?;

    let digest = file_digest(&output_path)
        .or_raise(|| ErrorKind::Digest)?
        .ok_or_raise(|| ErrorKind::MissingOutput(output_path.clone()))?;
    store.put(key, digest);
    tracing::info!(output = %output_name, "Processed");
    Ok(TrackReport {
        source: file_name,
        output: Some(output_name),
        outcome,
    })
}

/// Whether the store knows `key` and the file at `output` is the one it
/// recorded. Outputs of unknown keys are never hashed.
fn is_cache_hit(store: &CacheStore, key: &Digest, output: &Path) -> Result<bool> {
    let Some(recorded) = store.lookup(key) else {
        return Ok(false);
    };
    let on_disk = file_digest(output).or_raise(|| ErrorKind::Digest)?;
    Ok(on_disk.as_ref() == Some(recorded))
}

/// Deletes whatever is at `path`; returns whether there was anything.
fn remove_existing(path: &Path) -> Result<bool> {
    let removed = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => {
            tracing::warn!(path = %path.display(), "Removing directory in place of an output");
            fs::remove_dir_all(path)
        },
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => Err(e),
    };
    match removed {
        Ok(()) => Ok(true),
        // Gone between the check and the removal.
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e).or_raise(|| ErrorKind::Io(path.to_path_buf())),
    }
}
