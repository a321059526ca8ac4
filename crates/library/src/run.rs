use crate::error::{ErrorKind, Result};
use crate::{Album, AlbumReport, Context, Outcome, SkipReason, Toolchain, process_album, reconcile};
use exn::ResultExt;
use platter_cache::CacheStore;
use std::fs;
use std::path::PathBuf;
use tracing::instrument;

/// Totals over a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub albums: usize,
    pub skipped_albums: usize,
    pub cache_hits: usize,
    pub stale_rebuilds: usize,
    pub fresh_rebuilds: usize,
    pub skipped_tracks: usize,
    /// Entries deleted from output directories by reconciliation.
    pub removed: usize,
}

impl RunSummary {
    fn record(&mut self, report: &AlbumReport, removed: usize) {
        self.albums += 1;
        for track in &report.tracks {
            match track.outcome {
                Outcome::CacheHit => self.cache_hits += 1,
                Outcome::StaleRebuild => self.stale_rebuilds += 1,
                Outcome::FreshRebuild => self.fresh_rebuilds += 1,
                Outcome::SkippedInvalid(_) => self.skipped_tracks += 1,
            }
        }
        self.removed += removed;
    }
}

/// Processes and reconciles every album under the context's root, then
/// persists the cache store.
///
/// Albums are visited in directory name order. Any error aborts the run
/// before the store is persisted: outputs written so far stay on disk but
/// their cache entries are lost, so the next run rebuilds them.
#[instrument(skip_all, fields(root = %ctx.root().display()))]
pub fn run(ctx: &Context, tools: Toolchain<'_>) -> Result<RunSummary> {
    let store_path = ctx.store_path();
    let mut store = CacheStore::load(&store_path).or_raise(|| ErrorKind::Cache)?;
    let mut summary = RunSummary::default();
    for path in album_dirs(ctx)? {
        let album = match Album::new(&path) {
            Ok(album) => album,
            Err(reason) => {
                tracing::info!(path = %path.display(), %reason, "Skipping directory");
                summary.skipped_albums += 1;
                continue;
            },
        };
        if !album.source_dir().is_dir() {
            tracing::warn!(album = %album.name(), reason = %SkipReason::MissingSources, "Skipping album");
            summary.skipped_albums += 1;
            continue;
        }
        let report = process_album(ctx, tools, &mut store, &album)?;
        let removed = reconcile(&album.output_dir(), &report.expected)?;
        summary.record(&report, removed.len());
    }
    store.persist(&store_path).or_raise(|| ErrorKind::Cache)?;
    tracing::info!(
        albums = summary.albums,
        skipped_albums = summary.skipped_albums,
        cache_hits = summary.cache_hits,
        rebuilt = summary.stale_rebuilds + summary.fresh_rebuilds,
        skipped_tracks = summary.skipped_tracks,
        removed = summary.removed,
        "Run complete"
    );
    Ok(summary)
}

/// Subdirectories of the root that aren't reserved, sorted by name.
fn album_dirs(ctx: &Context) -> Result<Vec<PathBuf>> {
    let root = ctx.root();
    let mut dirs = Vec::new();
    for entry in fs::read_dir(root).or_raise(|| ErrorKind::Io(root.to_path_buf()))? {
        let entry = entry.or_raise(|| ErrorKind::Io(root.to_path_buf()))?;
        if entry.file_name().to_str().is_some_and(|name| ctx.is_reserved(name)) {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::STORE_FILE;
    use platter_media::{MockEncoder, MockResizer, MockTagger};
    use std::path::Path;
    use tempfile::TempDir;

    const SONG: &str = "01 Song - Composer.WAV";
    const SONG_OUT: &str = "01 Song - Composer.m4a";

    struct Library {
        dir: TempDir,
        artist: String,
        cover_size: u32,
        encoder: MockEncoder,
        tagger: MockTagger,
        resizer: MockResizer,
    }

    impl Library {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
                artist: "Someone".to_string(),
                cover_size: 64,
                encoder: MockEncoder::new(),
                tagger: MockTagger::new(),
                resizer: MockResizer::new(),
            }
        }

        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn ctx(&self) -> Context {
            Context::open(self.root(), "__cache__")
                .unwrap()
                .with_artist(&self.artist)
                .with_cover_size(self.cover_size)
                .with_ignored([".git"])
        }

        fn tools(&self) -> Toolchain<'_> {
            Toolchain {
                encoder: &self.encoder,
                tagger: &self.tagger,
                resizer: &self.resizer,
            }
        }

        fn run(&self) -> RunSummary {
            run(&self.ctx(), self.tools()).unwrap()
        }

        fn source(&self, album: &str, name: &str, bytes: &[u8]) -> PathBuf {
            let dir = self.root().join(album).join("in");
            fs::create_dir_all(&dir).unwrap();
            let path = dir.join(name);
            fs::write(&path, bytes).unwrap();
            path
        }

        fn output(&self, album: &str, name: &str) -> PathBuf {
            self.root().join(album).join("out").join(name)
        }

        fn outputs(&self, album: &str) -> Vec<String> {
            let mut names: Vec<String> = fs::read_dir(self.root().join(album).join("out"))
                .unwrap()
                .map(|entry| entry.unwrap().file_name().into_string().unwrap())
                .collect();
            names.sort();
            names
        }
    }

    #[test]
    fn test_first_run_builds_then_hits() {
        let library = Library::new();
        library.source("2020 Demo", SONG, b"pcm");

        let first = library.run();
        assert_eq!(first.albums, 1);
        assert_eq!(first.fresh_rebuilds, 1);
        assert_eq!(library.outputs("2020 Demo"), [SONG_OUT]);
        let content = fs::read_to_string(library.output("2020 Demo", SONG_OUT)).unwrap();
        assert!(content.starts_with("encoded:pcm\n"));
        assert!(content.contains("\nartist=Someone\n"));
        assert!(content.contains("\nalbum=2020 Demo\n"));
        assert!(content.contains("\nyear=2020\n"));
        assert_eq!(library.tagger.calls()[0].tags.track, 1);

        let second = library.run();
        assert_eq!(second.cache_hits, 1);
        assert_eq!(second.fresh_rebuilds + second.stale_rebuilds, 0);
        assert_eq!(library.encoder.calls().len(), 1);
        assert_eq!(library.tagger.calls().len(), 1);
    }

    #[test]
    fn test_store_is_persisted() {
        let library = Library::new();
        library.source("2020 Demo", SONG, b"pcm");
        library.source("2020 Demo", "02 Other - Composer.WAV", b"more pcm");
        library.run();
        let store = CacheStore::load(library.root().join("__cache__").join(STORE_FILE)).unwrap();
        assert_eq!(store.len(), 2);
        let transcodes = library.ctx();
        assert_eq!(fs::read_dir(transcodes.transcodes().root()).unwrap().count(), 3);
    }

    #[test]
    fn test_deleted_output_is_rebuilt_without_encoding() {
        let library = Library::new();
        library.source("2020 Demo", SONG, b"pcm");
        library.run();
        fs::remove_file(library.output("2020 Demo", SONG_OUT)).unwrap();

        let summary = library.run();
        assert_eq!(summary.fresh_rebuilds, 1);
        assert!(library.output("2020 Demo", SONG_OUT).is_file());
        assert_eq!(library.encoder.calls().len(), 1);
        assert_eq!(library.tagger.calls().len(), 2);
    }

    #[test]
    fn test_modified_output_is_stale() {
        let library = Library::new();
        library.source("2020 Demo", SONG, b"pcm");
        library.run();
        let output = library.output("2020 Demo", SONG_OUT);
        let original = fs::read(&output).unwrap();
        fs::write(&output, b"edited elsewhere").unwrap();

        assert_eq!(library.run().stale_rebuilds, 1);
        assert_eq!(fs::read(&output).unwrap(), original);
    }

    #[test]
    fn test_renamed_source_replaces_output() {
        let library = Library::new();
        let source = library.source("2020 Demo", SONG, b"pcm");
        library.run();
        fs::rename(&source, source.with_file_name("01 Better Title - Composer.WAV")).unwrap();

        let summary = library.run();
        assert_eq!(summary.fresh_rebuilds, 1);
        assert_eq!(summary.removed, 1);
        assert_eq!(library.outputs("2020 Demo"), ["01 Better Title - Composer.m4a"]);
        // Same bytes: the encode is reused, only tagging is redone.
        assert_eq!(library.encoder.calls().len(), 1);
        assert_eq!(library.tagger.calls().len(), 2);
    }

    #[test]
    fn test_same_recording_in_two_albums_encodes_once() {
        let library = Library::new();
        library.source("2020 Demo", SONG, b"pcm");
        library.source("2021 Live", "03 Song - Composer.WAV", b"pcm");

        let summary = library.run();
        assert_eq!(summary.albums, 2);
        assert_eq!(summary.fresh_rebuilds, 2);
        assert_eq!(library.encoder.calls().len(), 1);
        assert_eq!(library.outputs("2021 Live"), ["03 Song - Composer.m4a"]);
    }

    #[test]
    fn test_invalid_album_is_untouched() {
        let library = Library::new();
        library.source("abc1", SONG, b"pcm");
        let out = library.root().join("abc1").join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("leftover.m4a"), b"keep me").unwrap();

        let summary = library.run();
        assert_eq!(summary.albums, 0);
        assert_eq!(summary.skipped_albums, 1);
        assert_eq!(library.outputs("abc1"), ["leftover.m4a"]);
        assert!(library.encoder.calls().is_empty());
    }

    #[test]
    fn test_album_without_sources_is_untouched() {
        let library = Library::new();
        let out = library.root().join("2020 Demo").join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join(SONG_OUT), b"keep me").unwrap();

        let summary = library.run();
        assert_eq!(summary.skipped_albums, 1);
        assert_eq!(library.outputs("2020 Demo"), [SONG_OUT]);
    }

    #[test]
    fn test_invalid_source_name_is_skipped_and_its_output_removed() {
        let library = Library::new();
        library.source("2020 Demo", "Song.WAV", b"pcm");
        library.source("2020 Demo", "cover notes.txt", b"text");
        let out = library.root().join("2020 Demo").join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("Song.m4a"), b"stale").unwrap();

        let summary = library.run();
        assert_eq!(summary.skipped_tracks, 2);
        assert_eq!(summary.removed, 1);
        assert!(library.outputs("2020 Demo").is_empty());
        assert!(library.encoder.calls().is_empty());
    }

    #[test]
    fn test_duplicate_output_name_is_skipped() {
        let library = Library::new();
        library.source("2020 Demo", "01 Song - Composer.WAV", b"first");
        library.source("2020 Demo", "1 Song - Composer.WAV", b"second");

        let summary = library.run();
        assert_eq!(summary.fresh_rebuilds, 1);
        assert_eq!(summary.skipped_tracks, 1);
        let content = fs::read_to_string(library.output("2020 Demo", SONG_OUT)).unwrap();
        assert!(content.starts_with("encoded:first"));
    }

    #[test]
    fn test_cover_art_is_prepared_once_per_album() {
        let library = Library::new();
        library.source("2020 Demo", SONG, b"pcm");
        library.source("2020 Demo", "02 Other - Composer.WAV", b"more pcm");
        fs::write(library.root().join("2020 Demo").join("art.png"), b"png").unwrap();

        library.run();
        assert_eq!(library.resizer.calls(), 1);
        assert!(library.tagger.calls().iter().all(|call| call.cover));
        let content = fs::read_to_string(library.output("2020 Demo", SONG_OUT)).unwrap();
        assert!(content.ends_with("\ncover=square:64:png"));

        // Nothing to rebuild: the cover isn't even prepared.
        library.run();
        assert_eq!(library.resizer.calls(), 1);
    }

    #[test]
    fn test_changed_cover_art_rebuilds_album() {
        let library = Library::new();
        library.source("2020 Demo", SONG, b"pcm");
        library.source("2021 Live", SONG, b"live pcm");
        library.run();
        fs::write(library.root().join("2020 Demo").join("art.png"), b"png").unwrap();

        let summary = library.run();
        assert_eq!(summary.stale_rebuilds, 1);
        assert_eq!(summary.cache_hits, 1);
        assert_eq!(library.encoder.calls().len(), 2);
    }

    #[test]
    fn test_changed_artist_rebuilds_everything() {
        let mut library = Library::new();
        library.source("2020 Demo", SONG, b"pcm");
        library.run();
        library.artist = "Someone Else".to_string();

        assert_eq!(library.run().stale_rebuilds, 1);
        let content = fs::read_to_string(library.output("2020 Demo", SONG_OUT)).unwrap();
        assert!(content.contains("\nartist=Someone Else\n"));
    }

    #[test]
    fn test_changed_cover_size_rebuilds_albums_with_art() {
        let mut library = Library::new();
        library.source("2020 Demo", SONG, b"pcm");
        library.source("2021 Live", SONG, b"live pcm");
        fs::write(library.root().join("2020 Demo").join("art.png"), b"png").unwrap();
        library.run();
        library.cover_size = 1080;

        let summary = library.run();
        assert_eq!(summary.stale_rebuilds, 1);
        assert_eq!(summary.cache_hits, 1);
        let content = fs::read_to_string(library.output("2020 Demo", SONG_OUT)).unwrap();
        assert!(content.ends_with("\ncover=square:1080:png"));
        // Tagging only: the encodes are still valid.
        assert_eq!(library.encoder.calls().len(), 2);
    }

    #[test]
    fn test_changed_encoder_parameters_reencode() {
        let library = Library::new();
        library.source("2020 Demo", SONG, b"pcm");
        library.run();
        library.encoder.set_parameters("aac:256k");

        let summary = library.run();
        assert_eq!(summary.stale_rebuilds, 1);
        assert_eq!(library.encoder.calls().len(), 2);
        // Both encodes are kept, addressed separately.
        let artifacts = fs::read_dir(library.root().join("__cache__"))
            .unwrap()
            .filter(|entry| entry.as_ref().unwrap().path().extension().is_some_and(|ext| ext == "m4a"))
            .count();
        assert_eq!(artifacts, 2);

        assert_eq!(library.run().cache_hits, 1);
        assert_eq!(library.encoder.calls().len(), 2);
    }

    #[test]
    fn test_reserved_directories_are_not_albums() {
        let library = Library::new();
        library.source(".git", SONG, b"pcm");
        library.source("2020 Demo", SONG, b"pcm");
        fs::write(library.root().join("2021 Not A Directory"), b"").unwrap();

        let summary = library.run();
        assert_eq!(summary.albums, 1);
        assert_eq!(summary.skipped_albums, 0);
        assert!(!library.root().join(".git").join("out").exists());
    }

    #[test]
    fn test_encoder_failure_aborts_without_persisting() {
        let library = Library::new();
        library.source("2020 Demo", SONG, b"pcm");
        library.encoder.fail(true);

        let err = run(&library.ctx(), library.tools()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Transcode));
        assert!(!library.root().join("__cache__").join(STORE_FILE).exists());
        assert!(!library.output("2020 Demo", SONG_OUT).exists());
    }

    #[test]
    fn test_tagger_failure_leaves_no_partial_output() {
        let library = Library::new();
        library.source("2020 Demo", SONG, b"pcm");
        library.tagger.fail(true);

        let err = run(&library.ctx(), library.tools()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Tag));
        assert!(library.outputs("2020 Demo").is_empty());
    }
}
