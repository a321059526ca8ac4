//! In-memory stand-ins for the external tools, for testing.
//!
//! Each mock records its calls so tests can assert on how much work was
//! done, and writes deterministic bytes derived from its inputs so that
//! digests of the produced files change exactly when the inputs do.

use crate::error::{ErrorKind, Result};
use crate::{Encoder, ImageResizer, Tagger, Tags, TempFile};
use exn::ResultExt;
use std::cell::{Cell, RefCell};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes `encoded:` followed by the source bytes.
#[derive(Debug)]
pub struct MockEncoder {
    calls: RefCell<Vec<PathBuf>>,
    fail: Cell<bool>,
    parameters: RefCell<String>,
}
impl Default for MockEncoder {
    fn default() -> Self {
        Self {
            calls: RefCell::default(),
            fail: Cell::default(),
            parameters: RefCell::new("mock".to_string()),
        }
    }
}
impl MockEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend the encode settings changed (a new bitrate, say).
    pub fn set_parameters(&self, parameters: impl Into<String>) {
        *self.parameters.borrow_mut() = parameters.into();
    }

    /// Make every subsequent call fail like a crashing ffmpeg would.
    pub fn fail(&self, fail: bool) {
        self.fail.set(fail);
    }

    /// Source paths encoded so far, in call order.
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.borrow().clone()
    }
}
impl Encoder for MockEncoder {
    fn encode(&self, source: &Path, target: &Path) -> Result<()> {
        if self.fail.get() {
            exn::bail!(ErrorKind::FfmpegFailed(1));
        }
        self.calls.borrow_mut().push(source.to_path_buf());
        let mut bytes = b"encoded:".to_vec();
        bytes.extend(fs::read(source).or_raise(|| ErrorKind::Io)?);
        fs::write(target, bytes).or_raise(|| ErrorKind::Io)
    }

    fn parameters(&self) -> String {
        self.parameters.borrow().clone()
    }
}

/// A single recorded [`MockTagger`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCall {
    pub input: PathBuf,
    pub tags: Tags,
    pub cover: bool,
    pub output: PathBuf,
}

/// Writes the input bytes, then the tags, then (if any) the cover bytes.
#[derive(Debug, Default)]
pub struct MockTagger {
    calls: RefCell<Vec<TagCall>>,
    fail: Cell<bool>,
}
impl MockTagger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.set(fail);
    }

    pub fn calls(&self) -> Vec<TagCall> {
        self.calls.borrow().clone()
    }
}
impl Tagger for MockTagger {
    fn tag(&self, input: &Path, tags: &Tags, cover: Option<&Path>, output: &Path) -> Result<()> {
        if self.fail.get() {
            exn::bail!(ErrorKind::FfmpegFailed(1));
        }
        self.calls.borrow_mut().push(TagCall {
            input: input.to_path_buf(),
            tags: tags.clone(),
            cover: cover.is_some(),
            output: output.to_path_buf(),
        });
        let mut bytes = fs::read(input).or_raise(|| ErrorKind::Io)?;
        for (name, value) in tags.pairs() {
            bytes.extend(format!("\n{name}={value}").into_bytes());
        }
        if let Some(cover) = cover {
            bytes.extend(b"\ncover=");
            bytes.extend(fs::read(cover).or_raise(|| ErrorKind::Io)?);
        }
        fs::write(output, bytes).or_raise(|| ErrorKind::Io)
    }
}

/// Doesn't decode anything: the "square" is the source bytes prefixed with
/// the requested length.
#[derive(Debug, Default)]
pub struct MockResizer {
    calls: Cell<usize>,
}
impl MockResizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}
impl ImageResizer for MockResizer {
    fn square(&self, source: &Path, length: u32) -> Result<TempFile> {
        self.calls.set(self.calls.get() + 1);
        let mut cover = TempFile::new().or_raise(|| ErrorKind::Io)?;
        write!(cover, "square:{length}:").or_raise(|| ErrorKind::Io)?;
        cover.write_all(&fs::read(source).or_raise(|| ErrorKind::Io)?).or_raise(|| ErrorKind::Io)?;
        Ok(cover)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_pipeline_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.WAV");
        let encoded = dir.path().join("a.m4a");
        let output = dir.path().join("out.m4a");
        fs::write(&source, b"pcm").unwrap();
        let encoder = MockEncoder::new();
        let tagger = MockTagger::new();
        encoder.encode(&source, &encoded).unwrap();
        let tags = Tags {
            title: "A".into(),
            artist: "B".into(),
            album: "C".into(),
            composer: "D".into(),
            year: 2000,
            track: 3,
        };
        tagger.tag(&encoded, &tags, None, &output).unwrap();
        let content = fs::read_to_string(&output).unwrap();
        assert!(content.starts_with("encoded:pcm\ntitle=A"));
        assert_eq!(encoder.calls(), vec![source]);
        assert_eq!(tagger.calls().len(), 1);
    }

    #[test]
    fn test_failing_encoder() {
        let encoder = MockEncoder::new();
        encoder.fail(true);
        let err = encoder.encode(Path::new("a"), Path::new("b")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::FfmpegFailed(1)));
        assert!(encoder.calls().is_empty());
    }

    #[test]
    fn test_encoder_parameters() {
        let encoder = MockEncoder::new();
        assert_eq!(encoder.parameters(), "mock");
        encoder.set_parameters("aac:256k");
        assert_eq!(encoder.parameters(), "aac:256k");
    }
}
