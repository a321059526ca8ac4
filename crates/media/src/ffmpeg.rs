use crate::error::{ErrorKind, Result};
use crate::{Encoder, Tagger, Tags};
use exn::ResultExt;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::instrument;

/// How many trailing lines of ffmpeg's stderr to keep when it fails.
const STDERR_TAIL_LINES: usize = 10;

/// An `ffmpeg` executable, used as both [`Encoder`] and [`Tagger`].
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    path: PathBuf,
    bitrate: String,
}

impl Ffmpeg {
    /// Locates ffmpeg: `executable` if given (a path, or a name to look up in
    /// `PATH`), otherwise `ffmpeg` on `PATH`.
    pub fn new(executable: Option<&Path>, bitrate: impl Into<String>) -> Result<Self> {
        let path = match executable {
            Some(exe) => which::which(exe).or_raise(|| ErrorKind::FfmpegNotFound)?,
            None => Self::discover()?,
        };
        tracing::debug!(ffmpeg = %path.display(), "Using ffmpeg");
        Ok(Self { path, bitrate: bitrate.into() })
    }

    fn discover() -> Result<PathBuf> {
        if let Ok(path) = which::which("ffmpeg") {
            return Ok(path);
        }
        tracing::info!("ffmpeg executable not found in PATH");
        exn::bail!(ErrorKind::FfmpegNotFound);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn execute(&self, args: Vec<OsString>) -> Result<()> {
        tracing::debug!(command = ?args, "Running ffmpeg");
        let output = Command::new(&self.path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .or_raise(|| ErrorKind::Io)?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
        tracing::error!(status = %output.status, stderr = %tail, "ffmpeg failed");
        match output.status.code() {
            Some(code) => exn::bail!(ErrorKind::FfmpegFailed(code)),
            None => exn::bail!(ErrorKind::FfmpegTerminated),
        }
    }
}

impl Encoder for Ffmpeg {
    #[instrument(skip_all, fields(source = %source.display()))]
    fn encode(&self, source: &Path, target: &Path) -> Result<()> {
        self.execute(encode_args(source, target, &self.bitrate))
    }

    fn parameters(&self) -> String {
        format!("aac:{}", self.bitrate)
    }
}

impl Tagger for Ffmpeg {
    #[instrument(skip_all, fields(output = %output.display()))]
    fn tag(&self, input: &Path, tags: &Tags, cover: Option<&Path>, output: &Path) -> Result<()> {
        self.execute(tag_args(input, tags, cover, output))
    }
}

fn base_args() -> Vec<OsString> {
    // Never wait on stdin, and overwrite outputs: callers hand us paths that
    // already exist (temporary files) on purpose.
    vec!["-nostdin".into(), "-y".into()]
}

fn encode_args(source: &Path, target: &Path, bitrate: &str) -> Vec<OsString> {
    let mut args = base_args();
    args.push("-i".into());
    args.push(source.into());
    args.extend(["-c:a", "aac", "-b:a", bitrate].map(OsString::from));
    args.push(target.into());
    args
}

fn tag_args(input: &Path, tags: &Tags, cover: Option<&Path>, output: &Path) -> Vec<OsString> {
    let mut args = base_args();
    args.push("-i".into());
    args.push(input.into());
    if let Some(cover) = cover {
        args.push("-i".into());
        args.push(cover.into());
        args.extend(["-map", "0", "-map", "1", "-c:v", "copy", "-disposition:v", "attached_pic"].map(OsString::from));
    }
    for (name, value) in tags.pairs() {
        args.push("-metadata".into());
        args.push(format!("{name}={value}").into());
    }
    args.extend(["-c:a", "copy", "-map_metadata", "0"].map(OsString::from));
    args.push(output.into());
    args
}
