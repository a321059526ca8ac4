use crate::Digest;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::instrument;

/// Files are folded through the hasher this many bytes at a time, so that
/// multi-gigabyte recordings never have to be held in memory.
const CHUNK_SIZE: usize = 64 * 1024;

/// Digest of a file's contents, or `None` if there is no regular file at
/// `path`.
///
/// "Not there" is a perfectly normal answer for callers (no cover art, output
/// not produced yet, output deleted behind our back), so it is not an error.
/// Anything else that stops the file from being read to the end is.
#[instrument(level = "trace", skip_all, fields(path = %path.as_ref().display()))]
pub fn file_digest(path: impl AsRef<Path>) -> Result<Option<Digest>> {
    let path = path.as_ref();
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).or_raise(|| ErrorKind::Io(path.to_path_buf())),
    };
    // Directories can be opened on Unix, they just can't be read.
    if !file.metadata().or_raise(|| ErrorKind::Io(path.to_path_buf()))?.is_file() {
        return Ok(None);
    }
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0; CHUNK_SIZE];
    loop {
        let bytes = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).or_raise(|| ErrorKind::Io(path.to_path_buf())),
        };
        hasher.update(&buffer[..bytes]);
    }
    Ok(Some(hasher.finalize().into()))
}

/// Digest of an in-memory buffer. Identical to [`file_digest`] of a file
/// holding the same bytes.
#[must_use]
pub fn digest_bytes(bytes: impl AsRef<[u8]>) -> Digest {
    blake3::hash(bytes.as_ref()).into()
}
