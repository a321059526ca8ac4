use crate::ExpectedOutputs;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Deletes every entry of `out_dir` whose name isn't in `expected`, returning
/// the removed paths in name order.
///
/// Directories are removed recursively, with a warning: nothing the pipeline
/// writes is a directory. A missing `out_dir` has nothing to reconcile.
#[instrument(skip_all, fields(dir = %out_dir.display()))]
pub fn reconcile(out_dir: &Path, expected: &ExpectedOutputs) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(out_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).or_raise(|| ErrorKind::Io(out_dir.to_path_buf())),
    };
    let mut removed = Vec::new();
    for entry in entries {
        let entry = entry.or_raise(|| ErrorKind::Io(out_dir.to_path_buf()))?;
        if entry.file_name().to_str().is_some_and(|name| expected.contains(name)) {
            continue;
        }
        let path = entry.path();
        let file_type = entry.file_type().or_raise(|| ErrorKind::Io(path.clone()))?;
        if file_type.is_dir() {
            tracing::warn!(path = %path.display(), "Removing unexpected directory from output");
            fs::remove_dir_all(&path).or_raise(|| ErrorKind::Io(path.clone()))?;
        } else {
            fs::remove_file(&path).or_raise(|| ErrorKind::Io(path.clone()))?;
        }
        tracing::info!(path = %path.display(), "Removed stale output");
        removed.push(path);
    }
    removed.sort();
    Ok(removed)
}
