use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use platter_digest::Digest;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::instrument;

const SEPARATOR: char = '=';

/// Persisted mapping from cache key to the digest of the output file that key
/// produced.
///
/// The on-disk format is one `key=value` pair per line, both sides hex
/// digests. Lines are written sorted by key so the file diffs cleanly between
/// runs; line order carries no meaning when loading.
///
/// # Example
///
/// ```
/// use platter_cache::CacheStore;
/// use platter_digest::digest_bytes;
///
/// # let dir = tempfile::tempdir().unwrap();
/// # let path = dir.path().join("cache.dict");
/// let mut store = CacheStore::load(&path).unwrap();
/// assert!(store.is_empty());
/// store.put(digest_bytes("metadata"), digest_bytes("output"));
/// store.persist(&path).unwrap();
/// assert_eq!(CacheStore::load(&path).unwrap(), store);
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStore {
    entries: BTreeMap<Digest, Digest>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the store persisted at `path`. A missing file is an empty store.
    ///
    /// Duplicate keys resolve to the last line in the file. Lines without a
    /// separator, or whose key or value isn't a digest, are skipped with a
    /// warning rather than failing the whole load: the worst a lost entry
    /// costs is one rebuild.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No cache file found; starting with an empty cache");
                return Ok(Self::new());
            },
            Err(e) => return Err(e).or_raise(|| ErrorKind::Read(path.to_path_buf())),
        };
        let store = Self::parse(&content);
        tracing::debug!(entries = store.len(), "Cache loaded");
        Ok(store)
    }

    fn parse(content: &str) -> Self {
        let mut store = Self::new();
        let mut skipped = 0usize;
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(SEPARATOR) else {
                tracing::warn!(line = index + 1, "Skipping cache line without a separator");
                skipped += 1;
                continue;
            };
            match (key.parse::<Digest>(), value.parse::<Digest>()) {
                (Ok(key), Ok(value)) => {
                    store.put(key, value);
                },
                _ => {
                    tracing::warn!(line = index + 1, "Skipping cache line that isn't a pair of digests");
                    skipped += 1;
                },
            }
        }
        if skipped > 0 {
            tracing::warn!(skipped, "Malformed cache lines were ignored; affected tracks will be rebuilt");
        }
        store
    }

    /// Rewrites the whole file at `path` from the in-memory map.
    ///
    /// The content is written to a temporary file beside `path` and renamed
    /// over it, so a crash mid-write leaves the previous cache intact.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), entries = self.len()))]
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).or_raise(|| ErrorKind::Write(path.to_path_buf()))?;
        let mut tmp = NamedTempFile::new_in(parent).or_raise(|| ErrorKind::Write(path.to_path_buf()))?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            for (key, value) in &self.entries {
                writeln!(writer, "{key}{SEPARATOR}{value}").or_raise(|| ErrorKind::Write(path.to_path_buf()))?;
            }
            writer.flush().or_raise(|| ErrorKind::Write(path.to_path_buf()))?;
        }
        tmp.as_file().sync_all().or_raise(|| ErrorKind::Write(path.to_path_buf()))?;
        tmp.persist(path).or_raise(|| ErrorKind::Write(path.to_path_buf()))?;
        tracing::debug!("Cache persisted");
        Ok(())
    }

    /// Output digest recorded for `key`, if any.
    pub fn lookup(&self, key: &Digest) -> Option<&Digest> {
        self.entries.get(key)
    }

    /// Records `digest` for `key`, returning the digest it replaced.
    pub fn put(&mut self, key: Digest, digest: Digest) -> Option<Digest> {
        self.entries.insert(key, digest)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Digest, &Digest)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platter_digest::digest_bytes;
    use rstest::rstest;

    fn key(n: u8) -> Digest {
        digest_bytes([b'k', n])
    }

    fn value(n: u8) -> Digest {
        digest_bytes([b'v', n])
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::load(dir.path().join("cache.dict")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_persist_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.dict");
        let mut store = CacheStore::new();
        for n in 0..10 {
            store.put(key(n), value(n));
        }
        store.persist(&path).unwrap();
        let loaded = CacheStore::load(&path).unwrap();
        assert_eq!(loaded, store);
        assert_eq!(loaded.lookup(&key(3)), Some(&value(3)));
    }

    #[test]
    fn test_persist_overwrites_and_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("__cache__/cache.dict");
        let mut store = CacheStore::new();
        store.put(key(1), value(1));
        store.put(key(2), value(2));
        store.persist(&path).unwrap();
        let mut smaller = CacheStore::new();
        smaller.put(key(1), value(9));
        smaller.persist(&path).unwrap();
        assert_eq!(CacheStore::load(&path).unwrap(), smaller);
    }

    #[test]
    fn test_persisted_lines_are_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.dict");
        let mut store = CacheStore::new();
        for n in (0..5).rev() {
            store.put(key(n), value(n));
        }
        store.persist(&path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        let mut sorted = lines.clone();
        sorted.sort();
        assert_eq!(lines, sorted);
        let (first_key, first_value) = store.iter().next().unwrap();
        assert_eq!(lines[0], format!("{first_key}={first_value}"));
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let content = format!("{}={}\n{}={}\n", key(1), value(1), key(1), value(2));
        let store = CacheStore::parse(&content);
        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup(&key(1)), Some(&value(2)));
    }

    #[rstest]
    #[case::no_separator("not a cache line")]
    #[case::not_digests("title=Song")]
    #[case::empty_value("af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262=")]
    fn test_malformed_lines_are_skipped(#[case] bad: &str) {
        let content = format!("{}={}\n{bad}\n\n{}={}\n", key(1), value(1), key(2), value(2));
        let store = CacheStore::parse(&content);
        assert_eq!(store.len(), 2);
        assert_eq!(store.lookup(&key(2)), Some(&value(2)));
    }

    #[test]
    fn test_put_returns_replaced() {
        let mut store = CacheStore::new();
        assert_eq!(store.put(key(1), value(1)), None);
        assert_eq!(store.put(key(1), value(2)), Some(value(1)));
        assert_eq!(store.lookup(&key(2)), None);
    }
}
