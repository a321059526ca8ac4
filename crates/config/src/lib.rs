//! Layered configuration for platter.
//!
//! Sources, later ones overriding earlier ones:
//!
//! 1. Built-in defaults ([`Config::default`]).
//! 2. `config.toml` / `config.yaml` in the user's configuration directory.
//! 3. `platter.toml` / `platter.yaml` in the library root.
//! 4. An explicitly given file (TOML or YAML, chosen by extension).
//! 5. `PLATTER_*` environment variables (e.g. `PLATTER_COVER_SIZE=1080`).
//!
//! Every field has a default, so no configuration at all is a valid setup.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::instrument;

const ENV_PREFIX: &str = "PLATTER_";
const FILE_STEM_USER: &str = "config";
const FILE_STEM_LIBRARY: &str = "platter";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Artist tag written onto every track. Part of every cache key, so
    /// changing it rebuilds the whole library.
    pub artist: String,
    /// AAC bitrate handed to the encoder.
    pub bitrate: String,
    /// Edge length, in pixels, of the embedded square cover.
    pub cover_size: u32,
    /// Name of the cache directory inside the library root.
    pub cache_dir: String,
    /// Directory names in the library root that are never albums (on top of
    /// `cache_dir`).
    pub ignore: Vec<String>,
    /// Explicit path to the ffmpeg executable; looked up on `PATH` otherwise.
    pub ffmpeg: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            artist: "Unknown Artist".to_string(),
            bitrate: "320k".to_string(),
            cover_size: 512,
            cache_dir: "__cache__".to_string(),
            ignore: vec![".git".to_string(), "__pycache__".to_string()],
            ffmpeg: None,
        }
    }
}

impl Config {
    /// Loads configuration for the library at `root` from every source.
    pub fn load(root: impl AsRef<Path>, explicit: Option<&Path>) -> Result<Self> {
        let mut loader = ConfigLoader::new(root);
        if let Some(path) = explicit {
            loader = loader.with_file(path);
        }
        loader.load()
    }

    /// Directory names in the library root that must not be treated as albums.
    pub fn reserved(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.cache_dir.as_str()).chain(self.ignore.iter().map(String::as_str))
    }

    fn validate(self) -> Result<Self> {
        if self.cover_size == 0 {
            exn::bail!(ErrorKind::Validation { field: "cover_size", reason: "must be greater than zero" });
        }
        if self.bitrate.trim().is_empty() {
            exn::bail!(ErrorKind::Validation { field: "bitrate", reason: "must not be empty" });
        }
        let mut components = Path::new(&self.cache_dir).components();
        if !matches!((components.next(), components.next()), (Some(Component::Normal(_)), None)) {
            exn::bail!(ErrorKind::Validation { field: "cache_dir", reason: "must be a single directory name" });
        }
        Ok(self)
    }
}

/// Builder over the configuration sources, mostly so tests can leave out the
/// ones they don't control (user directory, environment).
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    root: PathBuf,
    user_dir: Option<PathBuf>,
    explicit: Option<PathBuf>,
    env: bool,
}

impl ConfigLoader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            user_dir: ProjectDirs::from("", "", "platter").map(|dirs| dirs.config_dir().to_path_buf()),
            explicit: None,
            env: true,
        }
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    pub fn with_user_dir(mut self, dir: impl Into<Option<PathBuf>>) -> Self {
        self.user_dir = dir.into();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.env = false;
        self
    }

    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn load(self) -> Result<Config> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(dir) = &self.user_dir {
            figment = merge_stem(figment, dir, FILE_STEM_USER);
        }
        figment = merge_stem(figment, &self.root, FILE_STEM_LIBRARY);
        if let Some(path) = &self.explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.clone()));
            }
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }
        if self.env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX));
        }
        let config: Config = figment.extract().map_err(|e| ErrorKind::Invalid(e.to_string()))?;
        tracing::debug!(?config, "Configuration loaded");
        config.validate()
    }
}

/// Merges `<dir>/<stem>.toml` then `<dir>/<stem>.yaml`; missing files are
/// silently skipped by figment.
fn merge_stem(figment: Figment, dir: &Path, stem: &str) -> Figment {
    figment.merge(Toml::file(dir.join(format!("{stem}.toml")))).merge(Yaml::file(dir.join(format!("{stem}.yaml"))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;

    fn loader(root: &Path) -> ConfigLoader {
        ConfigLoader::new(root).with_user_dir(None).without_env()
    }

    #[test]
    fn test_defaults_without_files() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(loader(dir.path()).load().unwrap(), Config::default());
    }

    #[test]
    fn test_library_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("platter.toml"), "artist = \"Jordan\"\ncover_size = 1080\n").unwrap();
        let config = loader(dir.path()).load().unwrap();
        assert_eq!(config.artist, "Jordan");
        assert_eq!(config.cover_size, 1080);
        assert_eq!(config.bitrate, "320k");
    }

    #[test]
    fn test_layers_in_order() {
        let user = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        fs::write(user.path().join("config.toml"), "artist = \"user\"\nbitrate = \"256k\"\n").unwrap();
        fs::write(root.path().join("platter.yaml"), "artist: library\n").unwrap();
        let explicit = root.path().join("override.toml");
        fs::write(&explicit, "cover_size = 64\n").unwrap();
        let config = loader(root.path()).with_user_dir(user.path().to_path_buf()).with_file(&explicit).load().unwrap();
        assert_eq!(config.artist, "library");
        assert_eq!(config.bitrate, "256k");
        assert_eq!(config.cover_size, 64);
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = loader(dir.path()).with_file(dir.path().join("nope.toml")).load().unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_wrong_type() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("platter.toml"), "cover_size = \"big\"\n").unwrap();
        let err = loader(dir.path()).load().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[rstest]
    #[case("cover_size = 0", "cover_size")]
    #[case("bitrate = \" \"", "bitrate")]
    #[case("cache_dir = \"a/b\"", "cache_dir")]
    #[case("cache_dir = \"..\"", "cache_dir")]
    #[case("cache_dir = \"\"", "cache_dir")]
    fn test_validation(#[case] toml: &str, #[case] expected: &str) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("platter.toml"), toml).unwrap();
        let err = loader(dir.path()).load().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Validation { field, .. } if *field == expected));
    }

    #[test]
    fn test_reserved_includes_cache_dir() {
        let config = Config::default();
        let reserved: Vec<&str> = config.reserved().collect();
        assert_eq!(reserved, ["__cache__", ".git", "__pycache__"]);
    }
}
