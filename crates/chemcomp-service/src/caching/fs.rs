use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::config::Config;

use super::{CacheContents, CacheError};

/// The fixed subdirectory inside the base path that holds the cached
/// dictionary file.
pub const CHEM_COMP_CACHE_DIRECTORY: &str = "chemcomp";

/// The conventional name of the dictionary file at the remote source and in
/// the local cache.
pub const DICTIONARY_FILE_NAME: &str = "components.cif.gz";

/// The environment variable consulted for the cache base path when the
/// configuration does not specify one.
pub const CACHE_DIR_ENV: &str = "PDB_DIR";

/// The resolved location of the local dictionary cache.
///
/// The cached file lives at `<base>/chemcomp/components.cif.gz`. There is no
/// freshness check and no TTL: once the file exists it is reused indefinitely,
/// since the remote dataset changes rarely.
#[derive(Debug, Clone)]
pub struct CacheDir {
    dir: PathBuf,
}

impl CacheDir {
    /// Resolves the cache directory from the configuration.
    ///
    /// The base path is taken from [`Config::cache_dir`], falling back to the
    /// `PDB_DIR` environment variable, and finally to the platform temp
    /// directory with a logged warning.
    pub fn from_config(config: &Config) -> Self {
        let base = config
            .cache_dir
            .clone()
            .or_else(|| std::env::var_os(CACHE_DIR_ENV).map(PathBuf::from))
            .unwrap_or_else(|| {
                let tempdir = std::env::temp_dir();
                tracing::warn!(
                    path = %tempdir.display(),
                    "no cache directory configured, falling back to the temp directory"
                );
                tempdir
            });

        Self {
            dir: base.join(CHEM_COMP_CACHE_DIRECTORY),
        }
    }

    /// The resolved cache directory path.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Creates the cache directory if it does not exist yet.
    ///
    /// This is idempotent; an already existing directory is not an error.
    pub fn ensure(&self) -> CacheContents<&Path> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| CacheError::DirectoryCreation(e.to_string()))?;
        Ok(&self.dir)
    }

    /// The deterministic path of the cached dictionary file.
    pub fn dictionary_path(&self) -> PathBuf {
        self.dir.join(DICTIONARY_FILE_NAME)
    }

    /// Whether a cached dictionary file is already present.
    ///
    /// This is a plain existence check; content integrity is not validated,
    /// so a zero-byte or truncated file counts as present.
    pub fn is_cached(&self) -> bool {
        self.dictionary_path().exists()
    }

    /// Creates a temporary file next to the final cache location.
    ///
    /// Downloads are written to a sibling temp file first and then atomically
    /// persisted, so readers never observe a partially written cache file.
    pub fn tempfile(&self) -> io::Result<NamedTempFile> {
        tempfile::Builder::new().prefix("tmp").tempfile_in(&self.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_paths() {
        let base = chemcomp_test::tempdir();

        let config = Config {
            cache_dir: Some(base.path().to_owned()),
            ..Default::default()
        };
        let cache_dir = CacheDir::from_config(&config);

        assert_eq!(cache_dir.path(), base.path().join("chemcomp"));
        assert_eq!(
            cache_dir.dictionary_path(),
            base.path().join("chemcomp").join("components.cif.gz")
        );
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let base = chemcomp_test::tempdir();

        let config = Config {
            cache_dir: Some(base.path().to_owned()),
            ..Default::default()
        };
        let cache_dir = CacheDir::from_config(&config);

        assert!(!cache_dir.is_cached());
        cache_dir.ensure().unwrap();
        cache_dir.ensure().unwrap();
        assert!(cache_dir.path().is_dir());

        std::fs::write(cache_dir.dictionary_path(), b"").unwrap();
        // a zero-byte file still counts as present
        assert!(cache_dir.is_cached());
    }
}
