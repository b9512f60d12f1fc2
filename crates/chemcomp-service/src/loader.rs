//! The load pipeline: ensure-directory, ensure-file, parse-into-dictionary.

use std::io::{self, BufRead, BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use flate2::read::MultiGzDecoder;
use url::Url;

use crate::caching::{CacheContents, CacheDir, CacheError, DICTIONARY_FILE_NAME};
use crate::config::Config;
use crate::download::DownloadService;
use crate::parser::DictionaryParser;
use crate::types::Dictionary;

/// Orchestrates making the dictionary available locally and parsing it.
///
/// The loader itself is stateless; coordination of concurrent loads happens
/// in [`DictionaryCache`](crate::caching::DictionaryCache).
pub struct DictionaryLoader {
    cache_dir: CacheDir,
    server_location: Url,
    download_svc: Arc<DownloadService>,
    parser: Arc<dyn DictionaryParser>,
}

impl std::fmt::Debug for DictionaryLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DictionaryLoader")
            .field("cache_dir", &self.cache_dir)
            .field("server_location", &self.server_location.as_str())
            .finish()
    }
}

impl DictionaryLoader {
    pub fn new(config: &Config, parser: Arc<dyn DictionaryParser>) -> Self {
        Self {
            cache_dir: CacheDir::from_config(config),
            server_location: config.server_location.clone(),
            download_svc: DownloadService::new(config),
            parser,
        }
    }

    /// Runs the full load pipeline and returns the materialized dictionary.
    pub async fn run(&self) -> CacheContents<Dictionary> {
        let start = Instant::now();

        let path = self.ensure_available().await?;
        let dictionary = self.load(&path).await?;

        tracing::info!(
            components = dictionary.len(),
            elapsed = ?start.elapsed(),
            "loaded chemical component dictionary"
        );

        Ok(dictionary)
    }

    /// Makes sure the dictionary file exists in the local cache and returns
    /// its path.
    ///
    /// If a cached file is already present it is reused as-is and no network
    /// I/O happens. Otherwise the file is downloaded into a sibling temp file
    /// and atomically persisted into place.
    pub async fn ensure_available(&self) -> CacheContents<PathBuf> {
        if let Err(err) = self.cache_dir.ensure() {
            // Non-fatal: subsequent file operations report their own errors.
            tracing::warn!(
                error = &err as &dyn std::error::Error,
                path = %self.cache_dir.path().display(),
                "failed to create cache directory"
            );
        }

        let path = self.cache_dir.dictionary_path();
        if self.cache_dir.is_cached() {
            tracing::debug!(path = %path.display(), "reusing cached dictionary file");
            return Ok(path);
        }

        let url = self
            .server_location
            .join(DICTIONARY_FILE_NAME)
            .map_err(|e| CacheError::DownloadError(e.to_string()))?;

        let temp_file = self.cache_dir.tempfile()?;
        self.download_svc.download(url, temp_file.path()).await?;
        temp_file.persist(&path).map_err(|e| CacheError::from(e.error))?;

        Ok(path)
    }

    /// Parses the cached file into a [`Dictionary`] via the injected parser
    /// collaborator.
    ///
    /// Parsing the full dictionary takes a while, so it runs on a blocking
    /// thread.
    pub async fn load(&self, path: &Path) -> CacheContents<Dictionary> {
        let parser = Arc::clone(&self.parser);
        let path = path.to_owned();

        tokio::task::spawn_blocking(move || {
            let mut reader = open_dictionary_file(&path)?;
            parser.parse(&mut *reader)
        })
        .await
        .map_err(|_| CacheError::InternalError)?
    }
}

/// Opens the cached dictionary file, transparently decompressing gzip.
///
/// The remote source serves the file gzip-compressed, but a locally seeded
/// plain-text file works as well.
fn open_dictionary_file(path: &Path) -> CacheContents<Box<dyn BufRead + Send>> {
    let mut file = std::fs::File::open(path)?;

    let mut magic_bytes = [0u8; 2];
    let is_gzip = match file.read_exact(&mut magic_bytes) {
        // Magic bytes for gzip
        // https://tools.ietf.org/html/rfc1952#section-2.3.1
        Ok(()) => magic_bytes == [0x1f, 0x8b],
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => false,
        Err(e) => return Err(e.into()),
    };
    file.rewind()?;

    if is_gzip {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}
