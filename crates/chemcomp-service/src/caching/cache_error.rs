use std::time::Duration;

use thiserror::Error;

/// An error that happens somewhere along the dictionary load pipeline.
///
/// None of these variants are ever surfaced to lookup callers; they are
/// absorbed and logged at the load-task boundary and manifest only as
/// "not found" lookup results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The dictionary file was not found at the remote source.
    #[error("not found")]
    NotFound,
    /// The local cache directory could not be created.
    ///
    /// This is non-fatal; the pipeline continues best-effort and subsequent
    /// file operations surface their own errors.
    #[error("failed to create cache directory: {0}")]
    DirectoryCreation(String),
    /// The dictionary file could not be fetched from the remote source due to
    /// a problem like connection loss, DNS resolution, or a 5xx response.
    ///
    /// The attached string contains the innermost source error message.
    #[error("download failed: {0}")]
    DownloadError(String),
    /// The download exceeded the configured hard timeout.
    #[error("download timed out after {0:?}")]
    Timeout(Duration),
    /// The cached dictionary file was fetched (or reused) successfully, but
    /// could not be parsed into a dictionary.
    #[error("malformed dictionary: {0}")]
    Malformed(String),
    /// An unexpected error in the service itself, e.g. a local I/O failure.
    #[error("internal error")]
    InternalError,
}

impl From<std::io::Error> for CacheError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Self::from_std_error(err)
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(error: reqwest::Error) -> Self {
        Self::download_error(&error)
    }
}

impl CacheError {
    /// Extracts the innermost source message of an error chain into a
    /// [`DownloadError`](Self::DownloadError).
    pub(crate) fn download_error(mut error: &dyn std::error::Error) -> Self {
        while let Some(src) = error.source() {
            error = src;
        }

        Self::DownloadError(error.to_string())
    }

    #[track_caller]
    pub fn from_std_error<E: std::error::Error + 'static>(e: E) -> Self {
        let dynerr: &dyn std::error::Error = &e; // tracing expects a `&dyn Error`
        tracing::error!(error = dynerr);
        Self::InternalError
    }
}

/// The contents of a cache operation, containing either `Ok(T)` or the reason
/// why the value could not be produced.
pub type CacheContents<T = ()> = Result<T, CacheError>;
