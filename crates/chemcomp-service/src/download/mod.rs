//! Support for fetching the dictionary file from the remote source.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::prelude::*;
use reqwest::{Client, StatusCode, header};
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::caching::{CacheContents, CacheError};
use crate::config::Config;

/// The user agent the service identifies itself with.
pub const USER_AGENT: &str = concat!("chemcomp/", env!("CARGO_PKG_VERSION"));

/// Various timeouts for downloads.
#[derive(Copy, Clone, Debug)]
pub struct DownloadTimeouts {
    /// The timeout for establishing a connection.
    pub connect: Duration,
    /// Global timeout for one download.
    pub max_download: Duration,
}

impl DownloadTimeouts {
    pub fn from_config(config: &Config) -> Self {
        Self {
            connect: config.connect_timeout,
            max_download: config.max_download_timeout,
        }
    }
}

impl Default for DownloadTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            max_download: Duration::from_secs(300),
        }
    }
}

/// A service which can download the dictionary file over HTTP.
///
/// There is no retry, no partial resume and no checksum verification: a
/// failed download is reported once and the load pipeline gives up for this
/// process lifetime.
#[derive(Debug)]
pub struct DownloadService {
    client: Client,
    timeouts: DownloadTimeouts,
}

impl DownloadService {
    pub fn new(config: &Config) -> Arc<Self> {
        let timeouts = DownloadTimeouts::from_config(config);
        let client = Client::builder()
            .connect_timeout(timeouts.connect)
            .build()
            .expect("failed to create reqwest client");

        Arc::new(Self { client, timeouts })
    }

    /// Downloads the file at `url` and stores it at `destination`.
    ///
    /// The destination file is created if it does not exist and truncated if
    /// it does. In case of any error, the file's contents is considered
    /// garbage.
    pub async fn download(&self, url: Url, destination: &Path) -> CacheContents {
        let timeout = self.timeouts.max_download;
        let job = self.stream_file(url.clone(), destination);

        let result = match tokio::time::timeout(timeout, job).await {
            Err(_) => Err(CacheError::Timeout(timeout)),
            Ok(res) => res,
        };

        match &result {
            Ok(()) => tracing::debug!("File `{url}` fetched successfully"),
            Err(err) => tracing::debug!("File `{url}` fetching failed: {err}"),
        }

        result
    }

    async fn stream_file(&self, url: Url, destination: &Path) -> CacheContents {
        tracing::debug!("Fetching dictionary file from `{url}`");

        let request = self
            .client
            .get(url)
            .header(header::USER_AGENT, USER_AGENT)
            .send();

        let response = request.await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CacheError::NotFound);
        }
        if !status.is_success() {
            return Err(CacheError::DownloadError(format!(
                "received {status} from the server"
            )));
        }

        let mut file = tokio::fs::File::create(destination).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;

        Ok(())
    }
}
