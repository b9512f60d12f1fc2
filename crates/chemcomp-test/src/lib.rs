//! Helpers for testing the dictionary service.
//!
//! When writing tests, keep the following points in mind:
//!
//!  - In every test, call [`setup`]. This will set up the logger so that all
//!    console output is captured by the test runner.
//!
//!  - When using [`tempdir`], make sure that the handle to the temp directory
//!    is held for the entire lifetime of the test. When dropped too early,
//!    this might silently leak the temp directory, since the service will
//!    create it again lazily after it has been deleted. To avoid this, assign
//!    it to a variable in the test function (e.g. `let _cache_dir =
//!    test::tempdir()`).
//!
//!  - When using [`DictionaryServer`], make sure that the server is held
//!    until all requests to it have been made. If the server is dropped, the
//!    ports remain open and all connections to it will time out.

use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::fmt;
use url::Url;

pub use tempfile::TempDir;

/// A small dictionary fixture with the `ALA` and `GLY` components.
pub const TWO_COMPONENTS: &str = r#"data_ALA
#
_chem_comp.id                                    ALA
_chem_comp.name                                  ALANINE
_chem_comp.type                                  "L-PEPTIDE LINKING"
_chem_comp.formula                               "C3 H7 N O2"
#
data_GLY
#
_chem_comp.id                                    GLY
_chem_comp.name                                  GLYCINE
_chem_comp.type                                  "PEPTIDE LINKING"
_chem_comp.formula                               "C2 H5 N O2"
#
"#;

/// Setup the test environment.
///
///  - Initializes logs: The logger only captures logs from the
///    `chemcomp-service` crate and mutes all other logs.
pub fn setup() {
    fmt()
        .with_env_filter(EnvFilter::new("chemcomp_service=trace"))
        .with_target(false)
        .pretty()
        .with_test_writer()
        .try_init()
        .ok();
}

/// Creates a temporary directory.
///
/// The directory is deleted when the [`TempDir`] instance is dropped. Use it
/// as a guard to automatically clean up after tests.
pub fn tempdir() -> TempDir {
    TempDir::new().unwrap()
}

/// Gzip-compresses the given bytes, the way the remote source serves the
/// dictionary file.
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// The gzipped [`TWO_COMPONENTS`] fixture.
pub fn components_fixture() -> Vec<u8> {
    gzip(TWO_COMPONENTS.as_bytes())
}

/// A test server that binds to a random port and serves a web app.
///
/// This server requires a `tokio` runtime and is supposed to be run in a
/// `tokio::test`. It automatically stops serving when dropped.
#[derive(Debug)]
pub struct Server {
    pub handle: tokio::task::JoinHandle<()>,
    pub socket: SocketAddr,
}

impl Server {
    pub async fn with_router(router: Router) -> Self {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0))
            .await
            .unwrap();
        let socket = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { handle, socket }
    }

    /// Returns the socket address that this server listens on.
    pub fn addr(&self) -> SocketAddr {
        self.socket
    }

    /// Returns the port that this server listens on.
    pub fn port(&self) -> u16 {
        self.addr().port()
    }

    /// Returns a full URL pointing to the given path.
    pub fn url(&self, path: &str) -> Url {
        let path = path.trim_start_matches('/');
        format!("http://127.0.0.1:{}/{}", self.port(), path)
            .parse()
            .unwrap()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Debug, Clone)]
struct ServerBehavior {
    body: Arc<Vec<u8>>,
    delay: Option<Duration>,
    status: StatusCode,
    hits: Arc<AtomicUsize>,
}

/// A local stand-in for the remote monomer repository.
///
/// It serves a single dictionary file under `/monomers/components.cif.gz`
/// and counts how many download requests it received.
pub struct DictionaryServer {
    server: Server,
    hits: Arc<AtomicUsize>,
}

impl DictionaryServer {
    /// Serves `body` as the dictionary file.
    pub async fn serving(body: Vec<u8>) -> Self {
        Self::with_behavior(body, None, StatusCode::OK).await
    }

    /// Serves `body`, delaying every response by `delay`.
    pub async fn with_delay(body: Vec<u8>, delay: Duration) -> Self {
        Self::with_behavior(body, Some(delay), StatusCode::OK).await
    }

    /// Responds to every request with the given status code.
    pub async fn failing(status: u16) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::with_behavior(Vec::new(), None, status).await
    }

    async fn with_behavior(body: Vec<u8>, delay: Option<Duration>, status: StatusCode) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let behavior = ServerBehavior {
            body: Arc::new(body),
            delay,
            status,
            hits: hits.clone(),
        };

        let router = Router::new()
            .route("/monomers/:file", get(serve_file))
            .with_state(behavior);
        let server = Server::with_router(router).await;

        Self { server, hits }
    }

    /// The base URL to use as the configured server location.
    pub fn source(&self) -> Url {
        self.server.url("monomers/")
    }

    /// The number of download requests this server received.
    pub fn accesses(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn serve_file(
    Path(file): Path<String>,
    State(behavior): State<ServerBehavior>,
) -> (StatusCode, Vec<u8>) {
    behavior.hits.fetch_add(1, Ordering::SeqCst);

    if let Some(delay) = behavior.delay {
        tokio::time::sleep(delay).await;
    }

    if behavior.status != StatusCode::OK {
        return (behavior.status, Vec::new());
    }

    if file == "components.cif.gz" {
        (StatusCode::OK, behavior.body.as_ref().clone())
    } else {
        (StatusCode::NOT_FOUND, Vec::new())
    }
}
