//! A lazily loaded, process-wide cache for the wwPDB chemical component
//! dictionary.
//!
//! The dictionary file (`components.cif.gz`) is downloaded once, persisted in
//! a local file cache and parsed into memory. Any number of concurrent
//! lookups share the single loaded dictionary; the first use triggers the
//! load pipeline and everyone else waits for it. See
//! [`DictionaryCache`](caching::DictionaryCache) for the entry point.

pub mod caching;
pub mod config;
pub mod download;
pub mod loader;
pub mod logging;
pub mod parser;
pub mod types;
