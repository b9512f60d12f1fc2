//! # Dictionary caching infrastructure
//!
//! The chemical component dictionary is a large reference dataset that is
//! expensive to obtain: it has to be downloaded from the remote monomer
//! repository and parsed in full before a single lookup can be answered. This
//! module contains the layers that make that affordable:
//!
//! - A file-system layer ([`CacheDir`]) that persists the downloaded file at
//!   a deterministic location. Once present, the file is reused indefinitely;
//!   the remote dataset changes rarely, so there is no freshness check.
//! - An in-memory layer ([`DictionaryCache`]) holding the parsed dictionary,
//!   shared by all handles in the process. It guarantees that the load
//!   pipeline runs at most once per process lifetime and that lookups issued
//!   while the pipeline is in flight wait for it instead of re-triggering it
//!   or observing partial data.
//!
//! ## [`CacheContents`] / [`CacheError`]
//!
//! All pipeline stages report their failures as [`CacheError`]. These errors
//! are absorbed at the load-task boundary: a failed pipeline is logged once
//! and every subsequent lookup degrades to "not found". Callers of the lookup
//! API never see an error and never crash because reference data is missing.

mod cache_error;
mod fs;
mod memory;
#[cfg(test)]
mod tests;

pub use cache_error::{CacheContents, CacheError};
pub use fs::{CACHE_DIR_ENV, CHEM_COMP_CACHE_DIRECTORY, CacheDir, DICTIONARY_FILE_NAME};
pub use memory::{DictionaryCache, LoadState};
