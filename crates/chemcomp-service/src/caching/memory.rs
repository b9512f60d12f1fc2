use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::watch;

use crate::loader::DictionaryLoader;
use crate::types::{ChemComp, Dictionary};

/// The states of the load pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// No load was ever kicked off.
    Idle,
    /// The load pipeline is in flight on exactly one task.
    Loading,
    /// Terminal for the process: the pipeline finished, successfully or not.
    Done,
}

/// The process-wide dictionary cache.
///
/// This is a cheaply clonable handle; all clones share the same state. The
/// host application constructs one instance and hands out clones, preserving
/// the "one dictionary per process" semantics without hidden statics.
///
/// The load pipeline is kicked off at most once, either explicitly via
/// [`start`](Self::start) or implicitly by the first [`get`](Self::get).
/// Lookups issued while the pipeline is in flight wait for its completion.
/// A failed pipeline is not retried: the cache then answers every lookup
/// with `None` for the rest of the process lifetime.
#[derive(Debug, Clone)]
pub struct DictionaryCache {
    inner: Arc<CacheInner>,
}

#[derive(Debug)]
struct CacheInner {
    loader: DictionaryLoader,

    /// The loaded dictionary. Written by the load task, read-only afterwards.
    dictionary: OnceLock<Dictionary>,

    /// Broadcasts load-state transitions to waiting lookups.
    state: watch::Sender<LoadState>,

    /// Guards the `Idle` -> `Loading` transition.
    started: AtomicBool,
}

impl DictionaryCache {
    pub fn new(loader: DictionaryLoader) -> Self {
        let (state, _) = watch::channel(LoadState::Idle);

        Self {
            inner: Arc::new(CacheInner {
                loader,
                dictionary: OnceLock::new(),
                state,
                started: AtomicBool::new(false),
            }),
        }
    }

    /// Kicks off the load pipeline on a background task.
    ///
    /// At most one pipeline ever runs, no matter how many handles call this
    /// concurrently; all other calls return immediately. Must be called from
    /// within a tokio runtime.
    pub fn start(&self) {
        if self.inner.started.swap(true, Ordering::Relaxed) {
            return;
        }

        self.inner.state.send_replace(LoadState::Loading);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            match inner.loader.run().await {
                Ok(dictionary) => {
                    // The dictionary must be published before the state flips
                    // to `Done`; the watch channel orders the two writes for
                    // every waiter.
                    let _ = inner.dictionary.set(dictionary);
                }
                Err(err) => {
                    tracing::error!(
                        error = &err as &dyn std::error::Error,
                        "failed to load the chemical component dictionary"
                    );
                }
            }

            inner.state.send_replace(LoadState::Done);
        });
    }

    /// Looks up the record for a component identifier.
    ///
    /// Triggers the load pipeline on first use and waits until it has
    /// reached its terminal state. Returns `None` both for identifiers
    /// absent from the dictionary and when the dictionary could not be
    /// loaded at all; load failures intentionally degrade lookups instead
    /// of surfacing as errors.
    pub async fn get(&self, id: &str) -> Option<ChemComp> {
        self.start();

        let mut subscription = self.inner.state.subscribe();
        // Waiters never observe a state between "loading" and "fully ready".
        subscription
            .wait_for(|state| *state == LoadState::Done)
            .await
            .ok()?;

        self.dictionary().and_then(|dict| dict.get(id)).cloned()
    }

    /// The loaded dictionary, if the pipeline completed successfully.
    pub fn dictionary(&self) -> Option<&Dictionary> {
        self.inner.dictionary.get()
    }

    /// Whether the dictionary finished loading successfully.
    ///
    /// Once this returns `true` it never reverts for the life of the process.
    pub fn is_initialized(&self) -> bool {
        self.inner.dictionary.get().is_some()
    }

    /// The current state of the load pipeline.
    pub fn state(&self) -> LoadState {
        *self.inner.state.borrow()
    }
}
