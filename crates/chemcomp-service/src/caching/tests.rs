use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chemcomp_test::TempDir;

use crate::config::Config;
use crate::loader::DictionaryLoader;
use crate::parser::{CifParser, DictionaryParser};
use crate::types::Dictionary;

use super::{CacheContents, CacheError, DictionaryCache, LoadState};

/// A parser wrapper that counts invocations and can be slowed down or made
/// to fail, to observe the coordination behavior of the cache.
struct CountingParser {
    calls: Arc<AtomicUsize>,
    delay: Duration,
    fail: bool,
}

impl DictionaryParser for CountingParser {
    fn parse(&self, reader: &mut dyn BufRead) -> CacheContents<Dictionary> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);

        if self.fail {
            return Err(CacheError::Malformed("induced parse failure".into()));
        }
        CifParser.parse(reader)
    }
}

/// Creates a cache over a pre-seeded local file, so no network I/O happens.
fn seeded_cache(
    delay: Duration,
    fail: bool,
) -> (TempDir, DictionaryCache, Arc<AtomicUsize>) {
    let base = chemcomp_test::tempdir();

    let config = Config {
        cache_dir: Some(base.path().to_owned()),
        // an unreachable source, the tests here must never hit the network
        server_location: "http://127.0.0.1:1/monomers/".parse().unwrap(),
        ..Default::default()
    };

    let cache_dir = base.path().join("chemcomp");
    std::fs::create_dir_all(&cache_dir).unwrap();
    std::fs::write(
        cache_dir.join("components.cif.gz"),
        chemcomp_test::TWO_COMPONENTS,
    )
    .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let parser = Arc::new(CountingParser {
        calls: calls.clone(),
        delay,
        fail,
    });
    let cache = DictionaryCache::new(DictionaryLoader::new(&config, parser));

    (base, cache, calls)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_at_most_one_load() {
    chemcomp_test::setup();

    let (_base, cache, calls) = seeded_cache(Duration::from_millis(50), false);
    assert_eq!(cache.state(), LoadState::Idle);

    let lookups: Vec<_> = (0..100)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get("ALA").await })
        })
        .collect();

    for lookup in lookups {
        let record = lookup.await.unwrap().unwrap();
        assert_eq!(record.name, "ALANINE");
    }

    // 100 concurrent lookups, exactly one pipeline
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.state(), LoadState::Done);
    assert!(cache.is_initialized());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_blocking_until_ready() {
    chemcomp_test::setup();

    let load_time = Duration::from_millis(200);
    let (_base, cache, _calls) = seeded_cache(load_time, false);

    let start = Instant::now();
    let record = cache.get("ALA").await.unwrap();

    // the lookup must not return before the pipeline completed
    assert!(start.elapsed() >= load_time);
    assert_eq!(record.formula, "C3 H7 N O2");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_read_after_ready() {
    chemcomp_test::setup();

    let (_base, cache, _calls) = seeded_cache(Duration::ZERO, false);

    let ala = cache.get("ALA").await.unwrap();
    assert_eq!(ala.id, "ALA");
    assert_eq!(ala.name, "ALANINE");

    let gly = cache.get("GLY").await.unwrap();
    assert_eq!(gly.name, "GLYCINE");

    assert_eq!(cache.get("XYZ").await, None);
    assert_eq!(cache.dictionary().unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fail_open_on_parse_error() {
    chemcomp_test::setup();

    let (_base, cache, calls) = seeded_cache(Duration::ZERO, true);

    // lookups degrade to `None` instead of raising or hanging
    assert_eq!(cache.get("ALA").await, None);
    assert_eq!(cache.get("GLY").await, None);

    // the failed pipeline ran once and is not retried
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.state(), LoadState::Done);
    assert!(!cache.is_initialized());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_explicit_start() {
    chemcomp_test::setup();

    let (_base, cache, calls) = seeded_cache(Duration::ZERO, false);

    cache.start();
    cache.start();

    let record = cache.get("GLY").await.unwrap();
    assert_eq!(record.comp_type, "PEPTIDE LINKING");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
