use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chemcomp_service::caching::DictionaryCache;
use chemcomp_service::config::Config;
use chemcomp_service::loader::DictionaryLoader;
use chemcomp_service::parser::CifParser;
use chemcomp_test::{self as test, DictionaryServer};

fn test_config(server: &DictionaryServer, cache_dir: &Path) -> Config {
    Config {
        cache_dir: Some(cache_dir.to_owned()),
        server_location: server.source(),
        connect_timeout: Duration::from_secs(1),
        max_download_timeout: Duration::from_secs(10),
        ..Default::default()
    }
}

fn dictionary_cache(config: &Config) -> DictionaryCache {
    DictionaryCache::new(DictionaryLoader::new(config, Arc::new(CifParser)))
}

#[tokio::test(flavor = "multi_thread")]
async fn test_download_and_lookup() {
    test::setup();

    let base = test::tempdir();
    let server = DictionaryServer::serving(test::components_fixture()).await;
    let config = test_config(&server, base.path());

    let cache = dictionary_cache(&config);

    let ala = cache.get("ALA").await.unwrap();
    assert_eq!(ala.name, "ALANINE");
    assert_eq!(ala.formula, "C3 H7 N O2");

    // the cache directory was created and the file persisted
    assert!(base.path().join("chemcomp/components.cif.gz").is_file());
    assert_eq!(server.accesses(), 1);

    assert_eq!(cache.get("XYZ").await, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_at_most_one_download() {
    test::setup();

    let base = test::tempdir();
    let server = DictionaryServer::serving(test::components_fixture()).await;
    let config = test_config(&server, base.path());

    let cache = dictionary_cache(&config);

    let lookups: Vec<_> = (0..32)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get("GLY").await })
        })
        .collect();

    for lookup in lookups {
        let record = lookup.await.unwrap().unwrap();
        assert_eq!(record.name, "GLYCINE");
    }

    assert_eq!(server.accesses(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_idempotent_cache_reuse() {
    test::setup();

    let base = test::tempdir();
    let server = DictionaryServer::serving(test::components_fixture()).await;
    let config = test_config(&server, base.path());

    let cache = dictionary_cache(&config);
    assert!(cache.get("ALA").await.is_some());
    assert_eq!(server.accesses(), 1);

    // a second pipeline over the same cache directory reuses the file
    let cache = dictionary_cache(&config);
    assert!(cache.get("ALA").await.is_some());
    assert_eq!(server.accesses(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_seeded_cache_makes_no_requests() {
    test::setup();

    let base = test::tempdir();
    let server = DictionaryServer::serving(test::components_fixture()).await;
    let config = test_config(&server, base.path());

    let cache_dir = base.path().join("chemcomp");
    std::fs::create_dir_all(&cache_dir).unwrap();
    std::fs::write(
        cache_dir.join("components.cif.gz"),
        test::components_fixture(),
    )
    .unwrap();

    let cache = dictionary_cache(&config);
    assert!(cache.get("GLY").await.is_some());
    assert_eq!(server.accesses(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fail_open_on_server_error() {
    test::setup();

    let base = test::tempdir();
    let server = DictionaryServer::failing(500).await;
    let config = test_config(&server, base.path());

    let cache = dictionary_cache(&config);

    // lookups terminate with `None`, they neither raise nor hang
    let lookup = tokio::time::timeout(Duration::from_secs(30), cache.get("ALA"));
    assert_eq!(lookup.await.unwrap(), None);

    let lookup = tokio::time::timeout(Duration::from_secs(30), cache.get("GLY"));
    assert_eq!(lookup.await.unwrap(), None);

    // the failed download was attempted exactly once
    assert_eq!(server.accesses(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fail_open_on_missing_file() {
    test::setup();

    let base = test::tempdir();
    let server = DictionaryServer::failing(404).await;
    let config = test_config(&server, base.path());

    let cache = dictionary_cache(&config);
    assert_eq!(cache.get("ALA").await, None);

    // no partial or empty file must be left behind
    assert!(!base.path().join("chemcomp/components.cif.gz").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_slow_download_blocks_lookups() {
    test::setup();

    let delay = Duration::from_millis(300);

    let base = test::tempdir();
    let server = DictionaryServer::with_delay(test::components_fixture(), delay).await;
    let config = test_config(&server, base.path());

    let cache = dictionary_cache(&config);

    let start = Instant::now();
    let record = cache.get("ALA").await.unwrap();

    assert!(start.elapsed() >= delay);
    assert_eq!(record.comp_type, "L-PEPTIDE LINKING");
}
