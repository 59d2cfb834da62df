use cachemid::{
    namespace_prefix, BoxError, Cache, CacheConfig, Discriminator, KeyStore, Loaded, MemoryStore,
    Source,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn counting_cache(store: Arc<MemoryStore>, prefix: &str, calls: Arc<AtomicUsize>) -> Cache {
    Cache::builder()
        .shared_store(store)
        .loader(move |dims: &[&str]| -> Result<Loaded, BoxError> {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Loaded::new(format!("{}@{}", dims.join("/"), n)))
        })
        .config(CacheConfig::new(prefix))
        .build()
        .unwrap()
}

#[test]
fn test_del_forces_reload_of_that_tuple_only() {
    let store = Arc::new(MemoryStore::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = counting_cache(store, "inv", Arc::clone(&calls));

    cache.get(&["a", "1"]).unwrap();
    cache.get(&["a", "2"]).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    cache.del(&["a", "1"]).unwrap();

    let reloaded = cache.get(&["a", "1"]).unwrap();
    assert_eq!(reloaded.source, Source::Loader);
    assert_eq!(reloaded.value, "a/1@3");

    let untouched = cache.get(&["a", "2"]).unwrap();
    assert_eq!(untouched.source, Source::Tier1);
    assert_eq!(untouched.value, "a/2@2");
}

#[test]
fn test_del_of_missing_entry_is_ok() {
    let cache = counting_cache(
        Arc::new(MemoryStore::new()),
        "inv",
        Arc::new(AtomicUsize::new(0)),
    );
    cache.del(&["never", "loaded"]).unwrap();
}

#[test]
fn test_del_keeps_tier2_for_lock_losers() {
    let store = Arc::new(MemoryStore::new());
    let cache = counting_cache(store, "inv", Arc::new(AtomicUsize::new(0)));
    cache.get(&["x"]).unwrap();
    cache.del(&["x"]).unwrap();

    // Another reader is reloading; this one is served the old value.
    let lock = cache.key_for(&["x"], Discriminator::Lock);
    assert!(cache.lock(&lock, Duration::from_secs(10)).unwrap());
    let lookup = cache.get(&["x"]).unwrap();
    assert_eq!(lookup.source, Source::Tier2);
    assert_eq!(lookup.value, "x@1");
}

#[test]
fn test_delete_by_prefix_removes_namespace() {
    let store = Arc::new(MemoryStore::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let users = counting_cache(store.clone(), "users", Arc::clone(&calls));
    let orders = counting_cache(store.clone(), "orders", Arc::clone(&calls));

    users.get(&["1"]).unwrap();
    users.get(&["2"]).unwrap();
    orders.get(&["1"]).unwrap();
    let before = store.len();

    users.delete_by_prefix(&namespace_prefix("users")).unwrap();

    assert!(store.len() < before);
    assert_eq!(users.get(&["1"]).unwrap().source, Source::Loader);
    assert_eq!(users.get(&["2"]).unwrap().source, Source::Loader);
    assert_eq!(orders.get(&["1"]).unwrap().source, Source::Tier1);
}

#[test]
fn test_delete_by_prefix_without_matches_is_ok() {
    let store = Arc::new(MemoryStore::new());
    let cache = counting_cache(store.clone(), "inv", Arc::new(AtomicUsize::new(0)));
    cache.get(&["x"]).unwrap();
    let before = store.len();

    cache.delete_by_prefix("nothing-here:").unwrap();

    assert_eq!(store.len(), before);
}

#[test]
fn test_clear_removes_both_tiers() {
    let store = Arc::new(MemoryStore::new());
    let cache = counting_cache(store.clone(), "inv", Arc::new(AtomicUsize::new(0)));
    cache.get(&["x"]).unwrap();

    cache.clear().unwrap();

    assert!(store.is_empty());
    assert_eq!(
        store
            .get(&cache.key_for(&["x"], Discriminator::Tier2))
            .unwrap(),
        None
    );
}

#[test]
fn test_namespaces_cannot_nest() {
    let store = Arc::new(MemoryStore::new());
    let err = Cache::builder()
        .shared_store(store.clone())
        .config(CacheConfig::new("users:eu"))
        .build()
        .unwrap_err();
    assert!(matches!(err, cachemid::Error::Config(_)));

    // A sibling namespace sharing the leading characters survives a clear.
    let calls = Arc::new(AtomicUsize::new(0));
    let users = counting_cache(store.clone(), "users", Arc::clone(&calls));
    let users_eu = counting_cache(store, "users_eu", Arc::clone(&calls));
    users.get(&["1"]).unwrap();
    users_eu.get(&["1"]).unwrap();

    users.clear().unwrap();

    assert_eq!(users_eu.get(&["1"]).unwrap().source, Source::Tier1);
    assert_eq!(users.get(&["1"]).unwrap().source, Source::Loader);
}
