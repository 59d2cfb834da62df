use cachemid::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Example demonstrating the stale second tier.
///
/// Tier-1 entries expire quickly while tier-2 keeps the last good value. When
/// the source goes down, callers still get an answer they can fall back to.

fn fetch(cache: &Cache, city: &str) {
    match cache.get(&["weather", city]) {
        Ok(lookup) => println!("{:<8} {:?} ({:?})", city, lookup.value, lookup.source),
        Err(err) => match err.stale_value() {
            Some(stale) => println!("{:<8} {:?} (stale, {})", city, stale, err),
            None => println!("{:<8} unavailable: {}", city, err),
        },
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    println!("=== Stale Fallback Example ===\n");

    let source_down = Arc::new(AtomicBool::new(false));
    let down = Arc::clone(&source_down);
    let cache = Cache::builder()
        .store(MemoryStore::new())
        .loader(move |dims: &[&str]| -> Result<Loaded, BoxError> {
            if down.load(Ordering::SeqCst) {
                return Err("weather service unreachable".into());
            }
            Ok(Loaded::new(format!("sunny in {}", dims[1])))
        })
        .config(
            CacheConfig::new("weather")
                .with_expire_time(Duration::from_millis(200))
                .with_cache2_expire_time(Some(Duration::from_secs(3600))),
        )
        .build()
        .expect("cache configuration is valid");

    println!("--- Source healthy ---");
    fetch(&cache, "Girona");
    fetch(&cache, "Girona");

    println!("\n--- Source down, tier-1 expired ---");
    source_down.store(true, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(300));
    fetch(&cache, "Girona");
    fetch(&cache, "Lleida");

    println!("\n--- Source back ---");
    source_down.store(false, Ordering::SeqCst);
    fetch(&cache, "Girona");
    fetch(&cache, "Girona");
}
