use cachemid::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Example demonstrating stampede protection.
///
/// Fifty threads ask for the same missing entry at once. Only the thread that
/// wins the recomputation lock queries the "database"; the others are told the
/// data is not there yet instead of piling onto the source.
///
/// Run with `RUST_LOG=cachemid_core=debug` to see the lock traffic.

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== Stampede Protection Example ===\n");

    let queries = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&queries);
    let cache = Arc::new(
        Cache::builder()
            .store(MemoryStore::new())
            .loader(move |dims: &[&str]| -> Result<Loaded, BoxError> {
                counter.fetch_add(1, Ordering::SeqCst);
                println!("Querying database for {:?}", dims);
                thread::sleep(Duration::from_millis(300));
                Ok(Loaded::new(format!("top products of {}", dims[0])))
            })
            .config(
                CacheConfig::new("products")
                    .with_expire_time(Duration::from_secs(5))
                    .with_lock_ttl(Duration::from_secs(2)),
            )
            .build()
            .expect("cache configuration is valid"),
    );

    let barrier = Arc::new(Barrier::new(50));
    let handles: Vec<_> = (0..50)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.get(&["electronics"])
            })
        })
        .collect();

    let (mut served, mut not_yet) = (0, 0);
    for handle in handles {
        match handle.join().unwrap() {
            Ok(_) => served += 1,
            Err(Error::DataNotExist) => not_yet += 1,
            Err(err) => println!("Unexpected error: {}", err),
        }
    }

    println!("\nConcurrent callers:   50");
    println!("Served:               {}", served);
    println!("Told to retry:        {}", not_yet);
    println!("Database queries:     {}", queries.load(Ordering::SeqCst));

    let lookup = cache.get(&["electronics"]).unwrap();
    println!("\nAfter the load: {:?} from {:?}", lookup.value, lookup.source);

    #[cfg(feature = "stats")]
    {
        let stats = cache.stats().snapshot();
        println!("\n📊 Cache Statistics:");
        println!("  Requests:        {}", stats.requests);
        println!("  Tier-1 hits:     {}", stats.tier1_hits);
        println!("  Loads:           {}", stats.loads);
        println!("  Lock contended:  {}", stats.lock_contended);
    }
}
