//! TTL cache with request coalescing.
//!
//! Each key maps either to a pending shared future that every concurrent
//! caller awaits, or to a ready value with an expiry. The first caller for a
//! missing key runs the loader; callers arriving while it is in flight join
//! the same future and observe the identical result. Successful results
//! become ready entries, failures are handed to every waiter and then
//! forgotten.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::metrics::CACHE_LOOKUPS;

type SharedLoad<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

enum Slot<V, E> {
    Pending(SharedLoad<V, E>),
    Ready { value: V, expires_at: Instant },
}

/// How a lookup was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Served from a ready, unexpired entry.
    Hit,
    /// This caller started the load.
    Miss,
    /// This caller joined a load already in flight.
    Coalesced,
}

impl Lookup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lookup::Hit => "hit",
            Lookup::Miss => "miss",
            Lookup::Coalesced => "coalesced",
        }
    }
}

/// Concurrent TTL cache that deduplicates in-flight loads.
pub struct CoalescingCache<K, V, E> {
    name: &'static str,
    ttl: Duration,
    slots: Mutex<HashMap<K, Slot<V, E>>>,
}

impl<K, V, E> CoalescingCache<K, V, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a cache whose entries live for `ttl`. `name` labels metrics.
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key`, or load it with `load`.
    ///
    /// `load` is only invoked when there is neither a fresh value nor a load
    /// in flight for `key`.
    pub async fn get_or_try_load<F, Fut>(&self, key: K, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let (pending, lookup) = {
            let mut slots = self.slots.lock().await;
            match slots.get(&key) {
                Some(Slot::Ready { value, expires_at }) if *expires_at > Instant::now() => {
                    self.record(Lookup::Hit);
                    return Ok(value.clone());
                }
                Some(Slot::Pending(pending)) => (pending.clone(), Lookup::Coalesced),
                _ => {
                    let pending = load().boxed().shared();
                    slots.insert(key.clone(), Slot::Pending(pending.clone()));
                    (pending, Lookup::Miss)
                }
            }
        };
        self.record(lookup);

        let result = pending.clone().await;

        // Whoever finishes first settles the slot; the ptr_eq check keeps a
        // late waiter from clobbering a newer load for the same key.
        let mut slots = self.slots.lock().await;
        if let Some(Slot::Pending(current)) = slots.get(&key) {
            if current.ptr_eq(&pending) {
                match &result {
                    Ok(value) => {
                        slots.insert(
                            key,
                            Slot::Ready {
                                value: value.clone(),
                                expires_at: Instant::now() + self.ttl,
                            },
                        );
                    }
                    Err(_) => {
                        slots.remove(&key);
                    }
                }
            }
        }

        result
    }

    /// Return a fresh cached value without loading.
    pub async fn get(&self, key: &K) -> Option<V> {
        let slots = self.slots.lock().await;
        match slots.get(key) {
            Some(Slot::Ready { value, expires_at }) if *expires_at > Instant::now() => {
                Some(value.clone())
            }
            _ => None,
        }
    }

    /// Drop every expired ready entry. Pending loads are left alone.
    /// Returns the number of entries removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut slots = self.slots.lock().await;
        let before = slots.len();
        slots.retain(|_, slot| match slot {
            Slot::Ready { expires_at, .. } => *expires_at > now,
            Slot::Pending(_) => true,
        });
        before - slots.len()
    }

    /// Number of entries, pending or ready (expired entries included until swept).
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn record(&self, lookup: Lookup) {
        CACHE_LOOKUPS
            .with_label_values(&[self.name, lookup.as_str()])
            .inc();
    }
}

/// Periodically purge expired entries from `cache`.
///
/// The task holds only a weak reference and stops once the cache is dropped.
pub fn spawn_sweeper<K, V, E>(cache: &Arc<CoalescingCache<K, V, E>>, every: Duration) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    let weak: Weak<CoalescingCache<K, V, E>> = Arc::downgrade(cache);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // First tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(cache) = weak.upgrade() else {
                break;
            };
            let removed = cache.purge_expired().await;
            if removed > 0 {
                debug!(cache = cache.name, removed, "Swept expired cache entries");
            }
        }
    })
}
