//! Query Cache
//!
//! Explicit cache of fetched lists keyed by query identity. Views read
//! from it and subscribe to change events instead of holding their own
//! copies; the board controller writes optimistic, rolled-back and
//! re-fetched values into it.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use pipeline_backend::domain::{Deal, DealFilter};
use tokio::sync::broadcast;

/// Queued events per subscriber before the slowest one starts lagging
const EVENT_BUFFER: usize = 64;

/// Identity of the board query
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BoardQuery {
    pub filter: DealFilter,
}

impl BoardQuery {
    pub fn new(filter: DealFilter) -> Self {
        Self { filter }
    }
}

/// Cache of board lists
pub type BoardCache = QueryCache<BoardQuery, Vec<Deal>>;

/// Change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent<K> {
    Updated { key: K, version: u64 },
    Invalidated { key: K, version: u64 },
}

struct Entry<V> {
    value: Option<Arc<V>>,
    version: u64,
    stale: bool,
}

/// Values keyed by query, with per-key version counters
pub struct QueryCache<K, V> {
    entries: RwLock<HashMap<K, Entry<V>>>,
    events: broadcast::Sender<CacheEvent<K>>,
}

impl<K, V> Default for QueryCache<K, V>
where
    K: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> QueryCache<K, V>
where
    K: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            entries: RwLock::new(HashMap::new()),
            events,
        }
    }

    // A panic while holding the lock cannot leave an entry half-written,
    // so a poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<K, Entry<V>>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<K, Entry<V>>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Current value, stale or not
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.read().get(key).and_then(|e| e.value.clone())
    }

    /// Replace the value and clear the stale mark. Returns the new version.
    pub fn set(&self, key: K, value: impl Into<Arc<V>>) -> u64 {
        let version = {
            let mut entries = self.write();
            let entry = entries.entry(key.clone()).or_insert(Entry {
                value: None,
                version: 0,
                stale: false,
            });
            entry.value = Some(value.into());
            entry.stale = false;
            entry.version += 1;
            entry.version
        };
        // No subscribers is fine
        let _ = self.events.send(CacheEvent::Updated { key, version });
        version
    }

    /// Mark the value stale so the next reader re-fetches.
    /// The last value stays readable until it is replaced.
    pub fn invalidate(&self, key: &K) {
        let version = {
            let mut entries = self.write();
            match entries.get_mut(key) {
                Some(entry) => {
                    entry.stale = true;
                    entry.version += 1;
                    entry.version
                }
                None => return,
            }
        };
        let _ = self.events.send(CacheEvent::Invalidated {
            key: key.clone(),
            version,
        });
    }

    /// True when the key is missing or was invalidated since the last set
    pub fn is_stale(&self, key: &K) -> bool {
        self.read().get(key).map_or(true, |e| e.stale || e.value.is_none())
    }

    /// Version counter for the key; 0 if it was never set
    pub fn version(&self, key: &K) -> u64 {
        self.read().get(key).map_or(0, |e| e.version)
    }

    /// Receive every subsequent update and invalidation
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent<K>> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_and_versions() {
        let cache: QueryCache<&str, Vec<u32>> = QueryCache::new();
        assert!(cache.get(&"board").is_none());
        assert!(cache.is_stale(&"board"));
        assert_eq!(cache.version(&"board"), 0);

        assert_eq!(cache.set("board", vec![1, 2]), 1);
        assert_eq!(*cache.get(&"board").unwrap(), vec![1, 2]);
        assert!(!cache.is_stale(&"board"));

        let shared = Arc::new(vec![3]);
        assert_eq!(cache.set("board", shared.clone()), 2);
        assert!(Arc::ptr_eq(&cache.get(&"board").unwrap(), &shared));
    }

    #[test]
    fn test_invalidate_keeps_last_value() {
        let cache: QueryCache<&str, Vec<u32>> = QueryCache::new();
        cache.set("board", vec![1]);
        cache.invalidate(&"board");

        assert!(cache.is_stale(&"board"));
        assert_eq!(*cache.get(&"board").unwrap(), vec![1]);
        assert_eq!(cache.version(&"board"), 2);

        // Unknown keys are ignored
        cache.invalidate(&"other");
        assert_eq!(cache.version(&"other"), 0);
    }

    #[test]
    fn test_subscribers_see_events_in_order() {
        let cache: QueryCache<&str, Vec<u32>> = QueryCache::new();
        let mut rx = cache.subscribe();

        cache.set("board", vec![1]);
        cache.invalidate(&"board");
        cache.set("board", vec![2]);

        assert_eq!(rx.try_recv().unwrap(), CacheEvent::Updated { key: "board", version: 1 });
        assert_eq!(rx.try_recv().unwrap(), CacheEvent::Invalidated { key: "board", version: 2 });
        assert_eq!(rx.try_recv().unwrap(), CacheEvent::Updated { key: "board", version: 3 });
        assert!(rx.try_recv().is_err());
    }
}
