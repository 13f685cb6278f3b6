use crate::error::{CacheError, TransformError};
use dashmap::DashMap;
use std::sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
};
use tracing::debug;

const POPULATING: u8 = 0;
const SEALED: u8 = 1;

struct Inner<V> {
    entries: DashMap<i64, V>,
    phase: AtomicU8,
}

/// Run-scoped lookup table from a source id to an already transformed
/// sub-document.
///
/// The cache has two phases. While populating, only a [`CachePopulator`]
/// can be handed out and it is the only way to add entries. After
/// [`ReferenceCache::seal`], populators refuse inserts and only a
/// [`CacheReader`] can be obtained. The map itself is concurrent, so the
/// phase check is the only ordering the cache relies on.
pub struct ReferenceCache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for ReferenceCache<V> {
    fn clone(&self) -> Self {
        ReferenceCache {
            inner: self.inner.clone(),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> Default for ReferenceCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync + 'static> ReferenceCache<V> {
    pub fn new() -> Self {
        ReferenceCache {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                phase: AtomicU8::new(POPULATING),
            }),
        }
    }

    /// Insert-only handle for the producing step.
    pub fn populator(&self) -> Result<CachePopulator<V>, CacheError> {
        if self.is_sealed() {
            return Err(CacheError::Sealed);
        }
        Ok(CachePopulator {
            inner: self.inner.clone(),
        })
    }

    /// Read-only handle for the consuming step. Only available once sealed.
    pub fn reader(&self) -> Result<CacheReader<V>, CacheError> {
        if !self.is_sealed() {
            return Err(CacheError::NotSealed);
        }
        Ok(CacheReader {
            inner: self.inner.clone(),
        })
    }

    /// Ends the populate phase.
    pub fn seal(&self) {
        self.inner.phase.store(SEALED, Ordering::SeqCst);
        debug!(entries = self.len(), "Reference cache sealed");
    }

    pub fn is_sealed(&self) -> bool {
        self.inner.phase.load(Ordering::SeqCst) == SEALED
    }

    /// Drops every entry. The cache stays sealed.
    pub fn clear(&self) {
        self.inner.phase.store(SEALED, Ordering::SeqCst);
        self.inner.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    pub fn contains(&self, key: i64) -> bool {
        self.inner.entries.contains_key(&key)
    }
}

pub struct CachePopulator<V> {
    inner: Arc<Inner<V>>,
}

impl<V: Clone + Send + Sync + 'static> CachePopulator<V> {
    pub fn insert(&self, key: i64, value: V) -> Result<(), CacheError> {
        if self.inner.phase.load(Ordering::SeqCst) == SEALED {
            return Err(CacheError::Sealed);
        }
        self.inner.entries.insert(key, value);
        Ok(())
    }
}

pub struct CacheReader<V> {
    inner: Arc<Inner<V>>,
}

impl<V: Clone + Send + Sync + 'static> CacheReader<V> {
    pub fn get(&self, key: i64) -> Result<V, TransformError> {
        self.inner
            .entries
            .get(&key)
            .map(|entry| entry.value().clone())
            .ok_or(TransformError::MissingKey { key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_is_refused_while_populating() {
        let cache: ReferenceCache<String> = ReferenceCache::new();
        assert_eq!(cache.reader().err(), Some(CacheError::NotSealed));
    }

    #[test]
    fn populator_stops_accepting_after_seal() {
        let cache: ReferenceCache<String> = ReferenceCache::new();
        let populator = cache.populator().unwrap();
        populator.insert(1, "G1".into()).unwrap();

        cache.seal();

        assert_eq!(populator.insert(2, "G2".into()), Err(CacheError::Sealed));
        assert!(cache.populator().is_err());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn reader_reports_missing_key() {
        let cache: ReferenceCache<String> = ReferenceCache::new();
        cache.populator().unwrap().insert(1, "G1".into()).unwrap();
        cache.seal();

        let reader = cache.reader().unwrap();
        assert_eq!(reader.get(1).unwrap(), "G1");
        assert_eq!(reader.get(9), Err(TransformError::MissingKey { key: 9 }));
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache: ReferenceCache<String> = ReferenceCache::new();
        cache.populator().unwrap().insert(1, "G1".into()).unwrap();
        cache.seal();
        let reader = cache.reader().unwrap();

        cache.clear();

        assert!(cache.is_empty());
        assert!(reader.get(1).is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_population_keeps_every_entry() {
        let cache: ReferenceCache<i64> = ReferenceCache::new();
        let mut handles = Vec::new();
        for worker in 0..4i64 {
            let populator = cache.populator().unwrap();
            handles.push(tokio::spawn(async move {
                for i in 0..250 {
                    populator.insert(worker * 1000 + i, i).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(cache.len(), 1000);
    }
}
