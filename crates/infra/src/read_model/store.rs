use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Key/value store abstraction for disposable read models.
///
/// Writes come from a single projection runner; reads may come from any
/// number of request handlers at the same time.
pub trait AggregateStore<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Option<V>;
    fn upsert(&self, key: K, value: V);
    /// Remove a record, returning it if it was present.
    fn delete(&self, key: &K) -> Option<V>;
    /// All records, ordered by key.
    fn list(&self) -> Vec<V>;
    /// Drop every record (rebuild support).
    fn clear(&self);
}

impl<K, V, S> AggregateStore<K, V> for Arc<S>
where
    S: AggregateStore<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> Option<V> {
        (**self).get(key)
    }

    fn upsert(&self, key: K, value: V) {
        (**self).upsert(key, value)
    }

    fn delete(&self, key: &K) -> Option<V> {
        (**self).delete(key)
    }

    fn list(&self) -> Vec<V> {
        (**self).list()
    }

    fn clear(&self) {
        (**self).clear()
    }
}

/// In-memory store; the only backend a service needs, since every read model
/// is rebuilt from the bus on startup.
#[derive(Debug)]
pub struct InMemoryAggregateStore<K, V> {
    inner: RwLock<BTreeMap<K, V>>,
}

impl<K, V> InMemoryAggregateStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryAggregateStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> AggregateStore<K, V> for InMemoryAggregateStore<K, V>
where
    K: Clone + Ord + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &K) -> Option<V> {
        let map = self.inner.read().ok()?;
        map.get(key).cloned()
    }

    fn upsert(&self, key: K, value: V) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(key, value);
        }
    }

    fn delete(&self, key: &K) -> Option<V> {
        let mut map = self.inner.write().ok()?;
        map.remove(key)
    }

    fn list(&self) -> Vec<V> {
        match self.inner.read() {
            Ok(map) => map.values().cloned().collect(),
            Err(_) => vec![],
        }
    }

    fn clear(&self) {
        if let Ok(mut map) = self.inner.write() {
            map.clear();
        }
    }
}
