//! Snapshot stores.
//!
//! A [`Store`] maps entity ids to the last-known state of that entity. Only
//! the engine writes to it; readers always get owned copies, never a view
//! into the map.

use std::collections::BTreeMap;

use tokio::sync::RwLock;

/// An id-keyed snapshot of one entity class.
#[derive(Debug)]
pub struct Store<K, V> {
    entries: RwLock<BTreeMap<K, V>>,
}

impl<K: Ord + Clone, V: Clone> Store<K, V> {
    /// An empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// An owned copy of the whole map.
    pub async fn snapshot(&self) -> BTreeMap<K, V> {
        self.entries.read().await.clone()
    }

    /// A copy of the value stored under `key`.
    pub async fn get(&self, key: &K) -> Option<V> {
        self.entries.read().await.get(key).cloned()
    }

    /// Store `value` under `key`, replacing any previous value.
    pub async fn insert(&self, key: K, value: V) {
        self.entries.write().await.insert(key, value);
    }

    /// Remove every key in `keys`.
    pub async fn remove_all<'a>(&self, keys: impl IntoIterator<Item = &'a K>)
    where
        K: 'a,
    {
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(key);
        }
    }

    /// Replace the whole contents.
    pub async fn replace(&self, entries: BTreeMap<K, V>) {
        *self.entries.write().await = entries;
    }

    /// Run `f` with exclusive access to the map.
    ///
    /// Readers are blocked for the duration, so they never observe a
    /// half-applied reconciliation.
    pub async fn update<R>(&self, f: impl FnOnce(&mut BTreeMap<K, V>) -> R) -> R {
        let mut entries = self.entries.write().await;
        f(&mut entries)
    }
}

impl<K: Ord + Clone, V: Clone> Default for Store<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
