/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A bounded least-recently-used map that can be shared between threads.
//!
//! Reads and writes both refresh the recency of an entry. Values are cloned out of the map, so
//! large values should be wrapped in an `Arc`. Computation of a missing value happens outside
//! the lock: two threads missing on the same key may both compute it, and the last insertion
//! wins, which is harmless since values are functions of their keys.

use std::{hash::Hash, num::NonZeroUsize};

use parking_lot::{Mutex, MutexGuard};

pub struct SharedLru<K: Hash + Eq, V> {
    inner: Mutex<lru::LruCache<K, V>>,
}

impl<K: Hash + Eq + Clone, V: Clone> SharedLru<K, V> {
    /// A cache holding at most `max_size` entries. A size of zero is taken as one.
    pub fn new(max_size: usize) -> Self {
        let capacity = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(lru::LruCache::new(capacity)),
        }
    }

    fn guard(&self) -> MutexGuard<'_, lru::LruCache<K, V>> {
        self.inner.lock()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.guard().get(key).cloned()
    }

    pub fn put(&self, key: K, value: V) {
        self.guard().put(key, value);
    }

    /// The cached value for `key`, or the result of `compute` if missing. Absent results are
    /// not cached, so that a later call can find a value that appeared in the meantime.
    pub fn get_or_compute<E>(
        &self,
        key: &K,
        compute: impl FnOnce() -> Result<Option<V>, E>,
    ) -> Result<Option<V>, E> {
        if let Some(value) = self.get(key) {
            return Ok(Some(value));
        }

        let computed = compute()?;
        if let Some(value) = &computed {
            self.put(key.clone(), value.clone());
        }
        Ok(computed)
    }

    pub fn remove(&self, key: &K) {
        self.guard().pop(key);
    }

    pub fn clear(&self) {
        self.guard().clear();
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }
}
