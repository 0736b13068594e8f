//! Thread-safe containers shared across execution contexts.
//!
//! Every operation takes a short `parking_lot` lock and never calls back into
//! user code while holding it, so the containers are safe to use from the
//! render timer, decode callbacks and async tasks alike. Aggregate operations
//! (`drain`, `fold`, `replace_all`) observe a consistent snapshot.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;

use parking_lot::Mutex;

/// FIFO queue with atomic bulk operations.
#[derive(Debug)]
pub struct ConcurrentQueue<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T> Default for ConcurrentQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ConcurrentQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    /// Appends an element at the tail.
    pub fn put(&self, value: T) {
        self.inner.lock().push_back(value);
    }

    /// Removes the head element, if any.
    pub fn take(&self) -> Option<T> {
        self.inner.lock().pop_front()
    }

    /// Removes the head element only when `predicate` accepts it.
    pub fn take_if<F>(&self, predicate: F) -> Option<T>
    where
        F: FnOnce(&T) -> bool,
    {
        let mut guard = self.inner.lock();
        if guard.front().map(predicate).unwrap_or(false) {
            guard.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Removes every element, returning them in FIFO order.
    pub fn drain(&self) -> Vec<T> {
        self.inner.lock().drain(..).collect()
    }

    /// Folds over the current contents without removing them.
    pub fn fold<A, F>(&self, init: A, f: F) -> A
    where
        F: FnMut(A, &T) -> A,
    {
        self.inner.lock().iter().fold(init, f)
    }
}

/// Unordered set of unique elements.
#[derive(Debug)]
pub struct ConcurrentSet<T> {
    inner: Mutex<HashSet<T>>,
}

impl<T: Eq + Hash> Default for ConcurrentSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash> ConcurrentSet<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashSet::new()),
        }
    }

    /// Inserts `value`; returns `false` when it was already present.
    pub fn insert(&self, value: T) -> bool {
        self.inner.lock().insert(value)
    }

    /// Removes `value`; returns `false` when it was absent.
    pub fn remove(&self, value: &T) -> bool {
        self.inner.lock().remove(value)
    }

    pub fn contains(&self, value: &T) -> bool {
        self.inner.lock().contains(value)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Removes and returns every element.
    pub fn drain(&self) -> Vec<T> {
        self.inner.lock().drain().collect()
    }
}

impl<T: Eq + Hash + Clone> ConcurrentSet<T> {
    /// Returns a copy of the current contents.
    pub fn snapshot(&self) -> Vec<T> {
        self.inner.lock().iter().cloned().collect()
    }
}

/// Key/value map with atomic take and replace operations.
#[derive(Debug)]
pub struct ConcurrentMap<K, V> {
    inner: Mutex<HashMap<K, V>>,
}

impl<K: Eq + Hash, V> Default for ConcurrentMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V> ConcurrentMap<K, V> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Stores `value` under `key`, returning the displaced value.
    pub fn put(&self, key: K, value: V) -> Option<V> {
        self.inner.lock().insert(key, value)
    }

    /// Removes and returns the value stored under `key`.
    pub fn pop(&self, key: &K) -> Option<V> {
        self.inner.lock().remove(key)
    }

    /// Removes the entry under `key`; returns `false` when it was absent.
    pub fn remove(&self, key: &K) -> bool {
        self.inner.lock().remove(key).is_some()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Removes and returns every entry.
    pub fn drain(&self) -> Vec<(K, V)> {
        self.inner.lock().drain().collect()
    }

    /// Atomically replaces the whole contents with a single entry.
    ///
    /// Returns the values that were displaced.
    pub fn replace_all(&self, key: K, value: V) -> Vec<V> {
        let mut guard = self.inner.lock();
        let displaced = guard.drain().map(|(_, v)| v).collect();
        guard.insert(key, value);
        displaced
    }

    /// Removes and returns the first entry whose key satisfies `predicate`.
    pub fn pop_where<F>(&self, mut predicate: F) -> Option<(K, V)>
    where
        K: Clone,
        F: FnMut(&K) -> bool,
    {
        let mut guard = self.inner.lock();
        let key = guard.keys().find(|k| predicate(k)).cloned()?;
        guard.remove(&key).map(|v| (key, v))
    }
}

impl<K: Eq + Hash + Clone, V> ConcurrentMap<K, V> {
    pub fn keys(&self) -> Vec<K> {
        self.inner.lock().keys().cloned().collect()
    }
}
