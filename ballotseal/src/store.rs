use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

/// A map whose entries expire a fixed time after insertion.
///
/// Expired entries are invisible to lookups immediately, but are only freed by an explicit
/// call to `evict_expired`.
#[derive(Debug, Clone)]
pub struct ExpiringStore<K: Ord, V> {
    inner: BTreeMap<K, Entry<V>>,
    ttl: Duration,
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

impl<K: Ord, V> ExpiringStore<K, V> {
    pub fn new(ttl: Duration) -> Self {
        ExpiringStore {
            inner: BTreeMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Insert a value, returning when it expires
    pub fn set(&mut self, key: K, value: V, now: DateTime<Utc>) -> DateTime<Utc> {
        let expires_at = now + self.ttl;
        self.inner.insert(key, Entry { value, expires_at });
        expires_at
    }

    /// Get a live value
    pub fn get(&self, key: &K, now: DateTime<Utc>) -> Option<&V> {
        match self.inner.get(key) {
            Some(entry) if now < entry.expires_at => Some(&entry.value),
            _ => None,
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.remove(key).map(|entry| entry.value)
    }

    /// Drop every expired entry, returning how many were removed
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.inner.len();
        self.inner.retain(|_, entry| now < entry.expires_at);
        before - self.inner.len()
    }

    /// Number of entries held, including expired ones not yet evicted
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_expire_and_evict() {
        let start = Utc::now();
        let mut store = ExpiringStore::new(Duration::hours(24));

        let expires = store.set("a", 1, start);
        store.set("b", 2, start + Duration::hours(12));
        assert_eq!(expires, start + Duration::hours(24));

        assert_eq!(store.get(&"a", start + Duration::hours(23)), Some(&1));
        assert_eq!(store.get(&"a", start + Duration::hours(24)), None);
        assert_eq!(store.get(&"b", start + Duration::hours(24)), Some(&2));

        // Expired but not yet evicted
        assert_eq!(store.len(), 2);
        assert_eq!(store.evict_expired(start + Duration::hours(24)), 1);
        assert_eq!(store.len(), 1);

        assert_eq!(store.remove(&"b"), Some(2));
        assert!(store.is_empty());
    }
}
