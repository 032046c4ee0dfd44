//! In-memory mirror of the persisted collections.
//!
//! An entry stays valid while the backing file's modification time is not
//! newer than the entry's stamp. Reads stamp with the file's mtime, writes
//! stamp with the wall clock at the time of the write.
//!
//! Every change to a collection's entry bumps its generation. A reader that
//! went to disk only installs what it read if the generation it saw before
//! reading is still current, so a slow read can never replace the entry a
//! concurrent write just stored.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::SystemTime;

use crate::models::{Collection, JsonMap};

/// A cached collection with the time it was known to match disk.
struct CacheEntry {
    value: JsonMap,
    stamp: SystemTime,
}

impl CacheEntry {
    fn is_fresh(&self, file_mtime: SystemTime) -> bool {
        file_mtime <= self.stamp
    }
}

#[derive(Default)]
struct Inner {
    entries: HashMap<Collection, CacheEntry>,
    generations: HashMap<Collection, u64>,
}

impl Inner {
    fn bump(&mut self, collection: Collection) {
        *self.generations.entry(collection).or_insert(0) += 1;
    }

    fn generation(&self, collection: Collection) -> u64 {
        self.generations.get(&collection).copied().unwrap_or(0)
    }
}

/// Cache for the three collections.
#[derive(Default)]
pub struct CollectionCache {
    inner: RwLock<Inner>,
}

impl CollectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached value if the file has not changed since it was cached.
    pub fn get_if_fresh(&self, collection: Collection, file_mtime: SystemTime) -> Option<JsonMap> {
        self.inner.read().ok().and_then(|guard| {
            guard
                .entries
                .get(&collection)
                .filter(|e| e.is_fresh(file_mtime))
                .map(|e| e.value.clone())
        })
    }

    /// Current generation of a collection's entry.
    pub fn generation(&self, collection: Collection) -> u64 {
        self.inner
            .read()
            .map(|guard| guard.generation(collection))
            .unwrap_or(0)
    }

    /// Store the value just written to disk.
    pub fn put(&self, collection: Collection, value: JsonMap, stamp: SystemTime) {
        if let Ok(mut guard) = self.inner.write() {
            guard.entries.insert(collection, CacheEntry { value, stamp });
            guard.bump(collection);
        }
    }

    /// Store a value read from disk, unless the entry changed after `seen`
    /// was taken or already carries a newer stamp.
    ///
    /// Returns whether the value was installed.
    pub fn put_if_unchanged(
        &self,
        collection: Collection,
        value: JsonMap,
        stamp: SystemTime,
        seen: u64,
    ) -> bool {
        let Ok(mut guard) = self.inner.write() else {
            return false;
        };
        if guard.generation(collection) != seen {
            return false;
        }
        if guard
            .entries
            .get(&collection)
            .is_some_and(|existing| existing.stamp > stamp)
        {
            return false;
        }
        guard.entries.insert(collection, CacheEntry { value, stamp });
        guard.bump(collection);
        true
    }

    pub fn invalidate(&self, collection: Collection) {
        if let Ok(mut guard) = self.inner.write() {
            guard.entries.remove(&collection);
            guard.bump(collection);
        }
    }

    /// Number of top-level entries currently cached for a collection.
    pub fn len_of(&self, collection: Collection) -> usize {
        self.inner
            .read()
            .ok()
            .and_then(|guard| guard.entries.get(&collection).map(|e| e.value.len()))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample() -> JsonMap {
        let mut map = JsonMap::new();
        map.insert("alice".into(), serde_json::json!("pw"));
        map
    }

    #[test]
    fn test_fresh_entry_is_returned() {
        let cache = CollectionCache::new();
        let stamp = SystemTime::now();
        cache.put(Collection::Users, sample(), stamp);

        assert_eq!(cache.get_if_fresh(Collection::Users, stamp), Some(sample()));
        assert_eq!(cache.len_of(Collection::Users), 1);
        assert_eq!(cache.len_of(Collection::Guesses), 0);
    }

    #[test]
    fn test_newer_file_misses() {
        let cache = CollectionCache::new();
        let stamp = SystemTime::now();
        cache.put(Collection::Users, sample(), stamp);

        let later = stamp + Duration::from_secs(1);
        assert!(cache.get_if_fresh(Collection::Users, later).is_none());
    }

    #[test]
    fn test_invalidate() {
        let cache = CollectionCache::new();
        let stamp = SystemTime::now();
        cache.put(Collection::Results, sample(), stamp);
        cache.invalidate(Collection::Results);
        assert!(cache.get_if_fresh(Collection::Results, stamp).is_none());
    }

    #[test]
    fn test_read_started_before_a_write_is_discarded() {
        let cache = CollectionCache::new();
        let old_stamp = SystemTime::now();
        let seen = cache.generation(Collection::Users);

        let mut fresh = sample();
        fresh.insert("bob".into(), serde_json::json!("pw2"));
        cache.put(Collection::Users, fresh.clone(), old_stamp);

        // Same stamp as the write, as on a filesystem with coarse mtimes.
        assert!(!cache.put_if_unchanged(Collection::Users, sample(), old_stamp, seen));
        assert_eq!(cache.get_if_fresh(Collection::Users, old_stamp), Some(fresh));
    }

    #[test]
    fn test_older_stamp_never_replaces_newer_entry() {
        let cache = CollectionCache::new();
        let now = SystemTime::now();
        cache.put(Collection::Guesses, sample(), now);

        let seen = cache.generation(Collection::Guesses);
        let earlier = now - Duration::from_secs(5);
        assert!(!cache.put_if_unchanged(Collection::Guesses, JsonMap::new(), earlier, seen));
        assert_eq!(cache.len_of(Collection::Guesses), 1);

        let later = now + Duration::from_secs(5);
        assert!(cache.put_if_unchanged(Collection::Guesses, JsonMap::new(), later, seen));
        assert_eq!(cache.len_of(Collection::Guesses), 0);
    }
}
