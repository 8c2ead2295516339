use std::num::NonZeroUsize;

use lru::LruCache;

use crate::corpus::loader::LoadedCorpus;

/// Cache of loaded product sets, keyed by the sorted prefix list.
///
/// Explicitly owned by the session with count-bounded LRU eviction, in
/// place of an unbounded process-wide map.
pub struct CorpusCache {
    cache: LruCache<String, LoadedCorpus>,
}

impl CorpusCache {
    pub fn new(entries: usize) -> Self {
        let cap = NonZeroUsize::new(entries.max(1)).unwrap();
        CorpusCache {
            cache: LruCache::new(cap),
        }
    }

    /// Cache key is order-insensitive over the requested prefixes
    pub fn key(prefixes: &[String]) -> String {
        let mut sorted = prefixes.to_vec();
        sorted.sort();
        sorted.join(",")
    }

    pub fn get(&mut self, key: &str) -> Option<LoadedCorpus> {
        self.cache.get(key).cloned()
    }

    pub fn put(&mut self, key: String, corpus: LoadedCorpus) {
        self.cache.put(key, corpus);
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}
