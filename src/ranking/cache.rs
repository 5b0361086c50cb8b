use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use crate::ranking::word_list::{WordList, WordListQuery};

/// LRU of computed word lists. Entries are only valid for the store
/// generation and the totals they were computed from: a newer generation
/// empties the cache, and it is cleared along with the totals.
pub struct WordListCache {
    cache: Mutex<Generational>,
    capacity: usize,
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
}

struct Generational {
    generation: u64,
    lists: LruCache<WordListQuery, Arc<WordList>>,
}

impl Generational {
    /// Drop everything computed before `generation`
    fn advance(&mut self, generation: u64) {
        if generation != self.generation {
            self.lists.clear();
            self.generation = generation;
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub hit_count: usize,
    pub miss_count: usize,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

impl WordListCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        WordListCache {
            cache: Mutex::new(Generational { generation: 0, lists: LruCache::new(cap) }),
            capacity: cap.get(),
            hit_count: AtomicUsize::new(0),
            miss_count: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, generation: u64, key: &WordListQuery) -> Option<Arc<WordList>> {
        let mut cache = self.cache.lock();
        cache.advance(generation);
        if let Some(list) = cache.lists.get(key) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            Some(list.clone())
        } else {
            self.miss_count.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Lists computed at an older generation than the cache has seen are dropped
    pub fn put(&self, generation: u64, key: WordListQuery, list: Arc<WordList>) {
        let mut cache = self.cache.lock();
        if generation < cache.generation {
            return;
        }
        cache.advance(generation);
        cache.lists.put(key, list);
    }

    pub fn clear(&self) {
        self.cache.lock().lists.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            size: self.cache.lock().lists.len(),
            capacity: self.capacity,
        }
    }
}
