

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};


/// Per-run embedding cache. Created by the caller, handed to the embedding
/// stage, dropped when the run ends.
pub struct EmbeddingCache {
    entries: Mutex<LruCache<String, Arc<[f32]>>>,
    stats: Mutex<CacheStats>,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl EmbeddingCache {

    pub fn new(max_size: usize) -> Self {
        let capacity = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            stats: Mutex::new(CacheStats::default()),
        }
    }


    pub fn key(model: &str, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }


    pub fn get(&self, model: &str, text: &str) -> Option<Arc<[f32]>> {
        let key = Self::key(model, text);
        let found = self.entries.lock().get(&key).cloned();

        let mut stats = self.stats.lock();
        if found.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        found
    }


    pub fn insert(&self, model: &str, text: &str, embedding: Arc<[f32]>) {
        let key = Self::key(model, text);
        let mut entries = self.entries.lock();
        entries.put(key, embedding);
        self.stats.lock().size = entries.len();
    }


    pub fn stats(&self) -> CacheStats {
        self.stats.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }


    pub fn clear(&self) {
        self.entries.lock().clear();
        self.stats.lock().size = 0;
    }
}
