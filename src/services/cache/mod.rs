//! Translation cache: an LRU hot layer in front of a SQLite store.
//!
//! Store failures never fail a job. The first one switches the cache into
//! memory-only mode for the rest of the run.

pub mod hash;
pub mod model;
pub mod store;

use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use model::{CacheEntry, CacheStats};
use store::SqliteStore;

const DEFAULT_CAPACITY: usize = 10_000;

pub struct TranslationCache {
    memory: Mutex<LruCache<String, String>>,
    store: Option<SqliteStore>,
    degraded: AtomicBool,
}

impl TranslationCache {
    /// Opens the store at `path`; if that fails the cache starts degraded.
    pub fn open(path: impl AsRef<Path>, capacity: usize) -> Self {
        let path = path.as_ref();
        match SqliteStore::open(path) {
            Ok(store) => {
                tracing::debug!(path = %path.display(), "translation cache opened");
                Self::build(Some(store), capacity, false)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cache store unavailable, running without it");
                Self::build(None, capacity, true)
            }
        }
    }

    pub fn in_memory(capacity: usize) -> Self {
        Self::build(None, capacity, false)
    }

    fn build(store: Option<SqliteStore>, capacity: usize, degraded: bool) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or(NonZeroUsize::new(DEFAULT_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        TranslationCache {
            memory: Mutex::new(LruCache::new(capacity)),
            store,
            degraded: AtomicBool::new(degraded),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn live_store(&self) -> Option<&SqliteStore> {
        if self.is_degraded() {
            None
        } else {
            self.store.as_ref()
        }
    }

    fn degrade(&self, error: &crate::error::CoreError) {
        if !self.degraded.swap(true, Ordering::Relaxed) {
            tracing::warn!(error = %error, "cache store failed, continuing without it");
        }
    }

    /// Returns a result per text plus the indices that missed both layers.
    pub fn get_batch<S: AsRef<str>>(&self, texts: &[S], lang: &str) -> (Vec<Option<String>>, Vec<usize>) {
        let mut results: Vec<Option<String>> = vec![None; texts.len()];
        let mut uncached = Vec::new();
        let mut pending_keys = Vec::new();

        {
            let mut memory = self.memory.lock().unwrap_or_else(|p| p.into_inner());
            for (i, text) in texts.iter().enumerate() {
                let key = hash::cache_key(text.as_ref(), lang);
                match memory.get(&key) {
                    Some(hit) => results[i] = Some(hit.clone()),
                    None => {
                        uncached.push(i);
                        pending_keys.push(key);
                    }
                }
            }
        }

        let Some(store) = self.live_store() else {
            return (results, uncached);
        };
        if pending_keys.is_empty() {
            return (results, uncached);
        }

        let found = match store.get_many(&pending_keys, lang) {
            Ok(found) => found,
            Err(e) => {
                self.degrade(&e);
                return (results, uncached);
            }
        };

        let mut memory = self.memory.lock().unwrap_or_else(|p| p.into_inner());
        let mut still_uncached = Vec::new();
        for (i, key) in uncached.into_iter().zip(pending_keys) {
            match found.get(&key) {
                Some(hit) => {
                    results[i] = Some(hit.clone());
                    memory.put(key, hit.clone());
                }
                None => still_uncached.push(i),
            }
        }

        (results, still_uncached)
    }

    pub fn save_batch<S: AsRef<str>, T: AsRef<str>>(&self, texts: &[S], translations: &[T], lang: &str) {
        if texts.is_empty() {
            return;
        }
        if texts.len() != translations.len() {
            tracing::warn!(
                texts = texts.len(),
                translations = translations.len(),
                "refusing to cache misaligned batch"
            );
            return;
        }

        let entries: Vec<CacheEntry> = texts
            .iter()
            .zip(translations)
            .map(|(text, translated)| CacheEntry {
                source_hash: hash::cache_key(text.as_ref(), lang),
                source_text: text.as_ref().to_string(),
                target_lang: lang.to_string(),
                translated_text: translated.as_ref().to_string(),
                created_at: None,
            })
            .collect();

        {
            let mut memory = self.memory.lock().unwrap_or_else(|p| p.into_inner());
            for e in &entries {
                memory.put(e.source_hash.clone(), e.translated_text.clone());
            }
        }

        if let Some(store) = self.live_store() {
            if let Err(e) = store.save_many(&entries) {
                self.degrade(&e);
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let memory_entries = self.memory.lock().map(|m| m.len()).unwrap_or(0);
        let store_entries = self.live_store().and_then(|s| match s.count() {
            Ok(n) => Some(n),
            Err(e) => {
                self.degrade(&e);
                None
            }
        });
        CacheStats {
            memory_entries,
            store_entries,
            degraded: self.is_degraded(),
        }
    }
}
