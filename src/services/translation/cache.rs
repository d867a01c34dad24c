use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

/// Translation memoization keyed by `(text, source_lang, target_lang)`.
///
/// Exact strict-equality matching, recency-ordered, capacity-bounded, no
/// TTL. The handle is cheap to clone; the worker thread is the only mutator
/// during cycles, while `clear` may be invoked from outside (the caller owns
/// clearing on language-pair switches — keys include both language codes, so
/// stale cross-language entries are unreachable garbage, not corruption).
#[derive(Clone)]
pub struct TranslationCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    cache: Mutex<LruCache<CacheKey, String>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    text: String,
    source: String,
    target: String,
}

impl TranslationCache {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let cap = non_zero(capacity);
        Self {
            inner: Arc::new(CacheInner {
                cache: Mutex::new(LruCache::new(cap)),
                hits: AtomicUsize::new(0),
                misses: AtomicUsize::new(0),
            }),
        }
    }

    /// Look up a cached translation. A hit promotes the entry to
    /// most-recently-used.
    pub fn get(&self, text: &str, source_lang: &str, target_lang: &str) -> Option<String> {
        let key = CacheKey {
            text: text.to_string(),
            source: source_lang.to_string(),
            target: target_lang.to_string(),
        };
        let mut cache = self.inner.cache.lock();
        match cache.get(&key) {
            Some(translation) => {
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                Some(translation.clone())
            }
            None => {
                self.inner.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or overwrite a translation, promoting it to most-recently-used
    /// and evicting the least-recently-used entries beyond capacity.
    pub fn put(&self, text: &str, source_lang: &str, target_lang: &str, translation: &str) {
        let key = CacheKey {
            text: text.to_string(),
            source: source_lang.to_string(),
            target: target_lang.to_string(),
        };
        self.inner.cache.lock().put(key, translation.to_string());
    }

    /// Change the capacity at runtime. Shrinking evicts least-recently-used
    /// entries immediately down to the new bound.
    pub fn set_capacity(&self, capacity: usize) {
        self.inner.cache.lock().resize(non_zero(capacity));
    }

    /// Drop all entries and reset the hit/miss counters together.
    pub fn clear(&self) {
        self.inner.cache.lock().clear();
        self.inner.hits.store(0, Ordering::Relaxed);
        self.inner.misses.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.inner.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.cache.lock().cap().get()
    }

    pub fn hits(&self) -> usize {
        self.inner.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.inner.misses.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        }
    }
}

fn non_zero(capacity: usize) -> NonZeroUsize {
    NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_roundtrip() {
        let cache = TranslationCache::new(10);
        cache.put("hello", "eng_Latn", "fra_Latn", "bonjour");

        assert_eq!(
            cache.get("hello", "eng_Latn", "fra_Latn").as_deref(),
            Some("bonjour")
        );
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 0);
    }

    #[test]
    fn test_key_includes_both_language_codes() {
        let cache = TranslationCache::new(10);
        cache.put("hello", "eng_Latn", "fra_Latn", "bonjour");

        assert!(cache.get("hello", "eng_Latn", "deu_Latn").is_none());
        assert!(cache.get("hello", "deu_Latn", "fra_Latn").is_none());
        assert!(cache.get("hello ", "eng_Latn", "fra_Latn").is_none());
        assert_eq!(cache.misses(), 3);
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let cache = TranslationCache::new(3);
        cache.put("a", "s", "t", "A");
        cache.put("b", "s", "t", "B");
        cache.put("c", "s", "t", "C");
        cache.put("d", "s", "t", "D");

        assert_eq!(cache.len(), 3);
        // Exactly the oldest entry fell out
        assert!(cache.get("a", "s", "t").is_none());
        assert!(cache.get("b", "s", "t").is_some());
        assert!(cache.get("c", "s", "t").is_some());
        assert!(cache.get("d", "s", "t").is_some());
    }

    #[test]
    fn test_get_promotes_recency() {
        let cache = TranslationCache::new(3);
        cache.put("a", "s", "t", "A");
        cache.put("b", "s", "t", "B");
        cache.put("c", "s", "t", "C");

        // Touch "a", then insert 3 new keys: "a" must survive longer than
        // untouched entries of the same age.
        assert!(cache.get("a", "s", "t").is_some());
        cache.put("d", "s", "t", "D");
        cache.put("e", "s", "t", "E");

        assert!(cache.get("a", "s", "t").is_some());
        assert!(cache.get("b", "s", "t").is_none());
        assert!(cache.get("c", "s", "t").is_none());
    }

    #[test]
    fn test_put_overwrites_and_promotes() {
        let cache = TranslationCache::new(2);
        cache.put("a", "s", "t", "old");
        cache.put("b", "s", "t", "B");
        cache.put("a", "s", "t", "new");
        cache.put("c", "s", "t", "C");

        assert_eq!(cache.get("a", "s", "t").as_deref(), Some("new"));
        assert!(cache.get("b", "s", "t").is_none());
    }

    #[test]
    fn test_clear_resets_contents_and_counters() {
        let cache = TranslationCache::new(10);
        cache.put("a", "s", "t", "A");
        let _ = cache.get("a", "s", "t");
        let _ = cache.get("missing", "s", "t");

        cache.clear();

        assert_eq!(cache.len(), 0);
        assert!(cache.get("a", "s", "t").is_none());
        // clear() zeroed the counters; the get above is the only miss since
        assert_eq!(cache.hits(), 0);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_shrinking_capacity_evicts_immediately() {
        let cache = TranslationCache::new(5);
        for (i, key) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            cache.put(key, "s", "t", &i.to_string());
        }

        cache.set_capacity(2);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.capacity(), 2);
        // The two most recent survive
        assert!(cache.get("d", "s", "t").is_some());
        assert!(cache.get("e", "s", "t").is_some());
    }

    #[test]
    fn test_hit_rate() {
        let cache = TranslationCache::new(10);
        assert_eq!(cache.hit_rate(), 0.0);

        cache.put("a", "s", "t", "A");
        let _ = cache.get("a", "s", "t");
        let _ = cache.get("b", "s", "t");
        assert!((cache.hit_rate() - 0.5).abs() < f64::EPSILON);
    }
}
