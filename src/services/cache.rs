use dashmap::DashMap;
use std::time::{Duration, Instant};

/// A thread-safe, time-bounded cache keyed by normalized symbol.
///
/// Entries are served while younger than the TTL. Stale entries stay in the
/// map until overwritten or swept by [`Cache::cleanup`].
pub struct Cache<V> {
    data: DashMap<String, CacheEntry<V>>,
    ttl: Duration,
}

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

impl<V: Clone> Cache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            data: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.stored_at) < self.ttl
    }

    /// Get a fresh value from the cache.
    pub fn get(&self, key: &str) -> Option<V> {
        let entry = self.data.get(key)?;
        self.is_fresh(&entry, Instant::now()).then(|| entry.value.clone())
    }

    /// Store a value, replacing any previous entry.
    pub fn set(&self, key: String, value: V) {
        self.data.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop every stale entry, returning how many were removed.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let before = self.data.len();
        self.data.retain(|_, entry| now.saturating_duration_since(entry.stored_at) < self.ttl);
        before.saturating_sub(self.data.len())
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cache_basic() {
        let cache = Cache::new(Duration::from_secs(60));
        cache.set("AAPL".to_string(), dec!(172.86));
        assert_eq!(cache.get("AAPL"), Some(dec!(172.86)));
        assert_eq!(cache.get("MSFT"), None);
    }

    #[test]
    fn test_cache_expiration_keeps_entry() {
        let cache = Cache::new(Duration::from_millis(10));
        cache.set("AAPL".to_string(), dec!(1));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get("AAPL"), None);
        // Stale entries are ignored, not evicted
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_zero_ttl_never_fresh() {
        let cache = Cache::new(Duration::ZERO);
        cache.set("AAPL".to_string(), dec!(1));
        assert_eq!(cache.get("AAPL"), None);
    }

    #[test]
    fn test_cache_overwrite_refreshes() {
        let cache = Cache::new(Duration::from_millis(30));
        cache.set("AAPL".to_string(), dec!(1));
        std::thread::sleep(Duration::from_millis(40));
        cache.set("AAPL".to_string(), dec!(2));

        assert_eq!(cache.get("AAPL"), Some(dec!(2)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_cleanup() {
        let cache = Cache::new(Duration::from_millis(30));
        cache.set("stale".to_string(), dec!(1));
        std::thread::sleep(Duration::from_millis(40));
        cache.set("fresh".to_string(), dec!(2));

        assert_eq!(cache.cleanup(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("fresh"), Some(dec!(2)));
        assert_eq!(cache.cleanup(), 0);
    }

    #[test]
    fn test_cache_len_and_is_empty() {
        let cache: Cache<Decimal> = Cache::new(Duration::from_secs(60));
        assert!(cache.is_empty());

        cache.set("AAPL".to_string(), dec!(1));
        assert!(!cache.is_empty());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.ttl(), Duration::from_secs(60));
    }
}
