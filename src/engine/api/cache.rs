use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
    time::Duration,
};
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Value,
    pub expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// TTL map of decoded api results. Concurrent misses for the same key are not
/// joined: every caller that misses goes to the network.
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: String, value: Value) {
        self.insert_with_ttl(key, value, self.ttl);
    }

    pub fn insert_with_ttl(&self, key: String, value: Value, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.lock().insert(key, CacheEntry { value, expires_at });
    }

    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `method?k=v&...` with parameters sorted, so argument order never splits
/// the cache.
pub fn cache_key(method: &str, params: &[(String, String)]) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort();
    let query: Vec<String> = sorted.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("{}?{}", method, query.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(10));
        cache.insert("user.info?handles=tourist".into(), json!([{"handle": "tourist"}]));

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(
            cache.get("user.info?handles=tourist"),
            Some(json!([{"handle": "tourist"}]))
        );

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("user.info?handles=tourist"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn purge_drops_only_stale_entries() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.insert_with_ttl("a".into(), json!(1), Duration::from_secs(1));
        cache.insert("b".into(), json!(2));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.get("b"), Some(json!(2)));
    }

    #[test]
    fn key_ignores_parameter_order() {
        let a = vec![
            ("handle".to_string(), "tourist".to_string()),
            ("count".to_string(), "10".to_string()),
        ];
        let b = vec![a[1].clone(), a[0].clone()];
        assert_eq!(cache_key("user.status", &a), cache_key("user.status", &b));
        assert_eq!(
            cache_key("user.status", &a),
            "user.status?count=10&handle=tourist"
        );
    }
}
