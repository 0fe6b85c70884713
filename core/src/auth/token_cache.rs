use super::types::CachedToken;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct TokenCache {
    cache: Arc<RwLock<HashMap<String, CachedToken>>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, key: &str) -> Option<CachedToken> {
        let cache = self.cache.read().await;
        cache.get(key).filter(|token| !token.is_expired()).cloned()
    }

    pub async fn set(&self, key: String, token: CachedToken) {
        let mut cache = self.cache.write().await;
        cache.insert(key, token);
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn expired_entries_are_not_returned() {
        let cache = TokenCache::new();
        cache
            .set(
                "k".into(),
                CachedToken::new("tok".into(), "Bearer".into(), Duration::from_secs(0)),
            )
            .await;
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn live_entries_round_trip() {
        let cache = TokenCache::new();
        cache
            .set(
                "k".into(),
                CachedToken::new("tok".into(), "Bearer".into(), Duration::from_secs(3600)),
            )
            .await;
        let hit = cache.get("k").await.expect("token should be cached");
        assert_eq!(hit.token, "tok");
    }
}
