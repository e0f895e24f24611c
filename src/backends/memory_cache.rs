// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::errors::RpcError;
use crate::traits::CacheStore;

struct Entry {
    value: String,
    /// `None` never expires.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |at| at <= now)
    }
}

/// In-process [`CacheStore`] with per-entry expiry.
///
/// Expiry uses Tokio's clock, so paused-time tests can step over it. An expiry that
/// overflows the clock saturates to "never expires".
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every expired entry.
    pub fn clean(&self) {
        let now = Instant::now();
        self.lock().retain(|_, entry| !entry.is_expired(now));
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn store(&self, key: &str, value: &str, expires_after: Duration) -> Result<(), RpcError> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now().checked_add(expires_after),
        };
        self.lock().insert(key.to_string(), entry);
        Ok(())
    }

    async fn obtain(&self, key: &str) -> Result<Option<String>, RpcError> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired(Instant::now()) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for InMemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCache")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::consts::NEVER_EXPIRES;

    #[tokio::test(start_paused = true)]
    async fn entry_expires_after_ttl() {
        let cache = InMemoryCache::new();
        cache
            .store("key", "value", Duration::from_millis(100))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_millis(50)).await;
        assert_eq!(cache.obtain("key").await.unwrap().as_deref(), Some("value"));

        tokio::time::advance(Duration::from_millis(60)).await;
        assert_eq!(cache.obtain("key").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn overflowing_expiry_never_expires() {
        let cache = InMemoryCache::new();
        cache.store("key", "value", NEVER_EXPIRES).await.unwrap();

        tokio::time::advance(Duration::from_secs(60 * 60 * 24 * 365)).await;
        assert_eq!(cache.obtain("key").await.unwrap().as_deref(), Some("value"));
    }

    #[tokio::test(start_paused = true)]
    async fn clean_drops_only_expired_entries() {
        let cache = InMemoryCache::new();
        cache.store("short", "1", Duration::from_millis(10)).await.unwrap();
        cache.store("long", "2", Duration::from_secs(10)).await.unwrap();

        tokio::time::advance(Duration::from_millis(20)).await;
        cache.clean();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.obtain("long").await.unwrap().as_deref(), Some("2"));

        cache.clear();
        assert!(cache.is_empty());
    }
}
