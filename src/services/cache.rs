//! Redis read-through cache for assembled learner dashboards.
//!
//! Cache failures never fail a request: errors are logged and treated as a miss.

use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

const KEY_PREFIX: &str = "learnhub:dashboard";

#[derive(Debug, Clone)]
pub struct DashboardCache {
    client: Option<redis::Client>,
    ttl_secs: u64,
}

impl DashboardCache {
    /// Build the cache. A TTL of 0 or an unparsable URL disables caching.
    pub fn new(redis_url: &str, ttl_secs: u64) -> Self {
        if ttl_secs == 0 {
            tracing::info!("Dashboard cache disabled (TTL is 0)");
            return Self::disabled();
        }
        match redis::Client::open(redis_url) {
            Ok(client) => Self {
                client: Some(client),
                ttl_secs,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Invalid Redis URL, dashboard cache disabled");
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self {
            client: None,
            ttl_secs: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Resolve the slot a user's dashboard is cached under. The slot pins the
    /// current generation, so a value assembled before an invalidation is
    /// written under a key no later reader looks up. `None` when caching is off
    /// or Redis is unreachable.
    pub async fn slot(&self, user_id: Uuid) -> Option<CacheSlot> {
        let client = self.client.as_ref()?;
        match read_generation(client, CacheSlot::generation_key(user_id)).await {
            Ok(generation) => Some(CacheSlot {
                user_id,
                generation,
            }),
            Err(e) => {
                tracing::warn!(error = %e, %user_id, "Dashboard cache generation read failed");
                None
            }
        }
    }

    /// Fetch and decode a cached value.
    pub async fn get<T: DeserializeOwned>(&self, slot: &CacheSlot) -> Option<T> {
        let client = self.client.as_ref()?;
        let raw = match read_entry(client, slot.key()).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, user_id = %slot.user_id, "Dashboard cache read failed");
                return None;
            }
        };

        raw.and_then(|json| match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(error = %e, user_id = %slot.user_id, "Discarding undecodable cache entry");
                None
            }
        })
    }

    /// Store a value with the configured TTL.
    pub async fn put<T: Serialize>(&self, slot: &CacheSlot, value: &T) {
        let Some(client) = self.client.as_ref() else {
            return;
        };
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode dashboard for cache");
                return;
            }
        };
        if let Err(e) = write_entry(client, slot.key(), json, self.ttl_secs).await {
            tracing::warn!(error = %e, user_id = %slot.user_id, "Dashboard cache write failed");
        }
    }

    /// Retire a user's cached dashboard after their progress changes. Bumping
    /// the generation orphans every earlier entry, including one still being
    /// assembled from pre-change data; orphans age out with their TTL.
    pub async fn invalidate(&self, user_id: Uuid) {
        let Some(client) = self.client.as_ref() else {
            return;
        };
        if let Err(e) = bump_generation(client, CacheSlot::generation_key(user_id)).await {
            tracing::warn!(error = %e, %user_id, "Dashboard cache invalidation failed");
        }
    }
}

/// A user's dashboard key at one cache generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSlot {
    pub user_id: Uuid,
    pub generation: u64,
}

impl CacheSlot {
    pub fn key(&self) -> String {
        format!("{KEY_PREFIX}:{}:v{}", self.user_id, self.generation)
    }

    pub fn generation_key(user_id: Uuid) -> String {
        format!("{KEY_PREFIX}:{user_id}:generation")
    }
}

async fn read_generation(client: &redis::Client, key: String) -> redis::RedisResult<u64> {
    let mut conn = client.get_multiplexed_async_connection().await?;
    let generation: Option<u64> = conn.get(key).await?;
    Ok(generation.unwrap_or(0))
}

async fn bump_generation(client: &redis::Client, key: String) -> redis::RedisResult<()> {
    let mut conn = client.get_multiplexed_async_connection().await?;
    let _: u64 = conn.incr(key, 1u64).await?;
    Ok(())
}

async fn read_entry(client: &redis::Client, key: String) -> redis::RedisResult<Option<String>> {
    let mut conn = client.get_multiplexed_async_connection().await?;
    conn.get(key).await
}

async fn write_entry(
    client: &redis::Client,
    key: String,
    json: String,
    ttl_secs: u64,
) -> redis::RedisResult<()> {
    let mut conn = client.get_multiplexed_async_connection().await?;
    conn.set_ex(key, json, ttl_secs).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_ttl_disables_cache() {
        let cache = DashboardCache::new("redis://localhost:6379", 0);
        assert!(!cache.is_enabled());
    }

    #[test]
    fn invalid_url_disables_cache() {
        let cache = DashboardCache::new("not a url", 300);
        assert!(!cache.is_enabled());
    }

    #[test]
    fn keys_are_namespaced_per_user_and_generation() {
        let slot = CacheSlot {
            user_id: Uuid::nil(),
            generation: 3,
        };
        assert_eq!(
            slot.key(),
            "learnhub:dashboard:00000000-0000-0000-0000-000000000000:v3"
        );
        assert_eq!(
            CacheSlot::generation_key(Uuid::nil()),
            "learnhub:dashboard:00000000-0000-0000-0000-000000000000:generation"
        );
    }

    #[test]
    fn next_generation_never_shares_a_key() {
        let before = CacheSlot {
            user_id: Uuid::nil(),
            generation: 0,
        };
        let after = CacheSlot {
            generation: before.generation + 1,
            ..before
        };
        assert_ne!(before.key(), after.key());
    }

    #[test]
    fn disabled_cache_has_no_slot_and_ignores_writes() {
        let cache = DashboardCache::disabled();
        let slot = CacheSlot {
            user_id: Uuid::nil(),
            generation: 0,
        };
        tokio_test::block_on(async {
            assert!(cache.slot(Uuid::nil()).await.is_none());
            cache.put(&slot, &42u32).await;
            cache.invalidate(Uuid::nil()).await;
            let value: Option<u32> = cache.get(&slot).await;
            assert!(value.is_none());
        });
    }
}
