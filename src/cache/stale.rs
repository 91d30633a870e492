//! Serves the last known good snapshot: as a placeholder at session start and as a fallback
//! while the provider is rate limiting us.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::SnapshotStore;
use super::models::CacheEntry;
use crate::config::{AccountRef, SessionIdentity};
use crate::models::CombinedSnapshot;

pub struct StaleCache {
    store: Option<Arc<dyn SnapshotStore>>,
    key: String,
    max_age: Duration,
    last_good: Option<CombinedSnapshot>,
    last_saved: Option<CombinedSnapshot>,
}

impl StaleCache {
    pub fn new(store: Option<Arc<dyn SnapshotStore>>, key: String, max_age: Duration) -> Self {
        Self {
            store,
            key,
            max_age,
            last_good: None,
            last_saved: None,
        }
    }

    /// `overlay:{region}:{account}:{first 8 chars of the key}`.
    pub fn cache_key(identity: &SessionIdentity) -> String {
        let account = match &identity.account {
            AccountRef::Puuid(puuid) => puuid.to_lowercase(),
            riot_id @ AccountRef::RiotId { .. } => riot_id.to_string().to_lowercase(),
        };
        let key_fragment: String = identity.api_key.chars().take(8).collect();

        format!("overlay:{}:{account}:{key_fragment}", identity.region)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the persisted snapshot, if any, younger than the max age and saved after
    /// `day_start_ms`.
    pub async fn load(&mut self, now_ms: i64, day_start_ms: i64) -> Option<CombinedSnapshot> {
        let store = self.store.as_ref()?;

        let raw = match store.get(&self.key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key = %self.key, error = %e, "💾 Snapshot store unavailable, continuing in memory");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %self.key, error = %e, "💾 Ignoring undecodable cache entry");
                return None;
            }
        };

        let age_ms = now_ms.saturating_sub(entry.timestamp);
        if age_ms >= self.max_age.as_millis() as i64 {
            debug!(key = %self.key, age_ms, "💾 Cached snapshot expired");
            return None;
        }
        if entry.timestamp < day_start_ms {
            debug!(key = %self.key, "💾 Cached snapshot is from a previous day");
            return None;
        }

        self.last_good = Some(entry.data.clone());
        self.last_saved = Some(entry.data.clone());

        Some(entry.data)
    }

    /// Keep `snapshot` in memory as the fallback for rate-limited ticks.
    pub fn remember(&mut self, snapshot: &CombinedSnapshot) {
        self.last_good = Some(snapshot.clone());
    }

    /// Drop the in-memory fallback, e.g. once its totals belong to a past day.
    pub fn forget(&mut self) {
        self.last_good = None;
    }

    /// Persist a snapshot from a fully successful tick. Unchanged snapshots are not rewritten.
    pub async fn save(&mut self, snapshot: &CombinedSnapshot, now_ms: i64) {
        self.remember(snapshot);

        if self.last_saved.as_ref() == Some(snapshot) {
            return;
        }
        let Some(store) = &self.store else {
            return;
        };

        let entry = CacheEntry {
            timestamp: now_ms,
            data: snapshot.clone(),
        };
        let value = match serde_json::to_string(&entry) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %self.key, error = %e, "💾 Failed to encode snapshot");
                return;
            }
        };

        match store.set(&self.key, &value).await {
            Ok(()) => {
                debug!(key = %self.key, "💾 Snapshot saved");
                self.last_saved = Some(snapshot.clone());
            }
            Err(e) => warn!(key = %self.key, error = %e, "💾 Failed to persist snapshot"),
        }
    }

    /// Snapshot to republish while rate limited, if one is known.
    pub fn on_rate_limited(&self) -> Option<CombinedSnapshot> {
        self.last_good.clone()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::cache::{MemoryStore, StoreError};
    use crate::henrik::Region;

    const MAX_AGE: Duration = Duration::from_secs(30 * 60);
    const NOW: i64 = 1_714_550_400_000;
    const DAY_START: i64 = NOW - 8 * 60 * 60 * 1000;

    struct BrokenStore;

    #[async_trait]
    impl SnapshotStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err("storage disabled".into())
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err("storage disabled".into())
        }
    }

    fn snapshot(wins: u32) -> CombinedSnapshot {
        CombinedSnapshot {
            wins,
            losses: 1,
            kills: 30,
            deaths: 20,
            current_points: Some(50),
            ..Default::default()
        }
    }

    fn cache(store: Arc<dyn SnapshotStore>) -> StaleCache {
        StaleCache::new(Some(store), "overlay:eu:p:k".into(), MAX_AGE)
    }

    #[test]
    fn key_depends_on_region_account_and_key_prefix() {
        let identity = SessionIdentity {
            api_key: "HDEV-1234567890".into(),
            region: Region::Na,
            account: AccountRef::RiotId {
                name: "Le Joueur".into(),
                tag: "EUW".into(),
            },
        };
        assert_eq!(StaleCache::cache_key(&identity), "overlay:na:le joueur#euw:HDEV-123");

        let identity = SessionIdentity {
            account: AccountRef::Puuid("ABC-def".into()),
            ..identity
        };
        assert_eq!(StaleCache::cache_key(&identity), "overlay:na:abc-def:HDEV-123");
    }

    #[tokio::test]
    async fn saved_snapshot_is_loaded_back_while_fresh() {
        let store = Arc::new(MemoryStore::default());
        cache(store.clone()).save(&snapshot(2), NOW).await;

        let mut fresh = cache(store.clone());
        assert_eq!(fresh.load(NOW + 60_000, DAY_START).await, Some(snapshot(2)));
        assert_eq!(fresh.on_rate_limited(), Some(snapshot(2)));

        let mut expired = cache(store);
        assert_eq!(expired.load(NOW + MAX_AGE.as_millis() as i64, DAY_START).await, None);
        assert_eq!(expired.on_rate_limited(), None);
    }

    #[tokio::test]
    async fn entry_from_before_midnight_is_not_loaded() {
        let store = Arc::new(MemoryStore::default());
        cache(store.clone()).save(&snapshot(2), NOW - 60_000).await;

        let mut next_day = cache(store);
        assert_eq!(next_day.load(NOW + 60_000, NOW).await, None);
        assert_eq!(next_day.on_rate_limited(), None);
    }

    #[test]
    fn forget_drops_the_fallback() {
        let mut cache = StaleCache::new(None, "k".into(), MAX_AGE);
        cache.remember(&snapshot(5));

        cache.forget();
        assert_eq!(cache.on_rate_limited(), None);
    }

    #[tokio::test]
    async fn entry_uses_timestamp_and_data_fields() {
        let store = Arc::new(MemoryStore::default());
        cache(store.clone()).save(&snapshot(1), NOW).await;

        let raw = store.get("overlay:eu:p:k").await.unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(json["timestamp"], NOW);
        assert_eq!(json["data"]["wins"], 1);
        assert_eq!(json["data"]["currentPoints"], 50);
    }

    #[tokio::test]
    async fn unchanged_snapshot_is_not_rewritten() {
        let store = Arc::new(MemoryStore::default());
        let mut cache = cache(store.clone());

        cache.save(&snapshot(1), NOW).await;
        cache.save(&snapshot(1), NOW + 10_000).await;
        assert_eq!(store.writes(), 1);

        cache.save(&snapshot(2), NOW + 20_000).await;
        assert_eq!(store.writes(), 2);
    }

    #[tokio::test]
    async fn undecodable_entry_is_ignored() {
        let store = Arc::new(MemoryStore::default());
        store.set("overlay:eu:p:k", "{not json").await.unwrap();

        assert_eq!(cache(store).load(NOW, DAY_START).await, None);
    }

    #[tokio::test]
    async fn broken_storage_degrades_to_memory() {
        let mut cache = cache(Arc::new(BrokenStore));

        assert_eq!(cache.load(NOW, DAY_START).await, None);
        cache.save(&snapshot(3), NOW).await;

        assert_eq!(cache.on_rate_limited(), Some(snapshot(3)));
    }

    #[tokio::test]
    async fn works_without_any_store() {
        let mut cache = StaleCache::new(None, "k".into(), MAX_AGE);

        assert_eq!(cache.load(NOW, DAY_START).await, None);
        cache.remember(&snapshot(4));
        assert_eq!(cache.on_rate_limited(), Some(snapshot(4)));
    }
}
