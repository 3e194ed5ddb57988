//! TTL map persisted under a single storage key.
//!
//! Each entry maps a string key to an absolute expiry in milliseconds since
//! the epoch. An entry whose expiry is at or before the current time is
//! treated as absent, whether or not it has been collected yet.

use crate::storage::SharedArea;
use marktab_common::SharedClock;
use marktab_core::MarkTabResult;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{trace, warn};

/// Stored form of the map: key to expiry.
pub type Entries = BTreeMap<String, u64>;

/// Expiring key set backed by one key of a storage area.
///
/// Every operation is one read-modify-write round trip. Two callers that read
/// before either writes can both act on the same stale view; callers accept
/// that instead of locking.
#[derive(Clone)]
pub struct ExpiringMap {
    area: SharedArea,
    storage_key: &'static str,
    clock: SharedClock,
}

impl ExpiringMap {
    pub fn new(area: SharedArea, storage_key: &'static str, clock: SharedClock) -> Self {
        Self {
            area,
            storage_key,
            clock,
        }
    }

    /// Write an empty map if nothing is stored yet.
    pub async fn ensure(&self) -> MarkTabResult<()> {
        if self.area.get(self.storage_key).await?.is_none() {
            self.store(&Entries::new()).await?;
        }
        Ok(())
    }

    /// Record `key` as present until now + `ttl`.
    pub async fn set(&self, key: &str, ttl: Duration) -> MarkTabResult<()> {
        let now = self.clock.now_ms();
        let mut entries = self.load().await?;
        prune(&mut entries, now);
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        entries.insert(key.to_string(), now.saturating_add(ttl_ms));
        self.store(&entries).await
    }

    /// Whether `key` has an expiry strictly in the future.
    pub async fn has(&self, key: &str) -> MarkTabResult<bool> {
        let now = self.clock.now_ms();
        let entries = self.load().await?;
        Ok(entries.get(key).is_some_and(|&expiry| expiry > now))
    }

    /// Drop `key` regardless of its expiry. Returns whether it was stored.
    pub async fn delete(&self, key: &str) -> MarkTabResult<bool> {
        let mut entries = self.load().await?;
        if entries.remove(key).is_none() {
            return Ok(false);
        }
        self.store(&entries).await?;
        Ok(true)
    }

    /// Remove every expired entry, returning how many were removed.
    ///
    /// Storage is only written when something was removed.
    pub async fn gc(&self) -> MarkTabResult<usize> {
        let now = self.clock.now_ms();
        let mut entries = self.load().await?;
        let removed = prune(&mut entries, now);
        if removed > 0 {
            trace!(key = self.storage_key, removed, "Collected expired entries");
            self.store(&entries).await?;
        }
        Ok(removed)
    }

    async fn load(&self) -> MarkTabResult<Entries> {
        let Some(value) = self.area.get(self.storage_key).await? else {
            return Ok(Entries::new());
        };
        match serde_json::from_value(value) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(key = self.storage_key, error = %e, "Discarding malformed stored map");
                Ok(Entries::new())
            }
        }
    }

    async fn store(&self, entries: &Entries) -> MarkTabResult<()> {
        self.area
            .set(self.storage_key, serde_json::to_value(entries)?)
            .await
    }
}

fn prune(entries: &mut Entries, now: u64) -> usize {
    let before = entries.len();
    entries.retain(|_, expiry| *expiry > now);
    before - entries.len()
}
