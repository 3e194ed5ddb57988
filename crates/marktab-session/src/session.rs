//! The two bookkeeping maps the background keeps in session storage.

use crate::expiring::ExpiringMap;
use crate::storage::SharedArea;
use marktab_common::SharedClock;
use marktab_core::MarkTabResult;

/// Session key of the just-created tab map (stringified tab id to expiry).
pub const JUST_CREATED_KEY: &str = "justCreated";

/// Session key of the handled-navigation map (dedup key to expiry).
pub const IGNORE_MAP_KEY: &str = "ignoreMap";

/// Handles to both bookkeeping maps of one session area.
#[derive(Clone)]
pub struct SessionState {
    just_created: ExpiringMap,
    ignore: ExpiringMap,
}

impl SessionState {
    pub fn new(area: SharedArea, clock: SharedClock) -> Self {
        Self {
            just_created: ExpiringMap::new(area.clone(), JUST_CREATED_KEY, clock.clone()),
            ignore: ExpiringMap::new(area, IGNORE_MAP_KEY, clock),
        }
    }

    pub fn just_created(&self) -> &ExpiringMap {
        &self.just_created
    }

    pub fn ignore(&self) -> &ExpiringMap {
        &self.ignore
    }

    /// Make sure both maps exist, so a freshly started process sees empty
    /// structures instead of missing keys.
    pub async fn ensure(&self) -> MarkTabResult<()> {
        self.just_created.ensure().await?;
        self.ignore.ensure().await
    }

    /// Collect expired entries from both maps.
    pub async fn gc(&self) -> MarkTabResult<usize> {
        Ok(self.just_created.gc().await? + self.ignore.gc().await?)
    }
}
