//! Tracks tabs the host created within the last few seconds.
//!
//! When several bookmarks are opened at once (a folder, a tab group, a
//! middle-click batch) the host already puts each one in a new tab. A bookmark
//! navigation inside such a fresh tab must be left alone.

use crate::session::SessionState;
use marktab_core::{MarkTabResult, TabId, TabInfo};
use std::time::Duration;
use tracing::trace;

#[derive(Clone)]
pub struct TabLifecycleTracker {
    session: SessionState,
    ttl: Duration,
}

impl TabLifecycleTracker {
    pub fn new(session: SessionState, ttl: Duration) -> Self {
        Self { session, ttl }
    }

    /// Handle a tab-created event. Tabs without an id are ignored.
    pub async fn on_tab_created(&self, tab: &TabInfo) -> MarkTabResult<()> {
        let Some(id) = tab.id else {
            trace!("Created tab has no id, not tracking");
            return Ok(());
        };
        self.session.ensure().await?;
        self.session.gc().await?;
        self.mark_just_created(id).await
    }

    /// Handle a tab-removed event.
    pub async fn on_tab_removed(&self, id: TabId) -> MarkTabResult<()> {
        if self.session.just_created().delete(&id.to_string()).await? {
            trace!(tab = %id, "Removed tab dropped from just-created set");
        }
        Ok(())
    }

    pub async fn mark_just_created(&self, id: TabId) -> MarkTabResult<()> {
        trace!(tab = %id, ttl_ms = self.ttl.as_millis() as u64, "Marking tab just created");
        self.session
            .just_created()
            .set(&id.to_string(), self.ttl)
            .await
    }

    pub async fn is_just_created(&self, id: TabId) -> MarkTabResult<bool> {
        self.session.just_created().has(&id.to_string()).await
    }
}
