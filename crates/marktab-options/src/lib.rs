//! Options page model.
//!
//! Two toggles. Every change is written straight to storage and confirmed by
//! a short-lived status message; there is no save button.

use marktab_common::SharedClock;
use marktab_core::{MarkTabResult, Preferences};
use marktab_session::PreferenceStore;
use std::time::Duration;
use tracing::info;

/// Message shown after a change was stored.
pub const SAVED_MESSAGE: &str = "Saved";

/// How long the status message stays visible.
pub const STATUS_DISPLAY: Duration = Duration::from_millis(1200);

#[derive(Debug, Clone, PartialEq, Eq)]
struct StatusMessage {
    text: &'static str,
    expires_at: u64,
}

pub struct OptionsPage {
    store: PreferenceStore,
    clock: SharedClock,
    current: Preferences,
    status: Option<StatusMessage>,
}

impl OptionsPage {
    pub fn new(store: PreferenceStore, clock: SharedClock) -> Self {
        Self {
            store,
            clock,
            current: Preferences::default(),
            status: None,
        }
    }

    /// Fill both toggles from storage.
    pub async fn load(&mut self) -> MarkTabResult<Preferences> {
        self.current = self.store.load().await?;
        Ok(self.current)
    }

    /// What the toggles currently show.
    pub fn preferences(&self) -> Preferences {
        self.current
    }

    pub async fn set_open_in_background(&mut self, checked: bool) -> MarkTabResult<()> {
        self.current.open_in_background = checked;
        self.save().await
    }

    pub async fn set_close_empty_source_tab(&mut self, checked: bool) -> MarkTabResult<()> {
        self.current.close_empty_source_tab = checked;
        self.save().await
    }

    /// The status message, if it has not faded yet.
    pub fn status(&self) -> Option<&'static str> {
        let now = self.clock.now_ms();
        self.status
            .as_ref()
            .filter(|s| s.expires_at > now)
            .map(|s| s.text)
    }

    // Both toggles are written together, like the page's change handler.
    async fn save(&mut self) -> MarkTabResult<()> {
        self.store.save(&self.current).await?;
        info!(prefs = ?self.current, "Options saved");
        self.status = Some(StatusMessage {
            text: SAVED_MESSAGE,
            expires_at: self.clock.now_ms() + STATUS_DISPLAY.as_millis() as u64,
        });
        Ok(())
    }
}
