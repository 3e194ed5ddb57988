//! Preferences persisted in the sync area.

use crate::storage::SharedArea;
use marktab_core::config::{CLOSE_EMPTY_SOURCE_TAB_KEY, OPEN_IN_BACKGROUND_KEY};
use marktab_core::{MarkTabResult, Preferences};
use serde_json::Value;
use tracing::debug;

/// Reads and writes the two toggles, one storage key each.
#[derive(Clone)]
pub struct PreferenceStore {
    area: SharedArea,
}

impl PreferenceStore {
    pub fn new(area: SharedArea) -> Self {
        Self { area }
    }

    /// Stored values, falling back to `false` for anything missing or not a
    /// boolean.
    pub async fn load(&self) -> MarkTabResult<Preferences> {
        Ok(Preferences {
            open_in_background: self.flag(OPEN_IN_BACKGROUND_KEY).await?,
            close_empty_source_tab: self.flag(CLOSE_EMPTY_SOURCE_TAB_KEY).await?,
        })
    }

    pub async fn save(&self, prefs: &Preferences) -> MarkTabResult<()> {
        self.area
            .set(OPEN_IN_BACKGROUND_KEY, Value::Bool(prefs.open_in_background))
            .await?;
        self.area
            .set(
                CLOSE_EMPTY_SOURCE_TAB_KEY,
                Value::Bool(prefs.close_empty_source_tab),
            )
            .await?;
        debug!(?prefs, "Preferences saved");
        Ok(())
    }

    async fn flag(&self, key: &str) -> MarkTabResult<bool> {
        Ok(match self.area.get(key).await? {
            Some(Value::Bool(value)) => value,
            Some(other) => {
                debug!(key, value = %other, "Ignoring non-boolean preference");
                false
            }
            None => false,
        })
    }
}
