//! Where the interceptor gets its preferences from.

use async_trait::async_trait;
use marktab_core::Preferences;
use marktab_session::PreferenceStore;
use tracing::warn;

/// Supplies a complete preference record. Asked once per handled navigation,
/// never cached.
#[async_trait]
pub trait PreferenceProvider: Send + Sync {
    async fn preferences(&self) -> Preferences;
}

#[async_trait]
impl PreferenceProvider for PreferenceStore {
    async fn preferences(&self) -> Preferences {
        self.load().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read preferences, using defaults");
            Preferences::default()
        })
    }
}

/// Fixed preferences.
#[async_trait]
impl PreferenceProvider for Preferences {
    async fn preferences(&self) -> Preferences {
        *self
    }
}
