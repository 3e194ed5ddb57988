//! Tab operations the host browser provides.

use async_trait::async_trait;
use marktab_core::{CreateProperties, HostError, TabId, TabInfo};
use std::sync::Arc;

/// Host tabs capability. Every call may fail; callers decide which failures
/// matter.
#[async_trait]
pub trait TabsApi: Send + Sync {
    async fn create(&self, props: CreateProperties) -> Result<TabInfo, HostError>;

    /// Fails with [`HostError::NoHistory`] when there is nothing to go back to.
    async fn go_back(&self, tab: TabId) -> Result<(), HostError>;

    async fn get(&self, tab: TabId) -> Result<TabInfo, HostError>;

    /// Navigate `tab` to `url`.
    async fn update_url(&self, tab: TabId, url: &str) -> Result<(), HostError>;

    async fn remove(&self, tab: TabId) -> Result<(), HostError>;
}

pub type SharedTabs = Arc<dyn TabsApi>;
