//! Event routing for the background.

use crate::host::SharedTabs;
use crate::interceptor::{InterceptOutcome, NavigationInterceptor};
use crate::prefs::PreferenceProvider;
use marktab_common::{SharedClock, SystemClock};
use marktab_core::{MarkTabResult, NavigationCommitted, NavigationFilter, TabId, TabInfo, TtlConfig};
use marktab_session::{MemoryArea, SessionState, SharedArea, TabLifecycleTracker};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, trace};

/// Events the host delivers to the background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details", rename_all = "camelCase")]
pub enum HostEvent {
    TabCreated(TabInfo),
    TabRemoved(TabId),
    NavigationCommitted(NavigationCommitted),
}

/// The background: one tracker and one interceptor over shared session
/// storage. Cloning is cheap and clones share everything.
#[derive(Clone)]
pub struct BackgroundService {
    tracker: TabLifecycleTracker,
    interceptor: Arc<NavigationInterceptor>,
    filter: NavigationFilter,
}

impl BackgroundService {
    pub fn builder(tabs: SharedTabs, prefs: Arc<dyn PreferenceProvider>) -> BackgroundBuilder {
        BackgroundBuilder::new(tabs, prefs)
    }

    pub fn tracker(&self) -> &TabLifecycleTracker {
        &self.tracker
    }

    /// Whether navigation events for `url` are delivered at all.
    pub fn accepts(&self, url: &str) -> bool {
        self.filter.allows(url)
    }

    /// Handle one event to completion.
    ///
    /// Returns the interception outcome for navigation events that pass the
    /// scheme filter, `None` for everything else.
    pub async fn handle(&self, event: HostEvent) -> MarkTabResult<Option<InterceptOutcome>> {
        match event {
            HostEvent::TabCreated(tab) => {
                self.tracker.on_tab_created(&tab).await?;
                Ok(None)
            }
            HostEvent::TabRemoved(id) => {
                self.tracker.on_tab_removed(id).await?;
                Ok(None)
            }
            HostEvent::NavigationCommitted(details) => {
                if !self.accepts(&details.url) {
                    trace!(url = %details.url, "Scheme filtered out");
                    return Ok(None);
                }
                self.interceptor.on_committed(&details).await.map(Some)
            }
        }
    }

    /// Handle one event, logging instead of returning failures. One failed
    /// event never affects the next.
    pub async fn dispatch(&self, event: HostEvent) -> Option<InterceptOutcome> {
        match self.handle(event).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Event handler failed");
                None
            }
        }
    }

    /// Consume events until the sender side closes.
    ///
    /// Each event runs as its own task, so handlers interleave at their await
    /// points the way host callbacks do. Returns once every spawned handler
    /// has finished.
    pub async fn run(self, mut events: mpsc::UnboundedReceiver<HostEvent>) {
        let mut handlers = JoinSet::new();
        while let Some(event) = events.recv().await {
            let service = self.clone();
            handlers.spawn(async move { service.dispatch(event).await });
        }
        debug!(pending = handlers.len(), "Event channel closed, draining handlers");
        while let Some(joined) = handlers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Event handler task panicked");
            }
        }
    }
}

/// Builder for [`BackgroundService`].
pub struct BackgroundBuilder {
    tabs: SharedTabs,
    prefs: Arc<dyn PreferenceProvider>,
    session_area: Option<SharedArea>,
    clock: Option<SharedClock>,
    ttl: TtlConfig,
    filter: NavigationFilter,
}

impl BackgroundBuilder {
    pub fn new(tabs: SharedTabs, prefs: Arc<dyn PreferenceProvider>) -> Self {
        Self {
            tabs,
            prefs,
            session_area: None,
            clock: None,
            ttl: TtlConfig::default(),
            filter: NavigationFilter::default(),
        }
    }

    /// Session storage holding the bookkeeping maps. Defaults to a fresh
    /// in-memory area.
    pub fn session_area(mut self, area: SharedArea) -> Self {
        self.session_area = Some(area);
        self
    }

    /// Defaults to the system clock.
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn ttl(mut self, ttl: TtlConfig) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn filter(mut self, filter: NavigationFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn build(self) -> BackgroundService {
        let area = self
            .session_area
            .unwrap_or_else(|| Arc::new(MemoryArea::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let session = SessionState::new(area, clock);
        let interceptor = NavigationInterceptor::new(session, self.tabs, self.prefs, self.ttl);

        BackgroundService {
            tracker: interceptor.tracker().clone(),
            interceptor: Arc::new(interceptor),
            filter: self.filter,
        }
    }
}
