//! In-process browser used by tests and the simulator tool.
//!
//! Tabs keep a back/forward history. Host calls are recorded so callers can
//! assert what the background did, and tab creation/removal queue the events
//! a real host would deliver.

use crate::host::TabsApi;
use crate::service::HostEvent;
use async_trait::async_trait;
use marktab_common::SharedClock;
use marktab_core::{
    CreateProperties, FrameId, HostError, NavigationCommitted, TabId, TabInfo, TransitionType,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use url::Url;

/// A call the background made into the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum HostCall {
    Create { url: String, active: bool },
    GoBack { tab: TabId },
    Get { tab: TabId },
    Update { tab: TabId, url: String },
    Remove { tab: TabId },
}

#[derive(Debug, Clone)]
struct SimTab {
    history: Vec<String>,
    index: usize,
    pending_url: Option<String>,
    active: bool,
}

impl SimTab {
    fn new(url: &str, active: bool) -> Self {
        Self {
            history: vec![url.to_string()],
            index: 0,
            pending_url: None,
            active,
        }
    }

    fn url(&self) -> &str {
        &self.history[self.index]
    }

    fn push(&mut self, url: &str) {
        self.history.truncate(self.index + 1);
        self.history.push(url.to_string());
        self.index = self.history.len() - 1;
        self.pending_url = None;
    }

    fn info(&self, id: TabId) -> TabInfo {
        TabInfo {
            id: Some(id),
            url: Some(self.url().to_string()),
            pending_url: self.pending_url.clone(),
            active: self.active,
        }
    }
}

#[derive(Debug, Default)]
struct SimState {
    next_id: u64,
    tabs: BTreeMap<TabId, SimTab>,
    calls: Vec<HostCall>,
    events: Vec<HostEvent>,
    fail_create: bool,
    locked: Vec<TabId>,
}

impl SimState {
    fn allocate(&mut self) -> TabId {
        self.next_id += 1;
        TabId(self.next_id)
    }

    fn tab_mut(&mut self, tab: TabId) -> Result<&mut SimTab, HostError> {
        self.tabs.get_mut(&tab).ok_or(HostError::NoSuchTab(tab.0))
    }

    fn check_unlocked(&self, tab: TabId) -> Result<(), HostError> {
        if self.locked.contains(&tab) {
            return Err(HostError::Forbidden(format!("tab {tab} is locked")));
        }
        Ok(())
    }

    fn open(&mut self, url: &str, active: bool) -> (TabId, TabInfo) {
        let id = self.allocate();
        if active {
            self.tabs.values_mut().for_each(|t| t.active = false);
        }
        let tab = SimTab::new(url, active);
        let info = tab.info(id);
        self.events.push(HostEvent::TabCreated(info.clone()));
        self.tabs.insert(id, tab);
        (id, info)
    }
}

pub struct SimBrowser {
    clock: SharedClock,
    state: Mutex<SimState>,
}

impl SimBrowser {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            state: Mutex::new(SimState::default()),
        }
    }

    /// Open a tab the way a user would, queueing its created event.
    pub async fn open_tab(&self, url: &str) -> TabId {
        self.state.lock().await.open(url, true).0
    }

    /// Add a tab with existing history without queueing any event.
    ///
    /// Later allocated ids stay above `id`.
    pub async fn insert_tab(&self, id: TabId, history: &[&str]) {
        let mut state = self.state.lock().await;
        let mut tab = SimTab::new(history.first().copied().unwrap_or(""), false);
        for url in history.iter().skip(1) {
            tab.push(url);
        }
        state.tabs.insert(id, tab);
        state.next_id = state.next_id.max(id.0);
    }

    /// Commit a navigation in `tab` and return the event the host would
    /// deliver.
    pub async fn navigate(
        &self,
        tab: TabId,
        url: &str,
        transition_type: TransitionType,
    ) -> Result<NavigationCommitted, HostError> {
        let mut state = self.state.lock().await;
        state.tab_mut(tab)?.push(url);
        Ok(NavigationCommitted {
            tab_id: tab,
            url: url.to_string(),
            transition_type,
            frame_id: FrameId::TOP,
            time_stamp: self.clock.now_ms(),
        })
    }

    /// Close a tab the way a user would, queueing its removed event.
    pub async fn close_tab(&self, tab: TabId) -> Result<(), HostError> {
        let mut state = self.state.lock().await;
        state.tabs.remove(&tab).ok_or(HostError::NoSuchTab(tab.0))?;
        state.events.push(HostEvent::TabRemoved(tab));
        Ok(())
    }

    /// Give `tab` an uncommitted navigation.
    pub async fn set_pending_url(&self, tab: TabId, url: Option<&str>) -> Result<(), HostError> {
        let mut state = self.state.lock().await;
        state.tab_mut(tab)?.pending_url = url.map(str::to_string);
        Ok(())
    }

    /// Make every create call fail.
    pub async fn set_fail_create(&self, fail: bool) {
        self.state.lock().await.fail_create = fail;
    }

    /// Refuse update and remove calls on `tab`, like a privileged page.
    pub async fn lock_tab(&self, tab: TabId) {
        self.state.lock().await.locked.push(tab);
    }

    /// Drain the events queued since the last call.
    pub async fn take_events(&self) -> Vec<HostEvent> {
        std::mem::take(&mut self.state.lock().await.events)
    }

    pub async fn calls(&self) -> Vec<HostCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn tab(&self, tab: TabId) -> Option<TabInfo> {
        self.state.lock().await.tabs.get(&tab).map(|t| t.info(tab))
    }

    pub async fn tabs(&self) -> Vec<TabInfo> {
        let state = self.state.lock().await;
        state.tabs.iter().map(|(id, t)| t.info(*id)).collect()
    }

    pub async fn history(&self, tab: TabId) -> Option<Vec<String>> {
        let state = self.state.lock().await;
        state.tabs.get(&tab).map(|t| t.history[..=t.index].to_vec())
    }
}

#[async_trait]
impl TabsApi for SimBrowser {
    async fn create(&self, props: CreateProperties) -> Result<TabInfo, HostError> {
        let mut state = self.state.lock().await;
        state.calls.push(HostCall::Create {
            url: props.url.clone(),
            active: props.active,
        });
        if state.fail_create {
            return Err(HostError::Forbidden("tab creation disabled".into()));
        }
        Url::parse(&props.url).map_err(|_| HostError::InvalidUrl(props.url.clone()))?;

        Ok(state.open(&props.url, props.active).1)
    }

    async fn go_back(&self, tab: TabId) -> Result<(), HostError> {
        let mut state = self.state.lock().await;
        state.calls.push(HostCall::GoBack { tab });
        let entry = state.tab_mut(tab)?;
        if entry.index == 0 {
            return Err(HostError::NoHistory);
        }
        entry.index -= 1;
        entry.pending_url = None;
        Ok(())
    }

    async fn get(&self, tab: TabId) -> Result<TabInfo, HostError> {
        let mut state = self.state.lock().await;
        state.calls.push(HostCall::Get { tab });
        state.tab_mut(tab).map(|t| t.info(tab))
    }

    async fn update_url(&self, tab: TabId, url: &str) -> Result<(), HostError> {
        let mut state = self.state.lock().await;
        state.calls.push(HostCall::Update {
            tab,
            url: url.to_string(),
        });
        state.check_unlocked(tab)?;
        state.tab_mut(tab)?.push(url);
        Ok(())
    }

    async fn remove(&self, tab: TabId) -> Result<(), HostError> {
        let mut state = self.state.lock().await;
        state.calls.push(HostCall::Remove { tab });
        state.check_unlocked(tab)?;
        state.tabs.remove(&tab).ok_or(HostError::NoSuchTab(tab.0))?;
        state.events.push(HostEvent::TabRemoved(tab));
        Ok(())
    }
}
