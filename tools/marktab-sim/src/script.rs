//! Event scripts and their replay.

use anyhow::{Context, Result};
use marktab_background::{BackgroundService, HostEvent, InterceptOutcome, SimBrowser};
use marktab_common::{Clock, ManualClock};
use marktab_core::{TabId, TabInfo, TransitionType};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// A scripted browser session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    /// Epoch milliseconds the clock starts at.
    #[serde(default)]
    pub start_ms: u64,
    /// Tabs open before the first step, no created events delivered.
    #[serde(default)]
    pub tabs: Vec<InitialTab>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitialTab {
    pub id: TabId,
    pub history: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Step {
    Advance { ms: u64 },
    OpenTab { url: String },
    Bookmark { tab: TabId, url: String },
    Navigate {
        tab: TabId,
        url: String,
        transition: TransitionType,
    },
    CloseTab { tab: TabId },
    /// Deliver a raw host event as is.
    Deliver { event: HostEvent },
}

#[derive(Debug, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub now_ms: u64,
    pub outcomes: Vec<InterceptOutcome>,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub steps: Vec<StepReport>,
    pub tabs: Vec<TabInfo>,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing script {}", path.display()))
    }
}

/// Drives a background instance and the simulated browser through a script.
pub struct Replay {
    clock: Arc<ManualClock>,
    sim: Arc<SimBrowser>,
    service: BackgroundService,
}

impl Replay {
    pub fn new(
        clock: Arc<ManualClock>,
        sim: Arc<SimBrowser>,
        service: BackgroundService,
    ) -> Self {
        Self {
            clock,
            sim,
            service,
        }
    }

    pub async fn run(&self, script: &Script) -> Result<Report> {
        for tab in &script.tabs {
            let history: Vec<&str> = tab.history.iter().map(String::as_str).collect();
            self.sim.insert_tab(tab.id, &history).await;
        }

        let mut steps = Vec::with_capacity(script.steps.len());
        for (index, step) in script.steps.iter().enumerate() {
            let outcomes = self
                .apply(step)
                .await
                .with_context(|| format!("step {index}"))?;
            steps.push(StepReport {
                step: index,
                now_ms: self.clock.now_ms(),
                outcomes,
            });
        }

        Ok(Report {
            steps,
            tabs: self.sim.tabs().await,
        })
    }

    async fn apply(&self, step: &Step) -> Result<Vec<InterceptOutcome>> {
        debug!(?step, "Applying step");
        let mut outcomes = Vec::new();
        match step {
            Step::Advance { ms } => self.clock.advance(Duration::from_millis(*ms)),
            Step::OpenTab { url } => {
                let id = self.sim.open_tab(url).await;
                info!(tab = %id, url, "Opened tab");
            }
            Step::Bookmark { tab, url } => {
                let details = self.sim.navigate(*tab, url, TransitionType::AutoBookmark).await?;
                outcomes.extend(self.deliver(HostEvent::NavigationCommitted(details)).await);
            }
            Step::Navigate {
                tab,
                url,
                transition,
            } => {
                let details = self.sim.navigate(*tab, url, *transition).await?;
                outcomes.extend(self.deliver(HostEvent::NavigationCommitted(details)).await);
            }
            Step::CloseTab { tab } => self.sim.close_tab(*tab).await?,
            Step::Deliver { event } => outcomes.extend(self.deliver(event.clone()).await),
        }

        // Events the host raised while the step ran (tab created/removed).
        for event in self.sim.take_events().await {
            outcomes.extend(self.deliver(event).await);
        }
        Ok(outcomes)
    }

    async fn deliver(&self, event: HostEvent) -> Option<InterceptOutcome> {
        self.service.dispatch(event).await
    }
}
