//! Bookmark navigation interception.
//!
//! For a bookmark activated in an existing tab:
//! 1. collect expired bookkeeping
//! 2. skip tabs the host just created (bulk bookmark opens)
//! 3. skip navigations handled within the ignore window, else claim them
//! 4. open the URL in a new tab
//! 5. mark the new tab as just created
//! 6. send the source tab back in its history
//! 7. when it has no history, close it or park it on a blank page

use crate::host::SharedTabs;
use crate::prefs::PreferenceProvider;
use marktab_common::attempt;
use marktab_core::{
    is_empty_like, CreateProperties, MarkTabResult, NavigationCommitted, Preferences, TabId,
    TtlConfig, BLANK_URL,
};
use marktab_session::{SessionState, TabLifecycleTracker};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why an event was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Subframe,
    NotBookmark,
    /// The host opened the bookmark in a fresh tab on its own.
    JustCreated,
    /// The same navigation was handled moments ago.
    Duplicate,
}

/// What happened to the source tab after the new tab opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceDisposition {
    WentBack,
    Closed,
    Blanked,
    /// Already empty, closing disabled.
    Untouched,
    /// A cleanup call failed and was ignored.
    CleanupFailed,
}

/// Result of handling one navigation-committed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InterceptOutcome {
    Skipped { reason: SkipReason },
    /// The new tab could not be opened; nothing else was attempted.
    CreateFailed,
    Redirected {
        new_tab: Option<TabId>,
        source: SourceDisposition,
    },
}

/// Key under which a handled navigation is remembered.
pub fn dedup_key(tab: TabId, url: &str) -> String {
    format!("src:{tab}|url:{url}")
}

pub struct NavigationInterceptor {
    session: SessionState,
    tracker: TabLifecycleTracker,
    tabs: SharedTabs,
    prefs: Arc<dyn PreferenceProvider>,
    ttl: TtlConfig,
}

impl NavigationInterceptor {
    pub fn new(
        session: SessionState,
        tabs: SharedTabs,
        prefs: Arc<dyn PreferenceProvider>,
        ttl: TtlConfig,
    ) -> Self {
        let tracker = TabLifecycleTracker::new(session.clone(), ttl.just_created);
        Self {
            session,
            tracker,
            tabs,
            prefs,
            ttl,
        }
    }

    pub fn tracker(&self) -> &TabLifecycleTracker {
        &self.tracker
    }

    /// Handle one navigation-committed event.
    ///
    /// Only storage failures are returned as errors. Host failures are part
    /// of the outcome.
    pub async fn on_committed(&self, details: &NavigationCommitted) -> MarkTabResult<InterceptOutcome> {
        if !details.frame_id.is_top() {
            return Ok(skipped(SkipReason::Subframe));
        }
        if !details.transition_type.is_bookmark() {
            return Ok(skipped(SkipReason::NotBookmark));
        }

        let source = details.tab_id;
        let url = details.url.as_str();

        self.session.ensure().await?;
        self.session.gc().await?;

        if self.tracker.is_just_created(source).await? {
            debug!(tab = %source, url, "Bookmark opened in a fresh tab, leaving it");
            return Ok(skipped(SkipReason::JustCreated));
        }

        // Claim the navigation before the first host call. A duplicate
        // delivery that read the map before this write still gets through.
        let key = dedup_key(source, url);
        if self.session.ignore().has(&key).await? {
            debug!(tab = %source, url, "Navigation already handled");
            return Ok(skipped(SkipReason::Duplicate));
        }
        self.session.ignore().set(&key, self.ttl.ignore).await?;

        let prefs = self.prefs.preferences().await;
        let props = CreateProperties {
            url: url.to_string(),
            active: !prefs.open_in_background,
        };
        let created = match self.tabs.create(props).await {
            Ok(tab) => tab,
            Err(e) => {
                warn!(tab = %source, url, error = %e, "Could not open bookmark in a new tab");
                return Ok(InterceptOutcome::CreateFailed);
            }
        };
        if let Some(id) = created.id {
            self.tracker.mark_just_created(id).await?;
        }

        let disposition = match self.tabs.go_back(source).await {
            Ok(()) => SourceDisposition::WentBack,
            Err(e) => {
                debug!(tab = %source, reason = %e, "Source tab cannot go back");
                self.settle_source(source, &prefs).await
            }
        };

        info!(
            source = %source,
            new_tab = ?created.id,
            url,
            background = prefs.open_in_background,
            disposition = ?disposition,
            "Bookmark moved to a new tab"
        );
        Ok(InterceptOutcome::Redirected {
            new_tab: created.id,
            source: disposition,
        })
    }

    /// Dispose of a source tab that has no history. Every failure here is
    /// ignored.
    async fn settle_source(&self, source: TabId, prefs: &Preferences) -> SourceDisposition {
        let Some(tab) = attempt("get source tab", self.tabs.get(source)).await else {
            return SourceDisposition::CleanupFailed;
        };
        let current = tab.current_url();

        if is_empty_like(current) {
            if !prefs.close_empty_source_tab {
                return SourceDisposition::Untouched;
            }
            return match attempt("close source tab", self.tabs.remove(source)).await {
                Some(()) => SourceDisposition::Closed,
                None => SourceDisposition::CleanupFailed,
            };
        }

        // about:blank rather than the new tab page, which may be privileged.
        match attempt("blank source tab", self.tabs.update_url(source, BLANK_URL)).await {
            Some(()) => SourceDisposition::Blanked,
            None => SourceDisposition::CleanupFailed,
        }
    }
}

fn skipped(reason: SkipReason) -> InterceptOutcome {
    InterceptOutcome::Skipped { reason }
}
