//! # Bookmark interception scenarios
//!
//! End-to-end runs of the background against the simulated browser with a
//! manual clock.

use marktab_background::{
    BackgroundService, HostCall, HostEvent, InterceptOutcome, SimBrowser, SkipReason,
    SourceDisposition,
};
use async_trait::async_trait;
use marktab_common::ManualClock;
use marktab_core::{
    MarkTabError, MarkTabResult, NavigationCommitted, Preferences, TabId, TabInfo, TransitionType,
};
use marktab_session::{MemoryArea, PreferenceStore, StorageArea};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const START: u64 = 1_700_000_000_000;

struct Harness {
    clock: Arc<ManualClock>,
    sim: Arc<SimBrowser>,
    session: Arc<MemoryArea>,
    service: BackgroundService,
}

fn harness(prefs: Preferences) -> Harness {
    let clock = Arc::new(ManualClock::new(START));
    let sim = Arc::new(SimBrowser::new(clock.clone()));
    let session = Arc::new(MemoryArea::new());
    let service = BackgroundService::builder(sim.clone(), Arc::new(prefs))
        .session_area(session.clone())
        .clock(clock.clone())
        .build();
    Harness {
        clock,
        sim,
        session,
        service,
    }
}

impl Harness {
    async fn bookmark(&self, tab: TabId, url: &str) -> Option<InterceptOutcome> {
        let details = self
            .sim
            .navigate(tab, url, TransitionType::AutoBookmark)
            .await
            .unwrap();
        self.service
            .handle(HostEvent::NavigationCommitted(details))
            .await
            .unwrap()
    }

    /// Deliver the events the simulated host queued (tab created/removed).
    async fn flush_host_events(&self) {
        for event in self.sim.take_events().await {
            self.service.handle(event).await.unwrap();
        }
    }

    async fn creates(&self) -> Vec<HostCall> {
        self.sim
            .calls()
            .await
            .into_iter()
            .filter(|c| matches!(c, HostCall::Create { .. }))
            .collect()
    }
}

/// Bookmark in a tab with history: new foreground tab, source goes back.
#[tokio::test]
async fn test_bookmark_moves_to_new_tab() {
    let h = harness(Preferences::default());
    h.sim.insert_tab(TabId(7), &["https://old.example.com/"]).await;

    let outcome = h.bookmark(TabId(7), "https://example.com/a").await;

    assert_eq!(
        outcome,
        Some(InterceptOutcome::Redirected {
            new_tab: Some(TabId(8)),
            source: SourceDisposition::WentBack,
        })
    );
    assert_eq!(
        h.sim.calls().await,
        vec![
            HostCall::Create {
                url: "https://example.com/a".into(),
                active: true,
            },
            HostCall::GoBack { tab: TabId(7) },
        ]
    );
    let source = h.sim.tab(TabId(7)).await.unwrap();
    assert_eq!(source.current_url(), "https://old.example.com/");
    assert!(h.service.tracker().is_just_created(TabId(8)).await.unwrap());
}

/// The background preference opens the new tab inactive.
#[tokio::test]
async fn test_open_in_background() {
    let h = harness(Preferences {
        open_in_background: true,
        close_empty_source_tab: false,
    });
    h.sim.insert_tab(TabId(7), &["https://old.example.com/"]).await;

    h.bookmark(TabId(7), "https://example.com/a").await;

    assert_eq!(
        h.creates().await,
        vec![HostCall::Create {
            url: "https://example.com/a".into(),
            active: false,
        }]
    );
}

/// A bookmark inside a tab created two seconds ago is left alone.
#[tokio::test]
async fn test_just_created_tab_is_skipped() {
    let h = harness(Preferences::default());
    h.sim.insert_tab(TabId(7), &["chrome://newtab/"]).await;
    h.service
        .handle(HostEvent::TabCreated(TabInfo::new(TabId(7), "chrome://newtab/")))
        .await
        .unwrap();

    h.clock.advance(Duration::from_secs(2));
    let outcome = h.bookmark(TabId(7), "https://example.com/a").await;

    assert_eq!(
        outcome,
        Some(InterceptOutcome::Skipped {
            reason: SkipReason::JustCreated
        })
    );
    assert!(h.sim.calls().await.is_empty());
}

/// Once the just-created window has passed the tab is handled normally.
#[tokio::test]
async fn test_just_created_window_expires() {
    let h = harness(Preferences::default());
    let tab = h.sim.open_tab("chrome://newtab/").await;
    h.flush_host_events().await;

    h.clock.advance(Duration::from_millis(6000));
    let outcome = h.bookmark(tab, "https://example.com/a").await;

    assert!(matches!(outcome, Some(InterceptOutcome::Redirected { .. })));
}

/// Removing a tab clears its just-created mark right away.
#[tokio::test]
async fn test_removed_tab_loses_just_created_mark() {
    let h = harness(Preferences::default());
    let tab = h.sim.open_tab("chrome://newtab/").await;
    h.flush_host_events().await;
    assert!(h.service.tracker().is_just_created(tab).await.unwrap());

    h.sim.close_tab(tab).await.unwrap();
    h.flush_host_events().await;
    assert!(!h.service.tracker().is_just_created(tab).await.unwrap());
}

/// No history, empty source, closing enabled: the source tab is closed.
#[tokio::test]
async fn test_empty_source_is_closed() {
    let h = harness(Preferences {
        open_in_background: false,
        close_empty_source_tab: true,
    });
    h.sim.insert_tab(TabId(7), &["about:blank"]).await;

    // The committed navigation has not replaced the blank page yet.
    let details = NavigationCommitted::bookmark(TabId(7), "https://example.com/a", START);
    let outcome = h
        .service
        .handle(HostEvent::NavigationCommitted(details))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Some(InterceptOutcome::Redirected {
            new_tab: Some(TabId(8)),
            source: SourceDisposition::Closed,
        })
    );
    assert!(h.sim.tab(TabId(7)).await.is_none());
    assert!(h.sim.calls().await.contains(&HostCall::Remove { tab: TabId(7) }));
}

/// No history, source showing content: parked on about:blank, never closed.
#[tokio::test]
async fn test_content_source_is_blanked() {
    let h = harness(Preferences {
        open_in_background: false,
        close_empty_source_tab: true,
    });
    h.sim.insert_tab(TabId(7), &["https://old.example.com"]).await;

    let details = NavigationCommitted::bookmark(TabId(7), "https://example.com/a", START);
    let outcome = h
        .service
        .handle(HostEvent::NavigationCommitted(details))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Some(InterceptOutcome::Redirected {
            new_tab: Some(TabId(8)),
            source: SourceDisposition::Blanked,
        })
    );
    assert_eq!(h.sim.tab(TabId(7)).await.unwrap().current_url(), "about:blank");
    assert!(!h.sim.calls().await.contains(&HostCall::Remove { tab: TabId(7) }));
}

/// No history, empty source, closing disabled: the source stays as it is.
#[tokio::test]
async fn test_empty_source_kept_when_closing_disabled() {
    let h = harness(Preferences::default());
    h.sim.insert_tab(TabId(7), &["https://old.example.com"]).await;
    h.sim
        .set_pending_url(TabId(7), Some("chrome-search://local-ntp/local-ntp.html"))
        .await
        .unwrap();

    let details = NavigationCommitted::bookmark(TabId(7), "https://example.com/a", START);
    let outcome = h
        .service
        .handle(HostEvent::NavigationCommitted(details))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Some(InterceptOutcome::Redirected {
            new_tab: Some(TabId(8)),
            source: SourceDisposition::Untouched,
        })
    );
    let calls = h.sim.calls().await;
    assert_eq!(calls.last(), Some(&HostCall::Get { tab: TabId(7) }));
}

/// A failing cleanup call is swallowed and reported in the outcome.
#[tokio::test]
async fn test_cleanup_failure_is_swallowed() {
    let h = harness(Preferences::default());
    h.sim.insert_tab(TabId(7), &["chrome://settings/"]).await;
    h.sim.lock_tab(TabId(7)).await;

    let details = NavigationCommitted::bookmark(TabId(7), "https://example.com/a", START);
    let outcome = h
        .service
        .handle(HostEvent::NavigationCommitted(details))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Some(InterceptOutcome::Redirected {
            new_tab: Some(TabId(8)),
            source: SourceDisposition::CleanupFailed,
        })
    );
    assert!(h.sim.tab(TabId(8)).await.is_some());
}

/// Closing an empty source the host refuses is reported, not raised.
#[tokio::test]
async fn test_refused_close_is_swallowed() {
    let h = harness(Preferences {
        open_in_background: false,
        close_empty_source_tab: true,
    });
    h.sim.insert_tab(TabId(7), &["about:blank"]).await;
    h.sim.lock_tab(TabId(7)).await;

    let details = NavigationCommitted::bookmark(TabId(7), "https://example.com/a", START);
    let outcome = h
        .service
        .handle(HostEvent::NavigationCommitted(details))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Some(InterceptOutcome::Redirected {
            new_tab: Some(TabId(8)),
            source: SourceDisposition::CleanupFailed,
        })
    );
    assert!(h.sim.tab(TabId(7)).await.is_some());
    assert_eq!(h.sim.calls().await.last(), Some(&HostCall::Remove { tab: TabId(7) }));
}

/// A source closed before cleanup fails both go-back and the tab lookup.
#[tokio::test]
async fn test_source_closed_before_cleanup() {
    let h = harness(Preferences::default());
    h.sim.insert_tab(TabId(7), &["https://old.example.com/"]).await;
    let details = h
        .sim
        .navigate(TabId(7), "https://example.com/a", TransitionType::AutoBookmark)
        .await
        .unwrap();
    h.sim.close_tab(TabId(7)).await.unwrap();

    let outcome = h
        .service
        .handle(HostEvent::NavigationCommitted(details))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Some(InterceptOutcome::Redirected {
            new_tab: Some(TabId(8)),
            source: SourceDisposition::CleanupFailed,
        })
    );
    assert_eq!(
        h.sim.calls().await[1..],
        [HostCall::GoBack { tab: TabId(7) }, HostCall::Get { tab: TabId(7) }]
    );
}

/// Session area whose next read fails once.
#[derive(Default)]
struct FlakyArea {
    inner: MemoryArea,
    fail_next_get: AtomicBool,
}

#[async_trait]
impl StorageArea for FlakyArea {
    async fn get(&self, key: &str) -> MarkTabResult<Option<Value>> {
        if self.fail_next_get.swap(false, Ordering::SeqCst) {
            return Err(MarkTabError::storage("session area unavailable"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> MarkTabResult<()> {
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> MarkTabResult<()> {
        self.inner.remove(key).await
    }
}

/// A handler that fails on storage leaves the next event unaffected.
#[tokio::test]
async fn test_failed_event_does_not_affect_next() {
    let clock = Arc::new(ManualClock::new(START));
    let sim = Arc::new(SimBrowser::new(clock.clone()));
    let area = Arc::new(FlakyArea::default());
    let service = BackgroundService::builder(sim.clone(), Arc::new(Preferences::default()))
        .session_area(area.clone())
        .clock(clock)
        .build();
    sim.insert_tab(TabId(7), &["https://old.example.com/"]).await;
    let event = HostEvent::NavigationCommitted(NavigationCommitted::bookmark(
        TabId(7),
        "https://example.com/a",
        START,
    ));

    area.fail_next_get.store(true, Ordering::SeqCst);
    assert!(service.handle(event.clone()).await.is_err());
    area.fail_next_get.store(true, Ordering::SeqCst);
    assert_eq!(service.dispatch(event.clone()).await, None);
    assert!(sim.calls().await.is_empty());

    assert_eq!(
        service.dispatch(event).await,
        Some(InterceptOutcome::Redirected {
            new_tab: Some(TabId(8)),
            source: SourceDisposition::Blanked,
        })
    );
}

/// When the new tab cannot be opened nothing else happens.
#[tokio::test]
async fn test_create_failure_aborts_event() {
    let h = harness(Preferences::default());
    h.sim.insert_tab(TabId(7), &["https://old.example.com/"]).await;
    h.sim.set_fail_create(true).await;

    let outcome = h.bookmark(TabId(7), "https://example.com/a").await;

    assert_eq!(outcome, Some(InterceptOutcome::CreateFailed));
    assert_eq!(h.sim.calls().await.len(), 1);
    assert_eq!(
        h.sim.tab(TabId(7)).await.unwrap().current_url(),
        "https://example.com/a"
    );
}

/// The same navigation twice within five seconds opens one tab.
#[tokio::test]
async fn test_duplicate_delivery_is_ignored() {
    let h = harness(Preferences::default());
    h.sim.insert_tab(TabId(7), &["https://old.example.com/"]).await;
    let details = NavigationCommitted::bookmark(TabId(7), "https://example.com/a", START);

    let first = h
        .service
        .handle(HostEvent::NavigationCommitted(details.clone()))
        .await
        .unwrap();
    h.clock.advance(Duration::from_millis(4999));
    let second = h
        .service
        .handle(HostEvent::NavigationCommitted(details))
        .await
        .unwrap();

    assert!(matches!(first, Some(InterceptOutcome::Redirected { .. })));
    assert_eq!(
        second,
        Some(InterceptOutcome::Skipped {
            reason: SkipReason::Duplicate
        })
    );
    assert_eq!(h.creates().await.len(), 1);
}

/// After the ignore window the same navigation is handled again.
#[tokio::test]
async fn test_duplicate_window_expires() {
    let h = harness(Preferences::default());
    h.sim
        .insert_tab(TabId(7), &["https://one.example/", "https://two.example/"])
        .await;
    let details = NavigationCommitted::bookmark(TabId(7), "https://example.com/a", START);

    h.service
        .handle(HostEvent::NavigationCommitted(details.clone()))
        .await
        .unwrap();
    h.clock.advance(Duration::from_millis(5000));
    let again = h
        .service
        .handle(HostEvent::NavigationCommitted(details))
        .await
        .unwrap();

    assert!(matches!(again, Some(InterceptOutcome::Redirected { .. })));
    assert_eq!(h.creates().await.len(), 2);
}

/// Typed URLs, link clicks and sub-frames never trigger anything.
#[tokio::test]
async fn test_non_bookmark_events_are_ignored() {
    let h = harness(Preferences::default());
    h.sim.insert_tab(TabId(7), &["https://old.example.com/"]).await;

    let typed = h
        .sim
        .navigate(TabId(7), "https://example.com/t", TransitionType::Typed)
        .await
        .unwrap();
    let mut subframe = NavigationCommitted::bookmark(TabId(7), "https://example.com/f", START);
    subframe.frame_id = marktab_core::FrameId(3);

    let typed = h.service.handle(HostEvent::NavigationCommitted(typed)).await.unwrap();
    let subframe = h
        .service
        .handle(HostEvent::NavigationCommitted(subframe))
        .await
        .unwrap();

    assert_eq!(
        typed,
        Some(InterceptOutcome::Skipped {
            reason: SkipReason::NotBookmark
        })
    );
    assert_eq!(
        subframe,
        Some(InterceptOutcome::Skipped {
            reason: SkipReason::Subframe
        })
    );
    assert!(h.sim.calls().await.is_empty());
}

/// Non-web schemes are filtered out before the interceptor sees them.
#[tokio::test]
async fn test_non_web_scheme_is_filtered() {
    let h = harness(Preferences::default());
    h.sim.insert_tab(TabId(7), &["https://old.example.com/"]).await;

    let outcome = h.bookmark(TabId(7), "file:///home/user/notes.html").await;

    assert_eq!(outcome, None);
    assert!(h.sim.calls().await.is_empty());
}

/// Bookkeeping lives in session storage, so a restarted background picks it
/// up.
#[tokio::test]
async fn test_state_survives_background_restart() {
    let h = harness(Preferences::default());
    h.sim.insert_tab(TabId(7), &["https://old.example.com/"]).await;
    let details = NavigationCommitted::bookmark(TabId(7), "https://example.com/a", START);
    h.service
        .handle(HostEvent::NavigationCommitted(details.clone()))
        .await
        .unwrap();

    let restarted = BackgroundService::builder(h.sim.clone(), Arc::new(Preferences::default()))
        .session_area(h.session.clone())
        .clock(h.clock.clone())
        .build();
    let outcome = restarted
        .handle(HostEvent::NavigationCommitted(details))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Some(InterceptOutcome::Skipped {
            reason: SkipReason::Duplicate
        })
    );
    let stored = h.session.get("ignoreMap").await.unwrap().unwrap();
    assert_eq!(
        stored,
        json!({"src:7|url:https://example.com/a": START + 5000})
    );
}

/// Preferences are read from storage on every decision.
#[tokio::test]
async fn test_preferences_read_per_event() {
    let clock = Arc::new(ManualClock::new(START));
    let sim = Arc::new(SimBrowser::new(clock.clone()));
    let sync_area = Arc::new(MemoryArea::new());
    let store = PreferenceStore::new(sync_area.clone());
    let service = BackgroundService::builder(sim.clone(), Arc::new(store.clone()))
        .clock(clock.clone())
        .build();
    sim.insert_tab(TabId(1), &["https://a.example/"]).await;
    sim.insert_tab(TabId(2), &["https://b.example/"]).await;

    service
        .handle(HostEvent::NavigationCommitted(NavigationCommitted::bookmark(
            TabId(1),
            "https://example.com/1",
            START,
        )))
        .await
        .unwrap();
    store
        .save(&Preferences {
            open_in_background: true,
            close_empty_source_tab: false,
        })
        .await
        .unwrap();
    service
        .handle(HostEvent::NavigationCommitted(NavigationCommitted::bookmark(
            TabId(2),
            "https://example.com/2",
            START,
        )))
        .await
        .unwrap();

    let actives: Vec<bool> = sim
        .calls()
        .await
        .into_iter()
        .filter_map(|c| match c {
            HostCall::Create { active, .. } => Some(active),
            _ => None,
        })
        .collect();
    assert_eq!(actives, vec![true, false]);
}

/// The channel-driven loop handles every event and returns once drained.
#[tokio::test]
async fn test_run_loop_drains_events() {
    let h = harness(Preferences::default());
    h.sim.insert_tab(TabId(7), &["https://old.example.com/"]).await;
    h.sim.insert_tab(TabId(9), &["https://other.example.com/"]).await;

    let (tx, rx) = mpsc::unbounded_channel();
    let runner = tokio::spawn(h.service.clone().run(rx));

    tx.send(HostEvent::NavigationCommitted(NavigationCommitted::bookmark(
        TabId(7),
        "https://example.com/a",
        START,
    )))
    .unwrap();
    tx.send(HostEvent::NavigationCommitted(NavigationCommitted::bookmark(
        TabId(9),
        "https://example.com/b",
        START,
    )))
    .unwrap();
    drop(tx);
    runner.await.unwrap();

    assert_eq!(h.creates().await.len(), 2);
}
