//! Common types used throughout MarkTab

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier the host browser assigns to a tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u64);

/// Identifier of a frame inside a tab. Zero is the top-level frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(pub u64);

impl FrameId {
    pub const TOP: FrameId = FrameId(0);

    pub fn is_top(self) -> bool {
        self == Self::TOP
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the host classified a committed navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionType {
    Link,
    Typed,
    /// The user activated a bookmark.
    AutoBookmark,
    AutoSubframe,
    ManualSubframe,
    Generated,
    AutoToplevel,
    FormSubmit,
    Reload,
    Keyword,
    KeywordGenerated,
    StartPage,
    #[serde(other)]
    Other,
}

impl TransitionType {
    pub fn is_bookmark(self) -> bool {
        self == Self::AutoBookmark
    }
}

/// Snapshot of a host tab.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    /// Missing for tabs the host has not assigned an id to (devtools, etc).
    pub id: Option<TabId>,
    pub url: Option<String>,
    /// URL of a navigation that has not committed yet.
    pub pending_url: Option<String>,
    #[serde(default)]
    pub active: bool,
}

impl TabInfo {
    pub fn new(id: TabId, url: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            url: Some(url.into()),
            pending_url: None,
            active: false,
        }
    }

    /// The URL the tab is showing or about to show, preferring the pending one.
    pub fn current_url(&self) -> &str {
        self.pending_url
            .as_deref()
            .or(self.url.as_deref())
            .unwrap_or("")
    }
}

/// Details of a navigation-committed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationCommitted {
    pub tab_id: TabId,
    pub url: String,
    pub transition_type: TransitionType,
    #[serde(default)]
    pub frame_id: FrameId,
    /// Milliseconds since the epoch.
    #[serde(default)]
    pub time_stamp: u64,
}

impl NavigationCommitted {
    /// A top-frame navigation caused by activating a bookmark.
    pub fn bookmark(tab_id: TabId, url: impl Into<String>, time_stamp: u64) -> Self {
        Self {
            tab_id,
            url: url.into(),
            transition_type: TransitionType::AutoBookmark,
            frame_id: FrameId::TOP,
            time_stamp,
        }
    }
}

/// Arguments to the host's create-tab call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProperties {
    pub url: String,
    pub active: bool,
}
